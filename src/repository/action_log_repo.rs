// ==========================================
// 仓储管理系统 - 操作日志仓储
// ==========================================
// 红线: 所有写操作尽力记录
// 审计失败只告警, 不阻断业务（API 层负责兜这个语义）
// ==========================================

mod core;
mod queries;


pub use self::core::ActionLogRepository;
