// ==========================================
// 仓储管理系统 - 订单数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 约定: save 为"头表 UPSERT + 行差异同步"单事务, 保留存活行的 row_id
// ==========================================

mod core;
mod queries;


pub use self::core::OrderRepository;
