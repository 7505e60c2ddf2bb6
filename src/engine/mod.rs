// ==========================================
// 仓储管理系统 - 引擎层
// ==========================================
// 职责: 实现业务规则引擎,不拼 SQL
// 红线: Engine 不拼 SQL, 所有跳过必须输出 reason
// ==========================================

pub mod allocation;
pub mod print;

// 重导出核心引擎
pub use allocation::{AllocationEngine, GenerationResult, SkippedRow};
pub use print::{BatchPrintEngine, BatchPrintRow, PRINT_HEADER};
