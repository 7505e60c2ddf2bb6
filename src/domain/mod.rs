// ==========================================
// 仓储管理系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、业务规则
// 红线: 不含数据访问逻辑, 不含持久化属性
// ==========================================

pub mod action_log;
pub mod batch;
pub mod material;
pub mod order;
pub mod types;
pub mod warehouse;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use batch::{Batch, BatchRow};
pub use material::Material;
pub use order::{Order, OrderRow};
pub use types::{BatchStatus, OrderStatus, OrderType, Priority};
pub use warehouse::{WarehouseCell, WarehouseLine, WarehouseShelf};
