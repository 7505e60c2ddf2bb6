// ==========================================
// 仓储管理系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 订单与批次作业中心 (命令/结果接口, 无界面耦合)
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 批次生成与打印投影
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/schema 统一）
pub mod db;

// 日志系统
pub mod logging;

// 性能观测
pub mod perf;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 装配与启动
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{BatchStatus, OrderStatus, OrderType, Priority};

// 领域实体
pub use domain::{
    ActionLog, Batch, BatchRow, Material, Order, OrderRow, WarehouseCell, WarehouseLine,
    WarehouseShelf,
};

// 引擎
pub use engine::{AllocationEngine, BatchPrintEngine};

// API
pub use api::{
    BatchApi, CommandResult, ConfigApi, DashboardApi, ImportApi, MaterialApi, OrderApi,
    WarehouseApi,
};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "仓储管理系统";

// 数据库版本
pub const DB_VERSION: &str = "v1";

// ==========================================
// 预编译检查
// ==========================================
