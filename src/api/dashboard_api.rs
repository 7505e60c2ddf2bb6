// ==========================================
// 仓储管理系统 - 驾驶舱 API
// ==========================================
// 职责: 运行态聚合查询（订单/批次分布、库存总量）与操作日志查询
// 只读: 本层不落任何写操作, 不记 ActionLog
// ==========================================

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::action_log::ActionLog;
use crate::domain::types::{BatchStatus, OrderStatus};
use crate::perf::PerfGuard;
use crate::repository::{
    ActionLogRepository, BatchRepository, MaterialRepository, OrderRepository,
    WarehouseRepository,
};

// ==========================================
// DashboardApi - 驾驶舱 API
// ==========================================

/// 驾驶舱API
///
/// 职责：
/// 1. 聚合快照（订单/批次按状态计数, 物料数, 库存总量）
/// 2. 操作日志查询（最近 N 条 / 按类型）
pub struct DashboardApi {
    order_repo: Arc<OrderRepository>,
    batch_repo: Arc<BatchRepository>,
    material_repo: Arc<MaterialRepository>,
    warehouse_repo: Arc<WarehouseRepository>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl DashboardApi {
    /// 创建新的DashboardApi实例
    pub fn new(
        order_repo: Arc<OrderRepository>,
        batch_repo: Arc<BatchRepository>,
        material_repo: Arc<MaterialRepository>,
        warehouse_repo: Arc<WarehouseRepository>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            order_repo,
            batch_repo,
            material_repo,
            warehouse_repo,
            action_log_repo,
        }
    }

    /// 聚合快照
    ///
    /// # 返回
    /// 订单/批次按状态计数、物料建档数、全库库存与预约总量
    pub fn get_dashboard(&self) -> ApiResult<DashboardSnapshot> {
        let _perf = PerfGuard::new("api.get_dashboard");

        let orders = OrderCounts {
            waiting: self.order_repo.count_by_status(OrderStatus::Waiting)?,
            allocated: self.order_repo.count_by_status(OrderStatus::Allocated)?,
            completed: self.order_repo.count_by_status(OrderStatus::Completed)?,
            total: self.order_repo.count()?,
        };

        let batches = BatchCounts {
            created: self.batch_repo.count_by_status(BatchStatus::Created)?,
            allocated: self.batch_repo.count_by_status(BatchStatus::Allocated)?,
            completed: self.batch_repo.count_by_status(BatchStatus::Completed)?,
            total: self.batch_repo.count()?,
        };

        let summary = self.warehouse_repo.stock_summary()?;
        let stock = StockTotals {
            total_quantity: summary.iter().map(|s| s.total_quantity).sum(),
            total_reserved: summary.iter().map(|s| s.total_reserved).sum(),
            material_kinds: summary.len(),
        };

        Ok(DashboardSnapshot {
            orders,
            batches,
            material_count: self.material_repo.count()?,
            stock,
            generated_at: Utc::now(),
        })
    }

    /// 查询最近操作
    ///
    /// # 参数
    /// - limit: 返回记录数上限
    pub fn recent_activity(&self, limit: i32) -> ApiResult<Vec<ActionLog>> {
        let _perf = PerfGuard::new("api.recent_activity");

        if limit <= 0 || limit > 1000 {
            return Err(ApiError::InvalidInput("limit必须在1-1000之间".to_string()));
        }

        Ok(self.action_log_repo.find_recent(limit)?)
    }

    /// 按操作类型查询日志
    pub fn activity_by_type(&self, action_type: &str, limit: i32) -> ApiResult<Vec<ActionLog>> {
        let _perf = PerfGuard::new("api.activity_by_type");

        if action_type.trim().is_empty() {
            return Err(ApiError::InvalidInput("操作类型不能为空".to_string()));
        }
        if limit <= 0 || limit > 1000 {
            return Err(ApiError::InvalidInput("limit必须在1-1000之间".to_string()));
        }

        Ok(self
            .action_log_repo
            .find_by_action_type(action_type.trim(), limit)?)
    }
}

// ==========================================
// 快照 DTO
// ==========================================

/// 订单状态分布
#[derive(Debug, Clone, Serialize)]
pub struct OrderCounts {
    pub waiting: i64,
    pub allocated: i64,
    pub completed: i64,
    pub total: i64,
}

/// 批次状态分布
#[derive(Debug, Clone, Serialize)]
pub struct BatchCounts {
    pub created: i64,
    pub allocated: i64,
    pub completed: i64,
    pub total: i64,
}

/// 库存总量
#[derive(Debug, Clone, Serialize)]
pub struct StockTotals {
    pub total_quantity: i64,
    pub total_reserved: i64,
    pub material_kinds: usize,
}

/// 驾驶舱聚合快照
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub orders: OrderCounts,
    pub batches: BatchCounts,
    pub material_count: i64,
    pub stock: StockTotals,
    pub generated_at: DateTime<Utc>,
}
