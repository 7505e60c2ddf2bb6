// ==========================================
// 仓储管理系统 - 订单 API
// ==========================================
// 职责: 订单创建、行集维护、守卫修改、删除
// 约定: 聚合守卫返回 false 即业务拒绝, 不抛错
// ==========================================

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::api::error::{ApiError, ApiResult};
use crate::api::CommandResult;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::order::{Order, OrderRow};
use crate::domain::types::{OrderStatus, OrderType, Priority};
use crate::perf::PerfGuard;
use crate::repository::{
    ActionLogRepository, BatchRepository, MaterialRepository, OrderRepository,
};

// ==========================================
// 请求 DTO
// ==========================================

/// 创建订单请求
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    /// 订单号（应用层赋号, 不能为 0）
    pub order_id: u64,
    /// 入库/出库
    pub order_type: OrderType,
    /// 优先级
    pub priority: Priority,
    /// 下达日期（可选）
    pub emission_date: Option<DateTime<Utc>>,
    /// 初始订单行（可为空, 之后通过 add_order_row 补充）
    pub rows: Vec<NewOrderRowRequest>,
}

/// 新订单行请求
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrderRowRequest {
    pub material_code: u64,
    pub quantity: u32,
}

// ==========================================
// OrderApi - 订单 API
// ==========================================

/// 订单API
///
/// 职责：
/// 1. 订单创建与查询
/// 2. 行集维护（添加/移除订单行）
/// 3. 守卫修改（下达日期、优先级）与删除
/// 4. ActionLog记录
pub struct OrderApi {
    order_repo: Arc<OrderRepository>,
    batch_repo: Arc<BatchRepository>,
    material_repo: Arc<MaterialRepository>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl OrderApi {
    /// 创建新的OrderApi实例
    ///
    /// # 参数
    /// - order_repo: 订单仓储
    /// - batch_repo: 批次仓储（在途行占用检查）
    /// - material_repo: 物料主数据仓储
    /// - action_log_repo: 操作日志仓储
    pub fn new(
        order_repo: Arc<OrderRepository>,
        batch_repo: Arc<BatchRepository>,
        material_repo: Arc<MaterialRepository>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            order_repo,
            batch_repo,
            material_repo,
            action_log_repo,
        }
    }

    // ==========================================
    // 写接口
    // ==========================================

    /// 创建订单
    ///
    /// # 参数
    /// - request: 创建订单请求
    ///
    /// # 返回
    /// - Ok(CommandResult): success=false 时 message 为拒绝原因
    /// - Err(ApiError): 基础设施错误
    ///
    /// # 业务规则
    /// - 订单号不能为 0 且不能与已有订单重复
    /// - 每个初始行的物料必须存在, 数量必须为正
    pub fn create_order(&self, request: CreateOrderRequest) -> ApiResult<CommandResult> {
        let _perf = PerfGuard::new("api.create_order");

        // 参数验证
        if request.order_id == 0 {
            return Err(ApiError::InvalidInput("订单号不能为 0".to_string()));
        }

        if self.order_repo.exists(request.order_id)? {
            return Ok(CommandResult::fail(format!(
                "订单 {} 已存在",
                request.order_id
            )));
        }

        let mut order = Order::new(
            request.order_id,
            request.emission_date,
            request.priority,
            request.order_type,
        );

        // 装配初始行: 物料必须存在, 行数据必须齐全
        for row_req in &request.rows {
            let material = match self.material_repo.find_by_code(row_req.material_code)? {
                Some(m) => m,
                None => {
                    return Ok(CommandResult::fail(format!(
                        "物料 {} 不存在",
                        row_req.material_code
                    )))
                }
            };

            let row = OrderRow::new(request.order_id, material, row_req.quantity);
            if !row.is_data_complete() {
                return Ok(CommandResult::fail(format!(
                    "订单行数据不完整: 物料 {} 数量 {}",
                    row_req.material_code, row_req.quantity
                )));
            }

            // 新建订单必然可编辑
            order.add_material(row);
        }

        self.order_repo.save(&order)?;

        self.audit(
            ActionLog::new(ActionType::CreateOrder, "system")
                .with_entity("ORDER", order.id)
                .with_payload(&json!({
                    "order_type": order.order_type,
                    "priority": order.priority,
                    "row_count": order.row_count(),
                })),
        );

        Ok(CommandResult::ok(format!("订单 {} 创建成功", order.id)))
    }

    /// 向订单添加一行
    ///
    /// # 业务规则
    /// - 订单必须存在且可编辑（双百分比均未达 100）
    /// - 物料必须存在, 数量必须为正
    pub fn add_order_row(
        &self,
        order_id: u64,
        material_code: u64,
        quantity: u32,
    ) -> ApiResult<CommandResult> {
        let _perf = PerfGuard::new("api.add_order_row");

        let mut order = match self.order_repo.find_by_id(order_id)? {
            Some(o) => o,
            None => return Ok(CommandResult::fail(format!("订单 {} 不存在", order_id))),
        };

        let material = match self.material_repo.find_by_code(material_code)? {
            Some(m) => m,
            None => return Ok(CommandResult::fail(format!("物料 {} 不存在", material_code))),
        };

        let row = OrderRow::new(order_id, material, quantity);
        if !row.is_data_complete() {
            return Ok(CommandResult::fail(format!(
                "订单行数据不完整: 物料 {} 数量 {}",
                material_code, quantity
            )));
        }

        if !order.add_material(row) {
            return Ok(CommandResult::fail(format!(
                "订单 {} 不可编辑, 拒绝添加行",
                order_id
            )));
        }

        self.order_repo.save(&order)?;

        self.audit(
            ActionLog::new(ActionType::AddOrderRow, "system")
                .with_entity("ORDER", order_id)
                .with_payload(&json!({
                    "material_code": material_code,
                    "quantity": quantity,
                })),
        );

        Ok(CommandResult::ok(format!(
            "订单 {} 已添加物料 {} 行",
            order_id, material_code
        )))
    }

    /// 从订单移除一行
    ///
    /// # 业务规则
    /// - 订单必须存在且可编辑
    /// - 行必须属于该订单, 且未被在途批次占用
    pub fn remove_order_row(&self, order_id: u64, row_id: u64) -> ApiResult<CommandResult> {
        let _perf = PerfGuard::new("api.remove_order_row");

        let mut order = match self.order_repo.find_by_id(order_id)? {
            Some(o) => o,
            None => return Ok(CommandResult::fail(format!("订单 {} 不存在", order_id))),
        };

        if !order.rows().iter().any(|r| r.id == row_id) {
            return Ok(CommandResult::fail(format!(
                "订单 {} 中不存在行 {}",
                order_id, row_id
            )));
        }

        // 在途批次仍引用该行时拒绝移除
        let live_rows = self.batch_repo.list_live_order_row_ids()?;
        if live_rows.contains(&row_id) {
            return Ok(CommandResult::fail(format!(
                "订单行 {} 已被在途批次占用, 不能移除",
                row_id
            )));
        }

        if !order.remove_material(row_id) {
            return Ok(CommandResult::fail(format!(
                "订单 {} 不可编辑, 拒绝移除行",
                order_id
            )));
        }

        self.order_repo.save(&order)?;

        self.audit(
            ActionLog::new(ActionType::RemoveOrderRow, "system")
                .with_entity("ORDER", order_id)
                .with_payload(&json!({ "row_id": row_id })),
        );

        Ok(CommandResult::ok(format!(
            "订单 {} 已移除行 {}",
            order_id, row_id
        )))
    }

    /// 修改订单（下达日期 / 优先级, 守卫 setter）
    ///
    /// # 参数
    /// - emission_date: 新下达日期（None 表示不修改）
    /// - priority: 新优先级（None 表示不修改）
    pub fn update_order(
        &self,
        order_id: u64,
        emission_date: Option<DateTime<Utc>>,
        priority: Option<Priority>,
    ) -> ApiResult<CommandResult> {
        let _perf = PerfGuard::new("api.update_order");

        if emission_date.is_none() && priority.is_none() {
            return Err(ApiError::InvalidInput("未提供任何修改字段".to_string()));
        }

        let mut order = match self.order_repo.find_by_id(order_id)? {
            Some(o) => o,
            None => return Ok(CommandResult::fail(format!("订单 {} 不存在", order_id))),
        };

        if let Some(date) = emission_date {
            if !order.set_emission_date(date) {
                return Ok(CommandResult::fail(format!(
                    "订单 {} 不可编辑, 拒绝修改下达日期",
                    order_id
                )));
            }
        }

        if let Some(p) = priority {
            if !order.set_priority(p) {
                return Ok(CommandResult::fail(format!(
                    "订单 {} 不可编辑, 拒绝修改优先级",
                    order_id
                )));
            }
        }

        self.order_repo.save(&order)?;

        self.audit(
            ActionLog::new(ActionType::UpdateOrder, "system")
                .with_entity("ORDER", order_id)
                .with_payload(&json!({
                    "emission_date": emission_date,
                    "priority": priority,
                })),
        );

        Ok(CommandResult::ok(format!("订单 {} 修改成功", order_id)))
    }

    /// 删除订单
    ///
    /// # 业务规则
    /// - can_delete(): 分配率与完成率不得同时为正
    /// - 任何批次（含已完成）引用过该订单即拒绝删除
    pub fn delete_order(&self, order_id: u64) -> ApiResult<CommandResult> {
        let _perf = PerfGuard::new("api.delete_order");

        let order = match self.order_repo.find_by_id(order_id)? {
            Some(o) => o,
            None => return Ok(CommandResult::fail(format!("订单 {} 不存在", order_id))),
        };

        if !order.can_delete() {
            return Ok(CommandResult::fail(format!(
                "订单 {} 已进入分配/完成流程, 不能删除",
                order_id
            )));
        }

        if self.batch_repo.batch_exists_for_order(order_id)? {
            return Ok(CommandResult::fail(format!(
                "订单 {} 已被批次引用, 不能删除",
                order_id
            )));
        }

        self.order_repo.delete(order_id)?;

        self.audit(ActionLog::new(ActionType::DeleteOrder, "system").with_entity("ORDER", order_id));

        Ok(CommandResult::ok(format!("订单 {} 已删除", order_id)))
    }

    // ==========================================
    // 查询接口
    // ==========================================

    /// 查询订单列表
    ///
    /// # 参数
    /// - status: 可选状态过滤
    pub fn list_orders(&self, status: Option<OrderStatus>) -> ApiResult<Vec<OrderSummary>> {
        let _perf = PerfGuard::new("api.list_orders");

        let orders = match status {
            Some(s) => self.order_repo.list_by_status(s)?,
            None => self.order_repo.list_all()?,
        };

        Ok(orders.iter().map(OrderSummary::from_order).collect())
    }

    /// 查询订单详情（含行集）
    pub fn get_order_detail(&self, order_id: u64) -> ApiResult<Option<OrderDetail>> {
        let _perf = PerfGuard::new("api.get_order_detail");

        let order = self.order_repo.find_by_id(order_id)?;
        Ok(order.map(|o| OrderDetail::from_order(&o)))
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    /// 尽力记录操作日志, 失败只告警
    fn audit(&self, log: ActionLog) {
        if let Err(e) = self.action_log_repo.insert(&log) {
            warn!(error = %e, action_type = %log.action_type, "记录操作日志失败");
        }
    }
}

// ==========================================
// DTO 类型定义
// ==========================================

/// 订单摘要（列表视图）
#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
    pub id: u64,
    pub order_type: OrderType,
    pub order_status: OrderStatus,
    pub priority: Priority,
    pub emission_date: Option<DateTime<Utc>>,
    pub done_date: Option<DateTime<Utc>>,
    pub allocation_percentual: f32,
    pub complete_percentual: f32,
    pub row_count: usize,
}

impl OrderSummary {
    fn from_order(order: &Order) -> Self {
        Self {
            id: order.id,
            order_type: order.order_type,
            order_status: order.order_status,
            priority: order.priority,
            emission_date: order.emission_date,
            done_date: order.done_date,
            allocation_percentual: order.allocation_percentual,
            complete_percentual: order.complete_percentual,
            row_count: order.row_count(),
        }
    }
}

/// 订单行视图
#[derive(Debug, Clone, Serialize)]
pub struct OrderRowDto {
    pub id: u64,
    pub material_code: u64,
    pub material_description: String,
    pub quantity: u32,
    pub allocated: bool,
    pub completed: bool,
}

/// 订单详情（含行集与编辑性）
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    pub id: u64,
    pub order_type: OrderType,
    pub order_status: OrderStatus,
    pub priority: Priority,
    pub emission_date: Option<DateTime<Utc>>,
    pub done_date: Option<DateTime<Utc>>,
    pub allocation_percentual: f32,
    pub complete_percentual: f32,
    pub is_editable: bool,
    pub can_delete: bool,
    pub rows: Vec<OrderRowDto>,
}

impl OrderDetail {
    fn from_order(order: &Order) -> Self {
        let rows = order
            .rows()
            .iter()
            .map(|r| OrderRowDto {
                id: r.id,
                material_code: r.material.code,
                material_description: r.material.description.clone(),
                quantity: r.quantity,
                allocated: r.allocated,
                completed: r.completed,
            })
            .collect();

        Self {
            id: order.id,
            order_type: order.order_type,
            order_status: order.order_status,
            priority: order.priority,
            emission_date: order.emission_date,
            done_date: order.done_date,
            allocation_percentual: order.allocation_percentual,
            complete_percentual: order.complete_percentual,
            is_editable: order.is_editable(),
            can_delete: order.can_delete(),
            rows,
        }
    }
}
