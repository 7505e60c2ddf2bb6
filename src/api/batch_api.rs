// ==========================================
// 仓储管理系统 - 批次 API
// ==========================================
// 职责: 批次生成、下达、完成、打印、导出
// 编排: 引擎在工作副本上计算, 本层负责落库 + 订单联动 + 库存结算
// ==========================================

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::warn;

use crate::api::error::{ApiError, ApiResult};
use crate::api::CommandResult;
use crate::config::ConfigManager;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::batch::Batch;
use crate::domain::types::{BatchStatus, OrderStatus, OrderType};
use crate::domain::warehouse::WarehouseCell;
use crate::engine::{AllocationEngine, BatchPrintEngine, BatchPrintRow, GenerationResult};
use crate::perf::PerfGuard;
use crate::repository::{
    ActionLogRepository, BatchRepository, OrderRepository, WarehouseRepository,
};

/// 订单联动方向（下达 / 完成）
enum Propagation {
    Allocated,
    Completed,
}

// ==========================================
// BatchApi - 批次 API
// ==========================================

/// 批次API
///
/// 职责：
/// 1. 批次生成（候选订单 + 库存扫描 → 批次落库 + 库位预约）
/// 2. 批次状态推进（下达 / 完成）与订单行联动
/// 3. 完成时的库存结算
/// 4. 打印投影与 CSV 导出
/// 5. ActionLog记录
pub struct BatchApi {
    batch_repo: Arc<BatchRepository>,
    order_repo: Arc<OrderRepository>,
    warehouse_repo: Arc<WarehouseRepository>,
    config_manager: Arc<ConfigManager>,
    action_log_repo: Arc<ActionLogRepository>,
    allocation_engine: AllocationEngine,
    print_engine: BatchPrintEngine,
}

impl BatchApi {
    /// 创建新的BatchApi实例
    ///
    /// # 参数
    /// - batch_repo: 批次仓储
    /// - order_repo: 订单仓储
    /// - warehouse_repo: 库区仓储
    /// - config_manager: 配置管理器（批次行数上限）
    /// - action_log_repo: 操作日志仓储
    pub fn new(
        batch_repo: Arc<BatchRepository>,
        order_repo: Arc<OrderRepository>,
        warehouse_repo: Arc<WarehouseRepository>,
        config_manager: Arc<ConfigManager>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            batch_repo,
            order_repo,
            warehouse_repo,
            config_manager,
            action_log_repo,
            allocation_engine: AllocationEngine::new(),
            print_engine: BatchPrintEngine::new(),
        }
    }

    // ==========================================
    // 批次生成
    // ==========================================

    /// 生成批次
    ///
    /// # 流程
    /// 1. 取全部 Waiting 订单与全部库位, 取在途批次占用的订单行
    /// 2. 引擎在库位工作副本上预约并切分批次
    /// 3. 批次落库, 预约量写回被触碰的库位
    ///
    /// # 返回
    /// - success=true: details 为生成报告（批次号 + 跳过行）
    /// - success=false: 没有任何可覆盖的订单行, details 仍携带跳过原因
    pub fn generate_batches(&self) -> ApiResult<CommandResult> {
        let _perf = PerfGuard::new("api.generate_batches");

        let orders = self.order_repo.list_by_status(OrderStatus::Waiting)?;
        let mut cells = self.warehouse_repo.list_all_cells()?;
        let live_row_ids: HashSet<u64> = self
            .batch_repo
            .list_live_order_row_ids()?
            .into_iter()
            .collect();
        let max_rows = self
            .config_manager
            .get_batch_max_rows()
            .map_err(|e| ApiError::ConfigError(format!("读取批次行数上限失败: {}", e)))?;

        let result = self
            .allocation_engine
            .generate(&orders, &mut cells, &live_row_ids, max_rows);

        if result.batches.is_empty() {
            let report = GenerationReport::new(Vec::new(), &result);
            return Ok(CommandResult::fail_with(
                "没有可生成的批次",
                serde_json::to_value(&report).unwrap_or(serde_json::Value::Null),
            ));
        }

        // 批次落库
        let mut batch_ids = Vec::with_capacity(result.batches.len());
        for batch in &result.batches {
            let id = self.batch_repo.insert(batch)?;
            batch_ids.push(id);
        }

        // 预约量写回被触碰的库位
        let cell_by_id: HashMap<u64, &WarehouseCell> = cells.iter().map(|c| (c.id, c)).collect();
        for cell_id in &result.touched_cell_ids {
            if let Some(cell) = cell_by_id.get(cell_id) {
                self.warehouse_repo
                    .update_cell_stock(cell.id, cell.quantity, cell.reserved_quantity)?;
            }
        }

        let report = GenerationReport::new(batch_ids, &result);

        self.audit(
            ActionLog::new(ActionType::GenerateBatches, "system")
                .with_payload(&json!({
                    "batch_ids": report.batch_ids,
                    "total_rows": report.total_rows,
                    "skipped": report.skipped.len(),
                })),
        );

        Ok(CommandResult::ok_with(
            format!("生成 {} 个批次", report.batch_count),
            serde_json::to_value(&report).unwrap_or(serde_json::Value::Null),
        ))
    }

    // ==========================================
    // 状态推进
    // ==========================================

    /// 下达批次（Created → Allocated）
    ///
    /// # 联动
    /// 批次引用的订单按 (订单, 物料) 去重标记行为已分配并保存
    pub fn allocate_batch(&self, batch_id: u64) -> ApiResult<CommandResult> {
        let _perf = PerfGuard::new("api.allocate_batch");

        let mut batch = match self.batch_repo.find_by_id(batch_id)? {
            Some(b) => b,
            None => return Ok(CommandResult::fail(format!("批次 {} 不存在", batch_id))),
        };

        let from_status = batch.status;
        if !batch.mark_as_allocated() {
            return Ok(CommandResult::fail(format!(
                "批次 {} 当前状态 {} 不能下达",
                batch_id,
                from_status.to_db_str()
            )));
        }

        self.batch_repo.update_status(batch_id, batch.status)?;
        self.propagate_to_orders(&batch, Propagation::Allocated)?;

        self.audit(
            ActionLog::new(ActionType::AllocateBatch, "system")
                .with_entity("BATCH", batch_id)
                .with_payload(&json!({ "row_count": batch.row_count() })),
        );

        Ok(CommandResult::ok(format!("批次 {} 已下达", batch_id)))
    }

    /// 完成批次（Allocated → Completed）
    ///
    /// # 库存结算
    /// - 出库: 在库数量扣减作业量, 预约释放
    /// - 入库: 在库数量增加作业量, 预约释放
    ///
    /// # 联动
    /// 批次引用的订单按 (订单, 物料) 去重标记行为已完成并保存
    pub fn complete_batch(&self, batch_id: u64) -> ApiResult<CommandResult> {
        let _perf = PerfGuard::new("api.complete_batch");

        let mut batch = match self.batch_repo.find_by_id(batch_id)? {
            Some(b) => b,
            None => return Ok(CommandResult::fail(format!("批次 {} 不存在", batch_id))),
        };

        let from_status = batch.status;
        if !batch.mark_as_completed() {
            return Ok(CommandResult::fail(format!(
                "批次 {} 当前状态 {} 不能完成",
                batch_id,
                from_status.to_db_str()
            )));
        }

        self.settle_stock(&batch)?;
        self.batch_repo.update_status(batch_id, batch.status)?;
        self.propagate_to_orders(&batch, Propagation::Completed)?;

        self.audit(
            ActionLog::new(ActionType::CompleteBatch, "system")
                .with_entity("BATCH", batch_id)
                .with_payload(&json!({ "row_count": batch.row_count() })),
        );

        Ok(CommandResult::ok(format!("批次 {} 已完成", batch_id)))
    }

    // ==========================================
    // 查询 / 打印 / 导出
    // ==========================================

    /// 查询批次列表
    pub fn list_batches(&self, status: Option<BatchStatus>) -> ApiResult<Vec<BatchSummary>> {
        let _perf = PerfGuard::new("api.list_batches");

        let batches = match status {
            Some(s) => self.batch_repo.list_by_status(s)?,
            None => self.batch_repo.list_all()?,
        };

        Ok(batches.iter().map(BatchSummary::from_batch).collect())
    }

    /// 查询批次详情（含行集）
    pub fn get_batch_detail(&self, batch_id: u64) -> ApiResult<Option<BatchDetail>> {
        let _perf = PerfGuard::new("api.get_batch_detail");

        let batch = self.batch_repo.find_by_id(batch_id)?;
        Ok(batch.map(|b| BatchDetail::from_batch(&b)))
    }

    /// 批次打印投影（行顺序即拣货顺序）
    pub fn print_batch(&self, batch_id: u64) -> ApiResult<Option<BatchPrintSheet>> {
        let _perf = PerfGuard::new("api.print_batch");

        let batch = match self.batch_repo.find_by_id(batch_id)? {
            Some(b) => b,
            None => return Ok(None),
        };

        let rows = self.print_engine.project(&batch);
        Ok(Some(BatchPrintSheet {
            batch_id: batch.id,
            status: batch.status,
            created_at: batch.created_at,
            rows,
        }))
    }

    /// 批次导出 CSV 文件
    pub fn export_batch_csv(&self, batch_id: u64, path: &Path) -> ApiResult<CommandResult> {
        let _perf = PerfGuard::new("api.export_batch_csv");

        let batch = match self.batch_repo.find_by_id(batch_id)? {
            Some(b) => b,
            None => return Ok(CommandResult::fail(format!("批次 {} 不存在", batch_id))),
        };

        self.print_engine
            .export_csv(&batch, path)
            .map_err(|e| ApiError::ExportError(format!("批次 {} 导出失败: {}", batch_id, e)))?;

        self.audit(
            ActionLog::new(ActionType::ExportBatch, "system")
                .with_entity("BATCH", batch_id)
                .with_payload(&json!({
                    "path": path.display().to_string(),
                    "row_count": batch.row_count(),
                })),
        );

        Ok(CommandResult::ok(format!("批次 {} 已导出 CSV", batch_id)))
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    /// 将批次行按 (订单, 物料) 去重后回写订单行标志
    ///
    /// # 说明
    /// 同一订单行拆分到多个库位会产生多条批次行, 标记语义按物料首行命中,
    /// 去重避免重复加载与保存
    fn propagate_to_orders(&self, batch: &Batch, mode: Propagation) -> ApiResult<()> {
        let mut codes_by_order: BTreeMap<u64, BTreeSet<u64>> = BTreeMap::new();
        for row in batch.rows() {
            codes_by_order
                .entry(row.order_id)
                .or_default()
                .insert(row.material_code);
        }

        for (order_id, codes) in codes_by_order {
            let mut order = match self.order_repo.find_by_id(order_id)? {
                Some(o) => o,
                None => continue,
            };
            for code in codes {
                match mode {
                    Propagation::Allocated => order.set_material_as_allocated(code),
                    Propagation::Completed => order.set_material_as_completed(code),
                };
            }
            self.order_repo.save(&order)?;
        }

        Ok(())
    }

    /// 完成批次的库存结算
    ///
    /// # 说明
    /// 同一库位被多条批次行触及时在工作副本上累计, 最后一次写回;
    /// 生成期的预约保证扣减不会越过 CHECK 约束
    fn settle_stock(&self, batch: &Batch) -> ApiResult<()> {
        let mut type_by_order: HashMap<u64, OrderType> = HashMap::new();
        let mut cells: HashMap<u64, WarehouseCell> = HashMap::new();

        for row in batch.rows() {
            let order_type = match type_by_order.entry(row.order_id) {
                Entry::Occupied(e) => *e.get(),
                Entry::Vacant(e) => {
                    let order = self.order_repo.find_by_id(row.order_id)?.ok_or_else(|| {
                        ApiError::InternalError(format!("批次引用的订单 {} 不存在", row.order_id))
                    })?;
                    *e.insert(order.order_type)
                }
            };

            let cell = match cells.entry(row.cell_id) {
                Entry::Occupied(e) => e.into_mut(),
                Entry::Vacant(e) => {
                    let loaded = self.warehouse_repo.get_cell(row.cell_id)?.ok_or_else(|| {
                        ApiError::InternalError(format!("批次引用的库位 {} 不存在", row.cell_id))
                    })?;
                    e.insert(loaded)
                }
            };

            // 预约一律释放; 出库扣减在库量, 入库增加在库量
            cell.reserved_quantity = cell.reserved_quantity.saturating_sub(row.quantity);
            match order_type {
                OrderType::Output => {
                    cell.quantity = cell.quantity.saturating_sub(row.quantity);
                }
                OrderType::Input => {
                    cell.quantity = cell.quantity.saturating_add(row.quantity);
                }
            }
        }

        for cell in cells.values() {
            self.warehouse_repo
                .update_cell_stock(cell.id, cell.quantity, cell.reserved_quantity)?;
        }

        Ok(())
    }

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

/// 批次生成报告
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub batch_ids: Vec<u64>,
    pub batch_count: usize,
    pub total_rows: usize,
    pub skipped: Vec<SkippedRowDto>,
}

impl GenerationReport {
    fn new(batch_ids: Vec<u64>, result: &GenerationResult) -> Self {
        let total_rows = result.batches.iter().map(|b| b.row_count()).sum();
        let skipped = result
            .skipped_rows
            .iter()
            .map(|s| SkippedRowDto {
                order_id: s.order_id,
                order_row_id: s.order_row_id,
                material_code: s.material_code,
                reason: s.reason.clone(),
            })
            .collect();

        Self {
            batch_count: batch_ids.len(),
            batch_ids,
            total_rows,
            skipped,
        }
    }
}

/// 被跳过的订单行视图
#[derive(Debug, Clone, Serialize)]
pub struct SkippedRowDto {
    pub order_id: u64,
    pub order_row_id: u64,
    pub material_code: u64,
    pub reason: String,
}

/// 批次摘要（列表视图）
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub id: u64,
    pub status: BatchStatus,
    pub created_at: DateTime<Utc>,
    pub row_count: usize,
}

impl BatchSummary {
    fn from_batch(batch: &Batch) -> Self {
        Self {
            id: batch.id,
            status: batch.status,
            created_at: batch.created_at,
            row_count: batch.row_count(),
        }
    }
}

/// 批次行视图
#[derive(Debug, Clone, Serialize)]
pub struct BatchRowDto {
    pub id: u64,
    pub order_id: u64,
    pub order_row_id: u64,
    pub material_code: u64,
    pub quantity: u32,
    pub cell_id: u64,
    pub cell_public_id: String,
}

/// 批次详情（含行集）
#[derive(Debug, Clone, Serialize)]
pub struct BatchDetail {
    pub id: u64,
    pub status: BatchStatus,
    pub created_at: DateTime<Utc>,
    pub rows: Vec<BatchRowDto>,
}

impl BatchDetail {
    fn from_batch(batch: &Batch) -> Self {
        let rows = batch
            .rows()
            .iter()
            .map(|r| BatchRowDto {
                id: r.id,
                order_id: r.order_id,
                order_row_id: r.order_row_id,
                material_code: r.material_code,
                quantity: r.quantity,
                cell_id: r.cell_id,
                cell_public_id: r.cell_public_id.clone(),
            })
            .collect();

        Self {
            id: batch.id,
            status: batch.status,
            created_at: batch.created_at,
            rows,
        }
    }
}

/// 批次打印单（投影结果 + 批次元信息）
#[derive(Debug, Clone, Serialize)]
pub struct BatchPrintSheet {
    pub batch_id: u64,
    pub status: BatchStatus,
    pub created_at: DateTime<Utc>,
    pub rows: Vec<BatchPrintRow>,
}
