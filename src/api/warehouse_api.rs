// ==========================================
// 仓储管理系统 - 库区 API
// ==========================================
// 职责: 巷道/货架/库位的搭建与查询, 库存汇总
// 拓扑删除只开放巷道级, 货架与库位随 CASCADE 级联
// ==========================================

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::api::error::{ApiError, ApiResult};
use crate::api::CommandResult;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::warehouse::{WarehouseCell, WarehouseLine};
use crate::perf::PerfGuard;
use crate::repository::{
    ActionLogRepository, MaterialRepository, MaterialStockSummary, RepositoryError,
    WarehouseRepository,
};

// ==========================================
// 请求类型
// ==========================================

/// 库位创建请求
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCellRequest {
    pub shelf_id: u64,
    pub code: u32,
    pub public_id: String,
    pub material_code: Option<u64>,
    pub quantity: u32,
}

// ==========================================
// WarehouseApi - 库区 API
// ==========================================

/// 库区API
///
/// 职责：
/// 1. 拓扑搭建（巷道 → 货架 → 库位）
/// 2. 拓扑与库位查询
/// 3. 分物料库存汇总
/// 4. 巷道删除（在途预约保护）
/// 5. ActionLog记录
pub struct WarehouseApi {
    warehouse_repo: Arc<WarehouseRepository>,
    material_repo: Arc<MaterialRepository>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl WarehouseApi {
    /// 创建新的WarehouseApi实例
    pub fn new(
        warehouse_repo: Arc<WarehouseRepository>,
        material_repo: Arc<MaterialRepository>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            warehouse_repo,
            material_repo,
            action_log_repo,
        }
    }

    // ==========================================
    // 拓扑搭建
    // ==========================================

    /// 创建巷道
    ///
    /// # 返回
    /// - success=true: details 携带 line_id
    /// - success=false: 巷道编码已存在
    pub fn create_line(&self, code: &str) -> ApiResult<CommandResult> {
        let _perf = PerfGuard::new("api.create_line");

        let code = code.trim();
        if code.is_empty() {
            return Err(ApiError::InvalidInput("巷道编码不能为空".to_string()));
        }

        let line_id = match self.warehouse_repo.insert_line(code) {
            Ok(id) => id,
            Err(RepositoryError::UniqueConstraintViolation(_)) => {
                return Ok(CommandResult::fail(format!("巷道编码 {} 已存在", code)));
            }
            Err(e) => return Err(e.into()),
        };

        self.audit(
            ActionLog::new(ActionType::CreateTopology, "system")
                .with_entity("LINE", line_id)
                .with_payload(&json!({ "kind": "line", "code": code })),
        );

        Ok(CommandResult::ok_with(
            format!("巷道 {} 已创建", code),
            json!({ "line_id": line_id }),
        ))
    }

    /// 创建货架
    ///
    /// # 返回
    /// - success=true: details 携带 shelf_id
    /// - success=false: 巷道不存在, 或架号在巷道内重复
    pub fn create_shelf(&self, line_id: u64, code: u32) -> ApiResult<CommandResult> {
        let _perf = PerfGuard::new("api.create_shelf");

        if line_id == 0 {
            return Err(ApiError::InvalidInput("巷道 ID 不能为 0".to_string()));
        }

        let shelf_id = match self.warehouse_repo.insert_shelf(line_id, code) {
            Ok(id) => id,
            Err(RepositoryError::ForeignKeyViolation(_)) => {
                return Ok(CommandResult::fail(format!("巷道 {} 不存在", line_id)));
            }
            Err(RepositoryError::UniqueConstraintViolation(_)) => {
                return Ok(CommandResult::fail(format!(
                    "巷道 {} 内架号 {} 已存在",
                    line_id, code
                )));
            }
            Err(e) => return Err(e.into()),
        };

        self.audit(
            ActionLog::new(ActionType::CreateTopology, "system")
                .with_entity("SHELF", shelf_id)
                .with_payload(&json!({ "kind": "shelf", "line_id": line_id, "code": code })),
        );

        Ok(CommandResult::ok_with(
            format!("货架 {} 已创建", shelf_id),
            json!({ "shelf_id": shelf_id }),
        ))
    }

    /// 创建库位
    ///
    /// # 说明
    /// 可带初始库存: material_code 为空时在库数量必须为 0
    ///
    /// # 返回
    /// - success=true: details 携带 cell_id
    /// - success=false: 货架不存在 / 物料未建档 / 公示号或位号重复
    pub fn create_cell(&self, req: CreateCellRequest) -> ApiResult<CommandResult> {
        let _perf = PerfGuard::new("api.create_cell");

        let public_id = req.public_id.trim();
        if public_id.is_empty() {
            return Err(ApiError::InvalidInput("库位公示号不能为空".to_string()));
        }
        if req.shelf_id == 0 {
            return Err(ApiError::InvalidInput("货架 ID 不能为 0".to_string()));
        }
        if req.material_code == Some(0) {
            return Err(ApiError::InvalidInput("物料编码不能为 0".to_string()));
        }
        if req.material_code.is_none() && req.quantity > 0 {
            return Err(ApiError::InvalidInput(
                "空库位的在库数量必须为 0".to_string(),
            ));
        }

        if let Some(code) = req.material_code {
            if self.material_repo.find_by_code(code)?.is_none() {
                return Ok(CommandResult::fail(format!("物料 {} 未建档", code)));
            }
        }

        let cell = WarehouseCell {
            id: 0,
            shelf_id: req.shelf_id,
            code: req.code,
            public_id: public_id.to_string(),
            material_code: req.material_code,
            quantity: req.quantity,
            reserved_quantity: 0,
        };

        let cell_id = match self.warehouse_repo.insert_cell(&cell) {
            Ok(id) => id,
            Err(RepositoryError::ForeignKeyViolation(_)) => {
                return Ok(CommandResult::fail(format!("货架 {} 不存在", req.shelf_id)));
            }
            Err(RepositoryError::UniqueConstraintViolation(_)) => {
                return Ok(CommandResult::fail(format!(
                    "库位公示号 {} 或位号 {} 已存在",
                    public_id, req.code
                )));
            }
            Err(e) => return Err(e.into()),
        };

        self.audit(
            ActionLog::new(ActionType::CreateTopology, "system")
                .with_entity("CELL", cell_id)
                .with_payload(&json!({
                    "kind": "cell",
                    "shelf_id": req.shelf_id,
                    "public_id": public_id,
                    "material_code": req.material_code,
                    "quantity": req.quantity,
                })),
        );

        Ok(CommandResult::ok_with(
            format!("库位 {} 已创建", public_id),
            json!({ "cell_id": cell_id }),
        ))
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 查询完整拓扑（巷道 → 货架 → 库位）
    pub fn get_topology(&self) -> ApiResult<Vec<WarehouseLine>> {
        let _perf = PerfGuard::new("api.get_topology");

        Ok(self.warehouse_repo.get_topology()?)
    }

    /// 查询库位列表
    ///
    /// # 参数
    /// - `material_code`: Some 时仅返回存放该物料的库位
    pub fn list_cells(&self, material_code: Option<u64>) -> ApiResult<Vec<WarehouseCell>> {
        let _perf = PerfGuard::new("api.list_cells");

        let cells = match material_code {
            Some(code) => {
                if code == 0 {
                    return Err(ApiError::InvalidInput("物料编码不能为 0".to_string()));
                }
                self.warehouse_repo.list_cells_by_material(code)?
            }
            None => self.warehouse_repo.list_all_cells()?,
        };

        Ok(cells)
    }

    /// 分物料库存汇总
    pub fn stock_summary(&self) -> ApiResult<Vec<MaterialStockSummary>> {
        let _perf = PerfGuard::new("api.stock_summary");

        Ok(self.warehouse_repo.stock_summary()?)
    }

    // ==========================================
    // 拓扑删除
    // ==========================================

    /// 删除巷道（货架与库位级联删除）
    ///
    /// # 返回
    /// - success=false: 巷道不存在, 或巷道内存在在途预约
    pub fn delete_line(&self, line_id: u64) -> ApiResult<CommandResult> {
        let _perf = PerfGuard::new("api.delete_line");

        if line_id == 0 {
            return Err(ApiError::InvalidInput("巷道 ID 不能为 0".to_string()));
        }

        if self.warehouse_repo.line_has_reservations(line_id)? {
            return Ok(CommandResult::fail(format!(
                "巷道 {} 内存在在途预约, 不能删除",
                line_id
            )));
        }

        if !self.warehouse_repo.delete_line(line_id)? {
            return Ok(CommandResult::fail(format!("巷道 {} 不存在", line_id)));
        }

        self.audit(ActionLog::new(ActionType::DeleteLine, "system").with_entity("LINE", line_id));

        Ok(CommandResult::ok(format!("巷道 {} 已删除", line_id)))
    }

    /// 尽力记录操作日志, 失败只告警
    fn audit(&self, log: ActionLog) {
        if let Err(e) = self.action_log_repo.insert(&log) {
            warn!(error = %e, action_type = %log.action_type, "记录操作日志失败");
        }
    }
}
