// ==========================================
// 仓储管理系统 - 物料 API
// ==========================================
// 职责: 物料主数据的建档、查询、删除
// 物料不可修改: 编码为自然键, 描述建档后不再变更
// ==========================================

use std::sync::Arc;

use serde_json::json;
use tracing::warn;

use crate::api::error::{ApiError, ApiResult};
use crate::api::CommandResult;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::material::Material;
use crate::perf::PerfGuard;
use crate::repository::{ActionLogRepository, MaterialRepository};

// ==========================================
// MaterialApi - 物料 API
// ==========================================

/// 物料API
///
/// 职责：
/// 1. 物料建档（编码查重）
/// 2. 物料查询（单个 / 列表）
/// 3. 物料删除（引用保护）
/// 4. ActionLog记录
pub struct MaterialApi {
    material_repo: Arc<MaterialRepository>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl MaterialApi {
    /// 创建新的MaterialApi实例
    pub fn new(
        material_repo: Arc<MaterialRepository>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            material_repo,
            action_log_repo,
        }
    }

    /// 物料建档
    ///
    /// # 参数
    /// - `code`: 物料编码, 0 非法
    /// - `description`: 物料描述, 不能为空
    ///
    /// # 返回
    /// - success=false: 编码已存在
    pub fn create_material(&self, code: u64, description: &str) -> ApiResult<CommandResult> {
        let _perf = PerfGuard::new("api.create_material");

        if code == 0 {
            return Err(ApiError::InvalidInput("物料编码不能为 0".to_string()));
        }
        let description = description.trim();
        if description.is_empty() {
            return Err(ApiError::InvalidInput("物料描述不能为空".to_string()));
        }

        if self.material_repo.find_by_code(code)?.is_some() {
            return Ok(CommandResult::fail(format!("物料 {} 已存在", code)));
        }

        let material = Material::new(code, description);
        self.material_repo.insert(&material)?;

        self.audit(
            ActionLog::new(ActionType::CreateMaterial, "system")
                .with_entity("MATERIAL", code)
                .with_payload(&json!({ "description": description })),
        );

        Ok(CommandResult::ok(format!("物料 {} 已建档", code)))
    }

    /// 查询单个物料
    pub fn get_material(&self, code: u64) -> ApiResult<Option<Material>> {
        let _perf = PerfGuard::new("api.get_material");

        if code == 0 {
            return Err(ApiError::InvalidInput("物料编码不能为 0".to_string()));
        }

        Ok(self.material_repo.find_by_code(code)?)
    }

    /// 查询全部物料（按编码升序）
    pub fn list_materials(&self) -> ApiResult<Vec<Material>> {
        let _perf = PerfGuard::new("api.list_materials");

        Ok(self.material_repo.list_all()?)
    }

    /// 删除物料
    ///
    /// # 返回
    /// - success=false: 物料不存在, 或仍被订单行 / 库位引用
    pub fn delete_material(&self, code: u64) -> ApiResult<CommandResult> {
        let _perf = PerfGuard::new("api.delete_material");

        if code == 0 {
            return Err(ApiError::InvalidInput("物料编码不能为 0".to_string()));
        }

        if self.material_repo.find_by_code(code)?.is_none() {
            return Ok(CommandResult::fail(format!("物料 {} 不存在", code)));
        }

        if self.material_repo.is_referenced(code)? {
            return Ok(CommandResult::fail(format!(
                "物料 {} 仍被订单行或库位引用, 不能删除",
                code
            )));
        }

        self.material_repo.delete(code)?;

        self.audit(ActionLog::new(ActionType::DeleteMaterial, "system").with_entity("MATERIAL", code));

        Ok(CommandResult::ok(format!("物料 {} 已删除", code)))
    }

    /// 尽力记录操作日志, 失败只告警
    fn audit(&self, log: ActionLog) {
        if let Err(e) = self.action_log_repo.insert(&log) {
            warn!(error = %e, action_type = %log.action_type, "记录操作日志失败");
        }
    }
}
