// ==========================================
// 仓储管理系统 - 物料导入 API
// ==========================================
// 职责: 封装物料文件导入, 唯一的异步 API 入口
// 解析与落库在阻塞线程池执行, 不占用异步运行时
// ==========================================

use std::path::Path;
use std::sync::Arc;

use serde_json::json;
use tracing::warn;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::importer::{MaterialImport, MaterialImportReport};
use crate::perf::PerfGuard;
use crate::repository::ActionLogRepository;

// ==========================================
// ImportApi - 物料导入 API
// ==========================================

/// 物料导入API
///
/// 职责：
/// 1. 导入入口参数校验
/// 2. 委托导入器执行（CSV / Excel 自动识别）
/// 3. ActionLog记录（含导入统计）
pub struct ImportApi {
    importer: Arc<dyn MaterialImport>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl ImportApi {
    /// 创建新的ImportApi实例
    pub fn new(
        importer: Arc<dyn MaterialImport>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            importer,
            action_log_repo,
        }
    }

    /// 从文件导入物料
    ///
    /// # 参数
    /// - `file_path`: CSV 或 Excel 文件路径
    ///
    /// # 返回
    /// 导入报告: 各行去向（入库 / 跳过已有 / 拒绝）与耗时
    pub async fn import_materials(&self, file_path: &str) -> ApiResult<MaterialImportReport> {
        let _perf = PerfGuard::new("api.import_materials");

        let file_path = file_path.trim();
        if file_path.is_empty() {
            return Err(ApiError::InvalidInput("导入文件路径不能为空".to_string()));
        }

        let report = self.importer.import_from_file(Path::new(file_path)).await?;

        self.audit(
            ActionLog::new(ActionType::ImportMaterials, "system")
                .with_payload(&json!({
                    "file": file_path,
                    "total_rows": report.total_rows,
                    "imported": report.imported,
                    "skipped_existing": report.skipped_existing,
                    "rejected": report.rejected,
                })),
        );

        Ok(report)
    }

    /// 尽力记录操作日志, 失败只告警
    fn audit(&self, log: ActionLog) {
        if let Err(e) = self.action_log_repo.insert(&log) {
            warn!(error = %e, action_type = %log.action_type, "记录操作日志失败");
        }
    }
}
