// ==========================================
// 仓储管理系统 - 配置管理 API
// ==========================================
// 职责: 配置查询、更新, 批次参数的写侧校验
// 作用域: 当前仅 global, 表结构预留多作用域
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use serde::Serialize;
use serde_json::json;
use tracing::warn;

use crate::api::error::{ApiError, ApiResult};
use crate::api::CommandResult;
use crate::config::{config_keys, ConfigManager};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::perf::PerfGuard;
use crate::repository::ActionLogRepository;

// ==========================================
// ConfigApi - 配置管理 API
// ==========================================

/// 配置管理API
///
/// 职责：
/// 1. 配置查询（全部、单个）
/// 2. 配置更新（写侧校验已知键）
/// 3. ActionLog记录
pub struct ConfigApi {
    conn: Arc<Mutex<Connection>>,
    config_manager: Arc<ConfigManager>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl ConfigApi {
    /// 创建新的ConfigApi实例
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        config_manager: Arc<ConfigManager>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            conn,
            config_manager,
            action_log_repo,
        }
    }

    /// 查询所有配置
    pub fn list_configs(&self) -> ApiResult<Vec<ConfigItem>> {
        let _perf = PerfGuard::new("api.list_configs");

        let conn = self
            .conn
            .lock()
            .map_err(|e| ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", e)))?;

        let mut stmt = conn
            .prepare(
                "SELECT key, value, updated_at FROM config_kv
                 WHERE scope_id = 'global' ORDER BY key",
            )
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

        let items = stmt
            .query_map([], |row| {
                Ok(ConfigItem {
                    key: row.get(0)?,
                    value: row.get(1)?,
                    updated_at: row.get(2)?,
                })
            })
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

        Ok(items)
    }

    /// 查询单个配置
    pub fn get_config(&self, key: &str) -> ApiResult<Option<String>> {
        let _perf = PerfGuard::new("api.get_config");

        let key = key.trim();
        if key.is_empty() {
            return Err(ApiError::InvalidInput("配置键不能为空".to_string()));
        }

        self.config_manager
            .get_value(key)
            .map_err(|e| ApiError::ConfigError(format!("读取配置 {} 失败: {}", key, e)))
    }

    /// 更新配置
    ///
    /// # 说明
    /// 已知键做写侧校验, 拒绝写入非法值; 未知键原样保存
    ///
    /// # 返回
    /// - success=false: 已知键的值未通过校验
    pub fn set_config(&self, key: &str, value: &str) -> ApiResult<CommandResult> {
        let _perf = PerfGuard::new("api.set_config");

        let key = key.trim();
        if key.is_empty() {
            return Err(ApiError::InvalidInput("配置键不能为空".to_string()));
        }
        let value = value.trim();
        if value.is_empty() {
            return Err(ApiError::InvalidInput("配置值不能为空".to_string()));
        }

        // 写侧校验: 批次行数上限必须是 1..=500 的整数
        if key == config_keys::BATCH_MAX_ROWS_PER_BATCH {
            match value.parse::<usize>() {
                Ok(n) if (1..=500).contains(&n) => {}
                _ => {
                    return Ok(CommandResult::fail(format!(
                        "批次行数上限必须是 1-500 的整数, 收到: {}",
                        value
                    )));
                }
            }
        }

        self.config_manager
            .set_value(key, value)
            .map_err(|e| ApiError::ConfigError(format!("写入配置 {} 失败: {}", key, e)))?;

        self.audit(
            ActionLog::new(ActionType::UpdateConfig, "system")
                .with_entity("CONFIG", key)
                .with_payload(&json!({ "key": key, "value": value })),
        );

        Ok(CommandResult::ok(format!("配置 {} 已更新", key)))
    }

    /// 读取批次行数上限（非法值回落默认）
    pub fn get_batch_max_rows(&self) -> ApiResult<usize> {
        let _perf = PerfGuard::new("api.get_batch_max_rows");

        self.config_manager
            .get_batch_max_rows()
            .map_err(|e| ApiError::ConfigError(format!("读取批次行数上限失败: {}", e)))
    }

    /// 尽力记录操作日志, 失败只告警
    fn audit(&self, log: ActionLog) {
        if let Err(e) = self.action_log_repo.insert(&log) {
            warn!(error = %e, action_type = %log.action_type, "记录操作日志失败");
        }
    }
}

// ==========================================
// DTO
// ==========================================

/// 配置项视图
#[derive(Debug, Clone, Serialize)]
pub struct ConfigItem {
    pub key: String,
    pub value: String,
    pub updated_at: String,
}
