// ==========================================
// 仓储管理系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 所有仓储共享同一条 SQLite 连接, 外键与 WAL 在打开时统一配置
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{
    BatchApi, ConfigApi, DashboardApi, ImportApi, MaterialApi, OrderApi, WarehouseApi,
};
use crate::config::ConfigManager;
use crate::db;
use crate::importer::{MaterialImport, MaterialImporter};
use crate::perf;
use crate::repository::{
    ActionLogRepository, BatchRepository, MaterialRepository, OrderRepository,
    WarehouseRepository,
};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 物料API
    pub material_api: Arc<MaterialApi>,

    /// 订单API
    pub order_api: Arc<OrderApi>,

    /// 批次API
    pub batch_api: Arc<BatchApi>,

    /// 库区API
    pub warehouse_api: Arc<WarehouseApi>,

    /// 驾驶舱API
    pub dashboard_api: Arc<DashboardApi>,

    /// 配置管理API
    pub config_api: Arc<ConfigApi>,

    /// 物料导入API
    pub import_api: Arc<ImportApi>,

    /// 操作日志仓储（用于审计追踪）
    pub action_log_repo: Arc<ActionLogRepository>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开共享连接并初始化表结构
    /// 2. 初始化所有Repository
    /// 3. 创建所有API实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        // 创建数据库连接（共享连接）
        let mut conn = db::open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        db::init_schema(&conn).map_err(|e| format!("无法初始化表结构: {}", e))?;
        perf::install_sqlite_tracing(&mut conn);
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================

        let material_repo = Arc::new(MaterialRepository::from_connection(conn.clone()));
        let order_repo = Arc::new(OrderRepository::from_connection(conn.clone()));
        let batch_repo = Arc::new(BatchRepository::from_connection(conn.clone()));
        let warehouse_repo = Arc::new(WarehouseRepository::from_connection(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::from_connection(conn.clone()));

        // 配置管理器
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        // ==========================================
        // 初始化API层
        // ==========================================

        // 物料API
        let material_api = Arc::new(MaterialApi::new(
            material_repo.clone(),
            action_log_repo.clone(),
        ));

        // 订单API
        let order_api = Arc::new(OrderApi::new(
            order_repo.clone(),
            batch_repo.clone(),
            material_repo.clone(),
            action_log_repo.clone(),
        ));

        // 批次API
        let batch_api = Arc::new(BatchApi::new(
            batch_repo.clone(),
            order_repo.clone(),
            warehouse_repo.clone(),
            config_manager.clone(),
            action_log_repo.clone(),
        ));

        // 库区API
        let warehouse_api = Arc::new(WarehouseApi::new(
            warehouse_repo.clone(),
            material_repo.clone(),
            action_log_repo.clone(),
        ));

        // 驾驶舱API
        let dashboard_api = Arc::new(DashboardApi::new(
            order_repo.clone(),
            batch_repo.clone(),
            material_repo.clone(),
            warehouse_repo.clone(),
            action_log_repo.clone(),
        ));

        // 配置管理API
        let config_api = Arc::new(ConfigApi::new(
            conn.clone(),
            config_manager.clone(),
            action_log_repo.clone(),
        ));

        // 物料导入API
        let importer: Arc<dyn MaterialImport> =
            Arc::new(MaterialImporter::new(material_repo.clone()));
        let import_api = Arc::new(ImportApi::new(importer, action_log_repo.clone()));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            material_api,
            order_api,
            batch_api,
            warehouse_api,
            dashboard_api,
            config_api,
            import_api,
            action_log_repo,
        })
    }

    /// 获取数据库路径
    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }
}

// ==========================================
// 默认数据库路径辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - 开发环境: 用户数据目录/warehouse-ops-dev/warehouse_ops.db
/// - 生产环境: 用户数据目录/warehouse-ops/warehouse_ops.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var("WAREHOUSE_OPS_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    // 先给一个默认回退值, 后续如果能拿到 data_dir 再覆盖
    let mut path = PathBuf::from("./warehouse_ops.db");

    if let Some(data_dir) = dirs::data_dir() {
        // 开发环境使用独立目录，避免污染生产数据
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("warehouse-ops-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("warehouse-ops");
        }

        // 确保目录存在
        std::fs::create_dir_all(&path).ok();
        path = path.join("warehouse_ops.db");
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[test]
    fn test_app_state_over_temp_db() {
        let dir = tempfile::tempdir().expect("无法创建临时目录");
        let db_path = dir.path().join("state_test.db");

        let state = AppState::new(db_path.to_string_lossy().to_string()).expect("初始化失败");
        assert!(state.get_db_path().ends_with("state_test.db"));

        // 同一库上各 API 共享连接: 建档后立即可见
        let created = state
            .material_api
            .create_material(9001, "状态机测试物料")
            .expect("建档失败");
        assert!(created.success);

        let found = state.material_api.get_material(9001).expect("查询失败");
        assert!(found.is_some());
    }
}
