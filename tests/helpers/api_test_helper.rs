// ==========================================
// API集成测试辅助工具
// ==========================================
// 职责: 提供API层集成测试的通用辅助函数
// ==========================================

#[path = "../test_helpers.rs"]
mod test_helpers;

use std::sync::Arc;

use tempfile::NamedTempFile;

use warehouse_ops::api::order_api::{CreateOrderRequest, NewOrderRowRequest};
use warehouse_ops::api::warehouse_api::CreateCellRequest;
use warehouse_ops::api::{
    BatchApi, CommandResult, ConfigApi, DashboardApi, ImportApi, MaterialApi, OrderApi,
    WarehouseApi,
};
use warehouse_ops::app::AppState;
use warehouse_ops::domain::types::{OrderType, Priority};

// ==========================================
// API测试环境
// ==========================================

/// API测试环境
///
/// 所有API共享同一临时数据库
pub struct ApiTestEnv {
    pub db_path: String,
    pub material_api: Arc<MaterialApi>,
    pub order_api: Arc<OrderApi>,
    pub batch_api: Arc<BatchApi>,
    pub warehouse_api: Arc<WarehouseApi>,
    pub dashboard_api: Arc<DashboardApi>,
    pub config_api: Arc<ConfigApi>,
    pub import_api: Arc<ImportApi>,

    // 临时文件（确保生命周期）
    _temp_file: NamedTempFile,
}

impl ApiTestEnv {
    /// 创建新的API测试环境
    ///
    /// # 说明
    /// - 使用临时数据库文件
    /// - 通过 AppState 完成全部装配
    pub fn new() -> Result<Self, String> {
        let (temp_file, db_path) =
            test_helpers::create_test_db().map_err(|e| format!("创建测试数据库失败: {}", e))?;

        let state = AppState::new(db_path.clone())?;

        Ok(Self {
            db_path,
            material_api: state.material_api.clone(),
            order_api: state.order_api.clone(),
            batch_api: state.batch_api.clone(),
            warehouse_api: state.warehouse_api.clone(),
            dashboard_api: state.dashboard_api.clone(),
            config_api: state.config_api.clone(),
            import_api: state.import_api.clone(),
            _temp_file: temp_file,
        })
    }

    // ==========================================
    // 测试数据准备
    // ==========================================

    /// 建档一批物料
    pub fn seed_materials(&self, materials: &[(u64, &str)]) {
        for (code, description) in materials {
            let result = self
                .material_api
                .create_material(*code, description)
                .expect("物料建档失败");
            assert!(result.success, "物料建档被拒: {}", result.message);
        }
    }

    /// 创建一条巷道与一个货架, 返回 shelf_id
    pub fn seed_shelf(&self, line_code: &str) -> u64 {
        let line = self
            .warehouse_api
            .create_line(line_code)
            .expect("创建巷道失败");
        assert!(line.success, "创建巷道被拒: {}", line.message);
        let line_id = detail_u64(&line, "line_id");

        let shelf = self
            .warehouse_api
            .create_shelf(line_id, 1)
            .expect("创建货架失败");
        assert!(shelf.success, "创建货架被拒: {}", shelf.message);
        detail_u64(&shelf, "shelf_id")
    }

    /// 创建一个有货库位, 返回 cell_id
    pub fn seed_stocked_cell(
        &self,
        shelf_id: u64,
        code: u32,
        public_id: &str,
        material_code: u64,
        quantity: u32,
    ) -> u64 {
        let cell = self
            .warehouse_api
            .create_cell(CreateCellRequest {
                shelf_id,
                code,
                public_id: public_id.to_string(),
                material_code: Some(material_code),
                quantity,
            })
            .expect("创建库位失败");
        assert!(cell.success, "创建库位被拒: {}", cell.message);
        detail_u64(&cell, "cell_id")
    }

    /// 创建一张等待分配的订单
    pub fn seed_order(
        &self,
        order_id: u64,
        order_type: OrderType,
        priority: Priority,
        rows: &[(u64, u32)],
    ) {
        let rows = rows
            .iter()
            .map(|(material_code, quantity)| NewOrderRowRequest {
                material_code: *material_code,
                quantity: *quantity,
            })
            .collect();

        let result = self
            .order_api
            .create_order(CreateOrderRequest {
                order_id,
                order_type,
                priority,
                emission_date: Some(chrono::Utc::now()),
                rows,
            })
            .expect("创建订单失败");
        assert!(result.success, "创建订单被拒: {}", result.message);
    }
}

/// 从 CommandResult.details 取数值字段
pub fn detail_u64(result: &CommandResult, key: &str) -> u64 {
    result
        .details
        .as_ref()
        .and_then(|d| d.get(key))
        .and_then(|v| v.as_u64())
        .unwrap_or_else(|| panic!("返回结果缺少 {}", key))
}
