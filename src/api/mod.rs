// ==========================================
// 仓储管理系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口, 供任意展示层调用
// 约定: 业务规则失败返回 CommandResult{success:false},
//       基础设施失败返回 Err(ApiError)
// ==========================================

use serde::{Deserialize, Serialize};

pub mod error;
pub mod batch_api;
pub mod config_api;
pub mod dashboard_api;
pub mod import_api;
pub mod material_api;
pub mod order_api;
pub mod warehouse_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use batch_api::BatchApi;
pub use config_api::ConfigApi;
pub use dashboard_api::DashboardApi;
pub use import_api::ImportApi;
pub use material_api::MaterialApi;
pub use order_api::OrderApi;
pub use warehouse_api::WarehouseApi;

// ==========================================
// CommandResult - 写操作统一返回
// ==========================================
/// 写操作统一返回结构
///
/// # 说明
/// 业务规则拒绝（订单不可编辑、状态不可跳转、引用未释放等）不是错误，
/// 以 success=false + 原因消息表达；基础设施失败才走 Err(ApiError)。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    /// 操作是否成功
    pub success: bool,

    /// 结果消息（成功提示或拒绝原因）
    pub message: String,

    /// 详细信息（可选JSON）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl CommandResult {
    /// 成功结果
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            details: None,
        }
    }

    /// 成功结果, 携带详细信息
    pub fn ok_with(message: impl Into<String>, details: serde_json::Value) -> Self {
        Self {
            success: true,
            message: message.into(),
            details: Some(details),
        }
    }

    /// 业务规则拒绝
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            details: None,
        }
    }

    /// 业务规则拒绝, 携带详细信息
    pub fn fail_with(message: impl Into<String>, details: serde_json::Value) -> Self {
        Self {
            success: false,
            message: message.into(),
            details: Some(details),
        }
    }
}
