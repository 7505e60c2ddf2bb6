// ==========================================
// 仓储管理系统 - 操作日志领域模型
// ==========================================
// 规则: 所有写操作尽力记录, 审计失败不阻断业务
// 对齐: action_log 表
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    // ===== 主键 =====
    pub action_id: String,            // 日志 ID（UUID）
    pub action_type: String,          // 操作类型（存储为字符串）
    pub action_ts: DateTime<Utc>,     // 操作时间戳
    pub actor: String,                // 操作人

    // ===== 关联实体 =====
    pub entity_type: Option<String>,  // 实体类型（ORDER/BATCH/MATERIAL/...）
    pub entity_id: Option<String>,    // 实体标识

    // ===== 操作负载 =====
    pub payload_json: Option<JsonValue>, // 操作参数 (JSON)
    pub detail: Option<String>,          // 详细描述
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    CreateOrder,     // 创建订单
    UpdateOrder,     // 修改订单
    DeleteOrder,     // 删除订单
    AddOrderRow,     // 添加订单行
    RemoveOrderRow,  // 移除订单行
    GenerateBatches, // 生成批次
    AllocateBatch,   // 下达批次
    CompleteBatch,   // 完成批次
    ExportBatch,     // 导出批次
    CreateMaterial,  // 创建物料
    DeleteMaterial,  // 删除物料
    CreateTopology,  // 建立库区拓扑
    DeleteLine,      // 删除巷道
    ImportMaterials, // 导入物料主数据
    UpdateConfig,    // 更新配置
}

impl ActionType {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::CreateOrder => "CreateOrder",
            ActionType::UpdateOrder => "UpdateOrder",
            ActionType::DeleteOrder => "DeleteOrder",
            ActionType::AddOrderRow => "AddOrderRow",
            ActionType::RemoveOrderRow => "RemoveOrderRow",
            ActionType::GenerateBatches => "GenerateBatches",
            ActionType::AllocateBatch => "AllocateBatch",
            ActionType::CompleteBatch => "CompleteBatch",
            ActionType::ExportBatch => "ExportBatch",
            ActionType::CreateMaterial => "CreateMaterial",
            ActionType::DeleteMaterial => "DeleteMaterial",
            ActionType::CreateTopology => "CreateTopology",
            ActionType::DeleteLine => "DeleteLine",
            ActionType::ImportMaterials => "ImportMaterials",
            ActionType::UpdateConfig => "UpdateConfig",
        }
    }

    /// 从字符串解析
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "CreateOrder" => Some(ActionType::CreateOrder),
            "UpdateOrder" => Some(ActionType::UpdateOrder),
            "DeleteOrder" => Some(ActionType::DeleteOrder),
            "AddOrderRow" => Some(ActionType::AddOrderRow),
            "RemoveOrderRow" => Some(ActionType::RemoveOrderRow),
            "GenerateBatches" => Some(ActionType::GenerateBatches),
            "AllocateBatch" => Some(ActionType::AllocateBatch),
            "CompleteBatch" => Some(ActionType::CompleteBatch),
            "ExportBatch" => Some(ActionType::ExportBatch),
            "CreateMaterial" => Some(ActionType::CreateMaterial),
            "DeleteMaterial" => Some(ActionType::DeleteMaterial),
            "CreateTopology" => Some(ActionType::CreateTopology),
            "DeleteLine" => Some(ActionType::DeleteLine),
            "ImportMaterials" => Some(ActionType::ImportMaterials),
            "UpdateConfig" => Some(ActionType::UpdateConfig),
            _ => None,
        }
    }
}

// ==========================================
// ActionLog 辅助方法
// ==========================================
impl ActionLog {
    /// 创建新的操作日志
    ///
    /// # 参数
    /// - `action_type`: 操作类型
    /// - `actor`: 操作人
    pub fn new(action_type: ActionType, actor: impl Into<String>) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            action_type: action_type.as_str().to_string(),
            action_ts: Utc::now(),
            actor: actor.into(),
            entity_type: None,
            entity_id: None,
            payload_json: None,
            detail: None,
        }
    }

    /// 设置关联实体
    pub fn with_entity(mut self, entity_type: &str, entity_id: impl ToString) -> Self {
        self.entity_type = Some(entity_type.to_string());
        self.entity_id = Some(entity_id.to_string());
        self
    }

    /// 设置操作负载 (转换为JSON)
    pub fn with_payload<T: Serialize>(mut self, payload: &T) -> Self {
        self.payload_json = serde_json::to_value(payload).ok();
        self
    }

    /// 设置详细描述
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_type_roundtrip() {
        for t in [
            ActionType::CreateOrder,
            ActionType::GenerateBatches,
            ActionType::CompleteBatch,
            ActionType::UpdateConfig,
        ] {
            assert_eq!(ActionType::from_str(t.as_str()), Some(t));
        }
        assert_eq!(ActionType::from_str("Unknown"), None);
    }

    #[test]
    fn test_builder_chain() {
        let log = ActionLog::new(ActionType::AllocateBatch, "admin")
            .with_entity("BATCH", 7)
            .with_detail("批次下达");

        assert_eq!(log.action_type, "AllocateBatch");
        assert_eq!(log.entity_type.as_deref(), Some("BATCH"));
        assert_eq!(log.entity_id.as_deref(), Some("7"));
        assert!(log.detail.is_some());
        assert!(!log.action_id.is_empty());
    }
}
