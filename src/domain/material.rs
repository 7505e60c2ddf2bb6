// ==========================================
// 仓储管理系统 - 物料领域模型
// ==========================================
// 物料为不可变主数据: code 为自然键, 建立后不再修改
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Material - 物料主数据
// ==========================================
// 用途: 订单行与库位引用的基础数据
// 对齐: wms_material 表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    pub code: u64,           // 物料编码（自然键，0 表示未赋码，非法）
    pub description: String, // 物料描述
    pub created_at: DateTime<Utc>, // 记录创建时间
}

impl Material {
    /// 创建物料
    ///
    /// # 参数
    /// - `code`: 物料编码，0 视为未赋码
    /// - `description`: 物料描述
    pub fn new(code: u64, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
            created_at: Utc::now(),
        }
    }

    /// 编码是否有效（已赋码）
    pub fn has_valid_code(&self) -> bool {
        self.code != 0
    }
}
