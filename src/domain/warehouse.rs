// ==========================================
// 仓储管理系统 - 库区领域模型
// ==========================================
// 拓扑: Line → Shelf → Cell 静态包含, 逐级独占所有权
// 库存不变量: 0 <= reserved_quantity <= quantity
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// WarehouseCell - 库位
// ==========================================
// 最小可寻址存储单元, 携带物料库存与预约量
// 对齐: wms_warehouse_cell 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseCell {
    pub id: u64,                    // 库位 ID
    pub shelf_id: u64,              // 所属货架
    pub code: u32,                  // 架内位号
    pub public_id: String,          // 公示号（单据上的拣货位置）
    pub material_code: Option<u64>, // 当前存放物料（NULL = 空位）
    pub quantity: u32,              // 在库数量
    pub reserved_quantity: u32,     // 已预约数量（在途批次占用）
}

impl WarehouseCell {
    /// 空闲库存 = 在库数量 - 已预约数量
    pub fn free_quantity(&self) -> u32 {
        self.quantity.saturating_sub(self.reserved_quantity)
    }

    /// 是否存放指定物料且有空闲库存
    pub fn has_free_stock_of(&self, material_code: u64) -> bool {
        self.material_code == Some(material_code) && self.free_quantity() > 0
    }
}

// ==========================================
// WarehouseShelf - 货架
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseShelf {
    pub id: u64,                   // 货架 ID
    pub line_id: u64,              // 所属巷道
    pub code: u32,                 // 巷道内架号
    pub cells: Vec<WarehouseCell>, // 库位（拓扑装载时填充）
}

impl WarehouseShelf {
    /// 库位只读视图
    pub fn cells(&self) -> &[WarehouseCell] {
        &self.cells
    }
}

// ==========================================
// WarehouseLine - 巷道
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseLine {
    pub id: u64,                     // 巷道 ID
    pub code: String,                // 巷道编码
    pub shelves: Vec<WarehouseShelf>, // 货架（拓扑装载时填充）
}

impl WarehouseLine {
    /// 货架只读视图
    pub fn shelves(&self) -> &[WarehouseShelf] {
        &self.shelves
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(material_code: Option<u64>, quantity: u32, reserved: u32) -> WarehouseCell {
        WarehouseCell {
            id: 1,
            shelf_id: 1,
            code: 1,
            public_id: "A-01-01".to_string(),
            material_code,
            quantity,
            reserved_quantity: reserved,
        }
    }

    #[test]
    fn test_free_quantity() {
        assert_eq!(cell(Some(1001), 10, 0).free_quantity(), 10);
        assert_eq!(cell(Some(1001), 10, 4).free_quantity(), 6);
        assert_eq!(cell(Some(1001), 10, 10).free_quantity(), 0);
    }

    #[test]
    fn test_has_free_stock_of() {
        assert!(cell(Some(1001), 10, 4).has_free_stock_of(1001));
        // 物料不匹配
        assert!(!cell(Some(1002), 10, 0).has_free_stock_of(1001));
        // 空位
        assert!(!cell(None, 0, 0).has_free_stock_of(1001));
        // 满预约
        assert!(!cell(Some(1001), 10, 10).has_free_stock_of(1001));
    }
}
