// ==========================================
// 仓储管理系统 - 批次生成引擎
// ==========================================
// 红线: 不超预约 —— 任何时刻 reserved_quantity <= quantity
// ==========================================
// 职责: 从可分配订单生成拣货/收货批次
// 输入: 订单列表 + 库位工作副本 + 在途批次已覆盖的订单行
// 输出: 未持久化批次 + 跳过行清单 + 被触碰的库位
// ==========================================

use crate::domain::batch::{Batch, BatchRow};
use crate::domain::order::Order;
use crate::domain::types::OrderStatus;
use crate::domain::warehouse::WarehouseCell;
use std::collections::{BTreeSet, HashSet};
use tracing::instrument;

// ==========================================
// AllocationEngine - 批次生成引擎
// ==========================================
pub struct AllocationEngine {
    // 无状态引擎，不需要注入依赖
}

/// 生成结果（批次未落库, 供上层持久化）
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub batches: Vec<Batch>,        // 生成的批次, 行集已填充, id 待数据库赋号
    pub skipped_rows: Vec<SkippedRow>,
    pub touched_cell_ids: Vec<u64>, // 预约量被修改的库位（升序去重）
}

/// 被跳过的订单行及原因
#[derive(Debug, Clone)]
pub struct SkippedRow {
    pub order_id: u64,
    pub order_row_id: u64,
    pub material_code: u64,
    pub reason: String,
}

impl AllocationEngine {
    /// 构造函数
    pub fn new() -> Self {
        Self {}
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 生成批次
    ///
    /// 规则:
    /// 1) 候选订单: Waiting 且分配率为 0 且头数据齐全且至少一行
    /// 2) 已被在途批次覆盖的订单行不再参与
    /// 3) 按库位 ID 稳定顺序贪心填充, 单库位不足时跨库位拆分
    /// 4) 行级全有或全无: 凑不齐数量的行不产生任何批次行, 记跳过原因
    /// 5) 每批次最多 max_rows_per_batch 条批次行, 满员即开新批次
    ///
    /// # 参数
    /// - `orders`: 订单列表（引擎自行筛选候选）
    /// - `cells`: 库位工作副本（预约量会被就地修改）, 调用方保证按 ID 升序
    /// - `live_row_ids`: 在途批次已覆盖的订单行 ID
    /// - `max_rows_per_batch`: 单批次行数上限（配置层保证 >= 1）
    #[instrument(skip(self, orders, cells, live_row_ids), fields(
        orders_count = orders.len(),
        cells_count = cells.len(),
        max_rows_per_batch = max_rows_per_batch
    ))]
    pub fn generate(
        &self,
        orders: &[Order],
        cells: &mut [WarehouseCell],
        live_row_ids: &HashSet<u64>,
        max_rows_per_batch: usize,
    ) -> GenerationResult {
        let mut batches: Vec<Batch> = Vec::new();
        let mut skipped_rows: Vec<SkippedRow> = Vec::new();
        let mut touched: BTreeSet<u64> = BTreeSet::new();
        let mut current = Batch::new();

        for order in orders {
            if !Self::is_allocatable(order) {
                continue;
            }

            for row in order.rows() {
                // 在途批次已覆盖的行不重复生成
                if live_row_ids.contains(&row.id) {
                    continue;
                }

                // 行级全有或全无: 先验总可用量, 不足则整行跳过且不触碰库位
                let total_free: u64 = cells
                    .iter()
                    .filter(|c| c.has_free_stock_of(row.material.code))
                    .map(|c| c.free_quantity() as u64)
                    .sum();

                if total_free == 0 {
                    skipped_rows.push(SkippedRow {
                        order_id: order.id,
                        order_row_id: row.id,
                        material_code: row.material.code,
                        reason: format!("NO_STOCK: 物料 {} 无可用库存", row.material.code),
                    });
                    continue;
                }
                if total_free < row.quantity as u64 {
                    skipped_rows.push(SkippedRow {
                        order_id: order.id,
                        order_row_id: row.id,
                        material_code: row.material.code,
                        reason: format!(
                            "INSUFFICIENT_STOCK: 需求 {} 可用 {}",
                            row.quantity, total_free
                        ),
                    });
                    continue;
                }

                // 贪心填充: 按库位顺序取 min(剩余需求, 空闲量)
                let mut remaining = row.quantity;
                for cell in cells.iter_mut() {
                    if remaining == 0 {
                        break;
                    }
                    if !cell.has_free_stock_of(row.material.code) {
                        continue;
                    }

                    let take = remaining.min(cell.free_quantity());
                    cell.reserved_quantity += take;
                    touched.insert(cell.id);
                    remaining -= take;

                    // 满员即开新批次（同一行的拆分可以跨批次）
                    if current.row_count() >= max_rows_per_batch {
                        batches.push(std::mem::take(&mut current));
                    }
                    current.push_row(BatchRow {
                        id: 0,
                        batch_id: 0,
                        order_id: order.id,
                        order_row_id: row.id,
                        material_code: row.material.code,
                        quantity: take,
                        cell_id: cell.id,
                        cell_public_id: cell.public_id.clone(),
                    });
                }
            }
        }

        if current.row_count() > 0 {
            batches.push(current);
        }

        GenerationResult {
            batches,
            skipped_rows,
            touched_cell_ids: touched.into_iter().collect(),
        }
    }

    /// 订单是否参与批次生成
    ///
    /// 口径: Waiting + 分配率 0 + 头数据齐全 + 至少一行
    pub fn is_allocatable(order: &Order) -> bool {
        order.order_status == OrderStatus::Waiting
            && order.allocation_percentual <= 0.0
            && order.is_data_complete()
            && order.row_count() >= 1
    }
}

impl Default for AllocationEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::material::Material;
    use crate::domain::order::OrderRow;
    use crate::domain::types::{BatchStatus, OrderType, Priority};
    use chrono::Utc;

    // ==========================================
    // 测试辅助函数
    // ==========================================

    /// 创建测试用的库位
    fn create_test_cell(id: u64, public_id: &str, material: Option<u64>, qty: u32, reserved: u32) -> WarehouseCell {
        WarehouseCell {
            id,
            shelf_id: 1,
            code: id as u32,
            public_id: public_id.to_string(),
            material_code: material,
            quantity: qty,
            reserved_quantity: reserved,
        }
    }

    /// 创建测试用的订单（Waiting, 头数据齐全）
    fn create_test_order(order_id: u64, rows: &[(u64, u64, u32)]) -> Order {
        let mut order = Order::new(order_id, Some(Utc::now()), Priority::Medium, OrderType::Output);
        for (row_id, material_code, quantity) in rows {
            let mut row = OrderRow::new(
                order_id,
                Material::new(*material_code, format!("物料-{}", material_code)),
                *quantity,
            );
            row.id = *row_id;
            assert!(order.add_material(row), "测试订单行添加失败");
        }
        order
    }

    fn no_live_rows() -> HashSet<u64> {
        HashSet::new()
    }

    // ==========================================
    // 基本覆盖
    // ==========================================

    #[test]
    fn test_单行单库位_全量覆盖() {
        let engine = AllocationEngine::new();
        let orders = vec![create_test_order(1, &[(11, 101, 10)])];
        let mut cells = vec![create_test_cell(1, "A-01-01", Some(101), 50, 0)];

        let result = engine.generate(&orders, &mut cells, &no_live_rows(), 10);

        assert_eq!(result.batches.len(), 1);
        assert_eq!(result.skipped_rows.len(), 0);

        let batch = &result.batches[0];
        assert_eq!(batch.status, BatchStatus::Created);
        assert_eq!(batch.row_count(), 1);
        assert_eq!(batch.rows()[0].order_row_id, 11);
        assert_eq!(batch.rows()[0].quantity, 10);
        assert_eq!(batch.rows()[0].cell_public_id, "A-01-01");

        // 预约生效
        assert_eq!(cells[0].reserved_quantity, 10);
        assert_eq!(result.touched_cell_ids, vec![1]);
    }

    #[test]
    fn test_单库位不足_跨库位拆分() {
        let engine = AllocationEngine::new();
        let orders = vec![create_test_order(1, &[(11, 101, 30)])];
        let mut cells = vec![
            create_test_cell(1, "A-01-01", Some(101), 10, 0),
            create_test_cell(2, "A-01-02", Some(101), 25, 0),
        ];

        let result = engine.generate(&orders, &mut cells, &no_live_rows(), 10);

        assert_eq!(result.batches.len(), 1);
        let rows = result.batches[0].rows();
        assert_eq!(rows.len(), 2);
        // 稳定顺序: 先 1 号位取满, 再 2 号位补齐
        assert_eq!(rows[0].cell_id, 1);
        assert_eq!(rows[0].quantity, 10);
        assert_eq!(rows[1].cell_id, 2);
        assert_eq!(rows[1].quantity, 20);

        assert_eq!(cells[0].reserved_quantity, 10);
        assert_eq!(cells[1].reserved_quantity, 20);
        assert_eq!(result.touched_cell_ids, vec![1, 2]);
    }

    #[test]
    fn test_预约量计入空闲_只取未预约部分() {
        let engine = AllocationEngine::new();
        let orders = vec![create_test_order(1, &[(11, 101, 5)])];
        let mut cells = vec![create_test_cell(1, "A-01-01", Some(101), 10, 6)];

        let result = engine.generate(&orders, &mut cells, &no_live_rows(), 10);

        // 空闲 4 < 需求 5 → 整行跳过
        assert_eq!(result.batches.len(), 0);
        assert_eq!(result.skipped_rows.len(), 1);
        assert!(result.skipped_rows[0].reason.starts_with("INSUFFICIENT_STOCK"));
        // 库位未被触碰
        assert_eq!(cells[0].reserved_quantity, 6);
        assert!(result.touched_cell_ids.is_empty());
    }

    // ==========================================
    // 跳过原因
    // ==========================================

    #[test]
    fn test_无库存_记NO_STOCK并不触碰库位() {
        let engine = AllocationEngine::new();
        let orders = vec![create_test_order(1, &[(11, 999, 10)])];
        let mut cells = vec![create_test_cell(1, "A-01-01", Some(101), 50, 0)];

        let result = engine.generate(&orders, &mut cells, &no_live_rows(), 10);

        assert_eq!(result.batches.len(), 0);
        assert_eq!(result.skipped_rows.len(), 1);
        assert_eq!(result.skipped_rows[0].order_row_id, 11);
        assert_eq!(result.skipped_rows[0].material_code, 999);
        assert!(result.skipped_rows[0].reason.starts_with("NO_STOCK"));
        assert_eq!(cells[0].reserved_quantity, 0);
    }

    #[test]
    fn test_行级全有或全无_部分覆盖不产生批次行() {
        let engine = AllocationEngine::new();
        // 行需求 40, 两库位合计空闲 30
        let orders = vec![create_test_order(1, &[(11, 101, 40)])];
        let mut cells = vec![
            create_test_cell(1, "A-01-01", Some(101), 10, 0),
            create_test_cell(2, "A-01-02", Some(101), 20, 0),
        ];

        let result = engine.generate(&orders, &mut cells, &no_live_rows(), 10);

        assert_eq!(result.batches.len(), 0);
        assert_eq!(result.skipped_rows.len(), 1);
        assert!(result.skipped_rows[0]
            .reason
            .contains("需求 40 可用 30"));
        // 任何库位都不产生半截预约
        assert_eq!(cells[0].reserved_quantity, 0);
        assert_eq!(cells[1].reserved_quantity, 0);
    }

    #[test]
    fn test_同轮竞争_前行预约对后行可见() {
        let engine = AllocationEngine::new();
        // 两行同物料, 库位只够第一行
        let orders = vec![create_test_order(1, &[(11, 101, 8), (12, 101, 5)])];
        let mut cells = vec![create_test_cell(1, "A-01-01", Some(101), 10, 0)];

        let result = engine.generate(&orders, &mut cells, &no_live_rows(), 10);

        assert_eq!(result.batches.len(), 1);
        assert_eq!(result.batches[0].row_count(), 1);
        assert_eq!(result.batches[0].rows()[0].order_row_id, 11);

        assert_eq!(result.skipped_rows.len(), 1);
        assert_eq!(result.skipped_rows[0].order_row_id, 12);
        assert!(result.skipped_rows[0].reason.contains("可用 2"));
        assert_eq!(cells[0].reserved_quantity, 8);
    }

    // ==========================================
    // 候选筛选
    // ==========================================

    #[test]
    fn test_非候选订单被整体忽略() {
        let engine = AllocationEngine::new();

        // 已分配的订单（分配率 100）
        let mut allocated = create_test_order(1, &[(11, 101, 5)]);
        allocated.set_material_as_allocated(101);
        // 头数据不齐（无下达日期）
        let mut no_date = Order::new(2, None, Priority::Low, OrderType::Output);
        let mut row = OrderRow::new(2, Material::new(101, "物料-101"), 5);
        row.id = 21;
        assert!(no_date.add_material(row));
        // 零行订单
        let empty = Order::new(3, Some(Utc::now()), Priority::Low, OrderType::Output);

        let orders = vec![allocated, no_date, empty];
        let mut cells = vec![create_test_cell(1, "A-01-01", Some(101), 50, 0)];

        let result = engine.generate(&orders, &mut cells, &no_live_rows(), 10);

        assert!(result.batches.is_empty());
        assert!(result.skipped_rows.is_empty());
        assert_eq!(cells[0].reserved_quantity, 0);
    }

    #[test]
    fn test_在途批次覆盖的行被排除() {
        let engine = AllocationEngine::new();
        let orders = vec![create_test_order(1, &[(11, 101, 5), (12, 101, 3)])];
        let mut cells = vec![create_test_cell(1, "A-01-01", Some(101), 50, 0)];
        let live: HashSet<u64> = [11].into_iter().collect();

        let result = engine.generate(&orders, &mut cells, &live, 10);

        assert_eq!(result.batches.len(), 1);
        assert_eq!(result.batches[0].row_count(), 1);
        assert_eq!(result.batches[0].rows()[0].order_row_id, 12);
        assert_eq!(cells[0].reserved_quantity, 3);
    }

    #[test]
    fn test_入库订单同样预约收货容量() {
        let engine = AllocationEngine::new();
        let mut order = Order::new(1, Some(Utc::now()), Priority::Low, OrderType::Input);
        let mut row = OrderRow::new(1, Material::new(101, "物料-101"), 6);
        row.id = 11;
        assert!(order.add_material(row));
        let mut cells = vec![create_test_cell(1, "A-01-01", Some(101), 20, 0)];

        let result = engine.generate(&[order], &mut cells, &no_live_rows(), 10);

        // 入库与出库在生成阶段对称, 差异只体现在完成结算
        assert_eq!(result.batches.len(), 1);
        assert_eq!(cells[0].reserved_quantity, 6);
    }

    // ==========================================
    // 批次打包
    // ==========================================

    #[test]
    fn test_批次行数达到上限_滚动开新批次() {
        let engine = AllocationEngine::new();
        let orders = vec![create_test_order(
            1,
            &[(11, 101, 5), (12, 101, 5), (13, 101, 5)],
        )];
        let mut cells = vec![create_test_cell(1, "A-01-01", Some(101), 50, 0)];

        let result = engine.generate(&orders, &mut cells, &no_live_rows(), 2);

        assert_eq!(result.batches.len(), 2);
        assert_eq!(result.batches[0].row_count(), 2);
        assert_eq!(result.batches[1].row_count(), 1);
        assert_eq!(cells[0].reserved_quantity, 15);
    }

    #[test]
    fn test_多订单多物料_不超预约不变量() {
        let engine = AllocationEngine::new();
        let orders = vec![
            create_test_order(1, &[(11, 101, 12), (12, 102, 7)]),
            create_test_order(2, &[(21, 101, 8), (22, 103, 4)]),
        ];
        let mut cells = vec![
            create_test_cell(1, "A-01-01", Some(101), 15, 0),
            create_test_cell(2, "A-01-02", Some(101), 10, 2),
            create_test_cell(3, "A-02-01", Some(102), 7, 0),
            create_test_cell(4, "B-01-01", Some(103), 3, 0),
        ];

        let result = engine.generate(&orders, &mut cells, &no_live_rows(), 10);

        // 行 22 需求 4 > 可用 3, 其余全覆盖
        assert_eq!(result.skipped_rows.len(), 1);
        assert_eq!(result.skipped_rows[0].order_row_id, 22);

        // 不超预约: 每个库位 reserved <= quantity
        for cell in &cells {
            assert!(
                cell.reserved_quantity <= cell.quantity,
                "库位 {} 超预约: {}/{}",
                cell.public_id,
                cell.reserved_quantity,
                cell.quantity
            );
        }
        // 101: 12 + 8 = 20, 两库位空闲 15 + 8 = 23 → 预约后 15/15 + 7/10(含原2)
        assert_eq!(cells[0].reserved_quantity, 15);
        assert_eq!(cells[1].reserved_quantity, 7);
        assert_eq!(cells[2].reserved_quantity, 7);
        assert_eq!(cells[3].reserved_quantity, 0);
    }

    #[test]
    fn test_空订单列表_产出为空() {
        let engine = AllocationEngine::new();
        let mut cells = vec![create_test_cell(1, "A-01-01", Some(101), 50, 0)];

        let result = engine.generate(&[], &mut cells, &no_live_rows(), 10);

        assert!(result.batches.is_empty());
        assert!(result.skipped_rows.is_empty());
        assert!(result.touched_cell_ids.is_empty());
    }
}
