// ==========================================
// 仓储管理系统 - 批次打印投影引擎
// ==========================================
// 职责: 批次 → 打印行投影 + CSV 导出
// 约束: 投影是批次自身的纯函数, 不回查订单/拓扑
// ==========================================

use crate::domain::batch::Batch;
use csv::Writer;
use serde::Serialize;
use std::error::Error;
use std::fs::File;
use std::path::Path;

// CSV 表头（单据列名, 与打印纸质单一致）
pub const PRINT_HEADER: &[&str] = &[
    "Batch id",
    "Order id",
    "Order row",
    "Material",
    "Quantity",
    "Pickup position",
];

// ==========================================
// BatchPrintEngine - 打印投影引擎
// ==========================================
pub struct BatchPrintEngine {
    // 无状态引擎，不需要注入依赖
}

/// 打印行（单据上的一行）
#[derive(Debug, Clone, Serialize)]
pub struct BatchPrintRow {
    pub batch_id: u64,
    pub order_id: u64,
    pub order_row_id: u64,
    pub material_code: u64,
    pub quantity: u32,
    pub cell_public_id: String,
}

impl BatchPrintEngine {
    /// 构造函数
    pub fn new() -> Self {
        Self {}
    }

    /// 批次投影为打印行（保持批次行顺序, N 行批次恰好 N 条）
    pub fn project(&self, batch: &Batch) -> Vec<BatchPrintRow> {
        batch
            .rows()
            .iter()
            .map(|row| BatchPrintRow {
                batch_id: batch.id,
                order_id: row.order_id,
                order_row_id: row.order_row_id,
                material_code: row.material_code,
                quantity: row.quantity,
                cell_public_id: row.cell_public_id.clone(),
            })
            .collect()
    }

    /// 批次投影为 CSV 字符串（空批次仍产出表头）
    pub fn to_csv_string(&self, batch: &Batch) -> Result<String, Box<dyn Error>> {
        let mut wtr = Writer::from_writer(vec![]);
        self.write_rows(&mut wtr, batch)?;
        let bytes = wtr.into_inner()?;
        Ok(String::from_utf8(bytes)?)
    }

    /// 批次导出为 CSV 文件
    pub fn export_csv(&self, batch: &Batch, path: &Path) -> Result<(), Box<dyn Error>> {
        let file = File::create(path)?;
        let mut wtr = Writer::from_writer(file);
        self.write_rows(&mut wtr, batch)?;
        Ok(())
    }

    fn write_rows<W: std::io::Write>(
        &self,
        wtr: &mut Writer<W>,
        batch: &Batch,
    ) -> Result<(), Box<dyn Error>> {
        wtr.write_record(PRINT_HEADER)?;
        for row in self.project(batch) {
            wtr.write_record([
                row.batch_id.to_string(),
                row.order_id.to_string(),
                row.order_row_id.to_string(),
                row.material_code.to_string(),
                row.quantity.to_string(),
                row.cell_public_id,
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl Default for BatchPrintEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::batch::BatchRow;
    use crate::domain::types::BatchStatus;
    use chrono::Utc;

    fn make_batch(id: u64, rows: &[(u64, u64, u32, &str)]) -> Batch {
        let mut batch = Batch::from_parts(id, BatchStatus::Created, Utc::now(), vec![]);
        for (i, (order_row_id, material_code, quantity, cell_public_id)) in rows.iter().enumerate()
        {
            batch.push_row(BatchRow {
                id: i as u64 + 1,
                batch_id: id,
                order_id: 9001,
                order_row_id: *order_row_id,
                material_code: *material_code,
                quantity: *quantity,
                cell_id: i as u64 + 1,
                cell_public_id: cell_public_id.to_string(),
            });
        }
        batch
    }

    #[test]
    fn test_投影保持行顺序且字段齐全() {
        let engine = BatchPrintEngine::new();
        let batch = make_batch(7, &[(11, 101, 10, "A-01-01"), (12, 102, 5, "A-02-01")]);

        let rows = engine.project(&batch);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].batch_id, 7);
        assert_eq!(rows[0].order_id, 9001);
        assert_eq!(rows[0].order_row_id, 11);
        assert_eq!(rows[0].material_code, 101);
        assert_eq!(rows[0].quantity, 10);
        assert_eq!(rows[0].cell_public_id, "A-01-01");
        assert_eq!(rows[1].order_row_id, 12);
    }

    #[test]
    fn test_空批次_投影为空() {
        let engine = BatchPrintEngine::new();
        let batch = make_batch(7, &[]);
        assert!(engine.project(&batch).is_empty());
    }

    #[test]
    fn test_CSV_表头加N行() {
        let engine = BatchPrintEngine::new();
        let batch = make_batch(7, &[(11, 101, 10, "A-01-01"), (12, 102, 5, "A-02-01")]);

        let csv = engine.to_csv_string(&batch).expect("CSV 生成失败");
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "Batch id,Order id,Order row,Material,Quantity,Pickup position"
        );
        assert_eq!(lines[1], "7,9001,11,101,10,A-01-01");
        assert_eq!(lines[2], "7,9001,12,102,5,A-02-01");
    }

    #[test]
    fn test_空批次CSV_仍有表头() {
        let engine = BatchPrintEngine::new();
        let batch = make_batch(7, &[]);

        let csv = engine.to_csv_string(&batch).expect("CSV 生成失败");
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("Batch id,"));
    }

    #[test]
    fn test_导出CSV文件() {
        let engine = BatchPrintEngine::new();
        let batch = make_batch(7, &[(11, 101, 10, "A-01-01")]);

        let dir = tempfile::tempdir().expect("无法创建临时目录");
        let path = dir.path().join("batch-7.csv");
        engine.export_csv(&batch, &path).expect("导出失败");

        let content = std::fs::read_to_string(&path).expect("读取导出文件失败");
        assert!(content.starts_with("Batch id,"));
        assert!(content.contains("7,9001,11,101,10,A-01-01"));
    }
}
