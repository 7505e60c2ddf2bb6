// ==========================================
// 仓储管理系统 - 批次领域模型
// ==========================================
// 职责: 批次状态机与批次行快照
// 规则: Created → Allocated → Completed 单向流转, 失败返回 false
// ==========================================

use crate::domain::types::BatchStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// BatchRow - 批次行
// ==========================================
// 冗余 material_code / cell_public_id: 打印投影只依赖批次本身, 不回查拓扑
// 对齐: wms_batch_row 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRow {
    pub id: u64,                // 批次行 ID（0 = 未持久化）
    pub batch_id: u64,          // 所属批次
    pub order_id: u64,          // 来源订单
    pub order_row_id: u64,      // 来源订单行
    pub material_code: u64,     // 物料编码（生成时快照）
    pub quantity: u32,          // 本行作业数量（行可跨库位拆分）
    pub cell_id: u64,           // 库位 ID
    pub cell_public_id: String, // 库位公示号（生成时快照, 即拣货位置）
}

// ==========================================
// Batch - 批次聚合
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: u64,                   // 批次 ID（0 = 未持久化, 数据库赋号）
    pub status: BatchStatus,       // 批次状态
    pub created_at: DateTime<Utc>, // 生成时间
    rows: Vec<BatchRow>,           // 批次行（聚合独占所有权）
}

impl Batch {
    /// 创建新批次（状态 Created, 无行）
    pub fn new() -> Self {
        Self {
            id: 0,
            status: BatchStatus::Created,
            created_at: Utc::now(),
            rows: Vec::new(),
        }
    }

    /// 从持久化数据重建批次（仓储层使用）
    pub fn from_parts(
        id: u64,
        status: BatchStatus,
        created_at: DateTime<Utc>,
        rows: Vec<BatchRow>,
    ) -> Self {
        Self {
            id,
            status,
            created_at,
            rows,
        }
    }

    /// 追加批次行（生成期使用）
    pub fn push_row(&mut self, row: BatchRow) {
        self.rows.push(row);
    }

    /// 批次行只读视图
    pub fn rows(&self) -> &[BatchRow] {
        &self.rows
    }

    /// 行数
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    // ==========================================
    // 状态流转
    // ==========================================

    /// 下达批次: Created → Allocated
    ///
    /// # 返回
    /// - `true`: 流转成功
    /// - `false`: 当前状态不是 Created, 不变更
    pub fn mark_as_allocated(&mut self) -> bool {
        if self.status != BatchStatus::Created {
            return false;
        }
        self.status = BatchStatus::Allocated;
        true
    }

    /// 完成批次: Allocated → Completed (不可由 Created 跳级)
    pub fn mark_as_completed(&mut self) -> bool {
        if self.status != BatchStatus::Allocated {
            return false;
        }
        self.status = BatchStatus::Completed;
        true
    }

    /// 是否在途（未完成批次钉住订单行与库位预约）
    pub fn is_live(&self) -> bool {
        self.status != BatchStatus::Completed
    }
}

impl Default for Batch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_row(order_row_id: u64) -> BatchRow {
        BatchRow {
            id: 0,
            batch_id: 0,
            order_id: 1,
            order_row_id,
            material_code: 1001,
            quantity: 5,
            cell_id: 1,
            cell_public_id: "A-01-01".to_string(),
        }
    }

    #[test]
    fn test_正常流转() {
        let mut batch = Batch::new();
        assert_eq!(batch.status, BatchStatus::Created);
        assert!(batch.is_live());

        assert!(batch.mark_as_allocated());
        assert_eq!(batch.status, BatchStatus::Allocated);
        assert!(batch.is_live());

        assert!(batch.mark_as_completed());
        assert_eq!(batch.status, BatchStatus::Completed);
        assert!(!batch.is_live());
    }

    #[test]
    fn test_不可跳级_Created直接完成失败() {
        let mut batch = Batch::new();
        assert!(!batch.mark_as_completed());
        assert_eq!(batch.status, BatchStatus::Created);
    }

    #[test]
    fn test_重复下达失败() {
        let mut batch = Batch::new();
        assert!(batch.mark_as_allocated());
        assert!(!batch.mark_as_allocated());
        assert_eq!(batch.status, BatchStatus::Allocated);
    }

    #[test]
    fn test_状态不回退() {
        let mut batch = Batch::new();
        batch.mark_as_allocated();
        batch.mark_as_completed();

        assert!(!batch.mark_as_allocated());
        assert!(!batch.mark_as_completed());
        assert_eq!(batch.status, BatchStatus::Completed);
    }

    #[test]
    fn test_行追加保持顺序() {
        let mut batch = Batch::new();
        batch.push_row(test_row(11));
        batch.push_row(test_row(12));
        batch.push_row(test_row(13));

        let ids: Vec<u64> = batch.rows().iter().map(|r| r.order_row_id).collect();
        assert_eq!(ids, vec![11, 12, 13]);
    }
}
