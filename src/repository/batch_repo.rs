// ==========================================
// 仓储管理系统 - 批次仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::batch::{Batch, BatchRow};
use crate::domain::types::BatchStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Result as SqliteResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// ==========================================
// BatchRepository - 批次仓储
// ==========================================
/// 职责: 管理 wms_batch / wms_batch_row 表的数据访问
/// 批次行为生成期快照, 落库后只随头表状态流转, 不做行级更新
pub struct BatchRepository {
    conn: Arc<Mutex<Connection>>,
}

impl BatchRepository {
    /// 创建新的 BatchRepository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入批次（头 + 全部行, 单事务）
    ///
    /// # 返回
    /// - Ok(batch_id): 数据库赋号后的批次 ID
    pub fn insert(&self, batch: &Batch) -> RepositoryResult<u64> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO wms_batch (batch_status, created_at) VALUES (?1, ?2)",
            params![batch.status.to_db_str(), batch.created_at.to_rfc3339()],
        )?;
        let batch_id = tx.last_insert_rowid() as u64;

        for row in batch.rows() {
            tx.execute(
                r#"
                INSERT INTO wms_batch_row (
                    batch_id, order_id, order_row_id, material_code,
                    quantity, cell_id, cell_public_id
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    batch_id,
                    row.order_id,
                    row.order_row_id,
                    row.material_code,
                    row.quantity,
                    row.cell_id,
                    row.cell_public_id,
                ],
            )?;
        }

        tx.commit()?;
        Ok(batch_id)
    }

    /// 更新批次状态
    ///
    /// # 返回
    /// - Ok(true): 更新成功
    /// - Ok(false): 批次不存在
    pub fn update_status(&self, batch_id: u64, status: BatchStatus) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE wms_batch SET batch_status = ?2 WHERE batch_id = ?1",
            params![batch_id, status.to_db_str()],
        )?;
        Ok(affected > 0)
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 按批次号查询（含行集, 按批次行 ID 排序）
    pub fn find_by_id(&self, batch_id: u64) -> RepositoryResult<Option<Batch>> {
        let conn = self.get_conn()?;

        let header = conn.query_row(
            "SELECT batch_id, batch_status, created_at FROM wms_batch WHERE batch_id = ?1",
            params![batch_id],
            Self::map_header,
        );

        let (id, status, created_at) = match header {
            Ok(h) => h,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let rows = {
            let mut stmt = conn.prepare(
                r#"
                SELECT batch_row_id, batch_id, order_id, order_row_id,
                       material_code, quantity, cell_id, cell_public_id
                FROM wms_batch_row
                WHERE batch_id = ?1
                ORDER BY batch_row_id
                "#,
            )?;
            let rows = stmt
                .query_map(params![batch_id], Self::map_batch_row)?
                .collect::<SqliteResult<Vec<BatchRow>>>()?;
            rows
        };

        Ok(Some(Batch::from_parts(id, status, created_at, rows)))
    }

    /// 查询全部批次（含行集, 按批次号排序）
    pub fn list_all(&self) -> RepositoryResult<Vec<Batch>> {
        let conn = self.get_conn()?;
        let headers = {
            let mut stmt = conn.prepare(
                "SELECT batch_id, batch_status, created_at FROM wms_batch ORDER BY batch_id",
            )?;
            let headers = stmt
                .query_map([], Self::map_header)?
                .collect::<SqliteResult<Vec<_>>>()?;
            headers
        };
        Self::attach_rows(&conn, headers)
    }

    /// 按状态查询批次（含行集, 按批次号排序）
    pub fn list_by_status(&self, status: BatchStatus) -> RepositoryResult<Vec<Batch>> {
        let conn = self.get_conn()?;
        let headers = {
            let mut stmt = conn.prepare(
                r#"
                SELECT batch_id, batch_status, created_at
                FROM wms_batch
                WHERE batch_status = ?1
                ORDER BY batch_id
                "#,
            )?;
            let headers = stmt
                .query_map(params![status.to_db_str()], Self::map_header)?
                .collect::<SqliteResult<Vec<_>>>()?;
            headers
        };
        Self::attach_rows(&conn, headers)
    }

    /// 在途批次覆盖的订单行 ID（去重）
    ///
    /// # 说明
    /// 在途 = 状态非 COMPLETED; 生成引擎据此排除已被覆盖的订单行
    pub fn list_live_order_row_ids(&self) -> RepositoryResult<Vec<u64>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT DISTINCT r.order_row_id
            FROM wms_batch_row r
            JOIN wms_batch b ON b.batch_id = r.batch_id
            WHERE b.batch_status != 'COMPLETED'
            ORDER BY r.order_row_id
            "#,
        )?;
        let ids = stmt
            .query_map([], |row| row.get::<_, u64>(0))?
            .collect::<SqliteResult<Vec<u64>>>()?;
        Ok(ids)
    }

    /// 是否存在引用该订单的批次（不论状态）
    pub fn batch_exists_for_order(&self, order_id: u64) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM wms_batch_row WHERE order_id = ?1",
            params![order_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// 按状态统计批次数（看板用）
    pub fn count_by_status(&self, status: BatchStatus) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM wms_batch WHERE batch_status = ?1",
            params![status.to_db_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 批次总数
    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM wms_batch", [], |row| row.get(0))?;
        Ok(count)
    }

    // ==========================================
    // 行映射辅助
    // ==========================================

    fn map_header(row: &rusqlite::Row<'_>) -> rusqlite::Result<(u64, BatchStatus, DateTime<Utc>)> {
        Ok((
            row.get(0)?,
            BatchStatus::from_str(&row.get::<_, String>(1)?),
            row.get::<_, String>(2)?
                .parse::<DateTime<Utc>>()
                .unwrap_or_else(|_| Utc::now()),
        ))
    }

    fn map_batch_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<BatchRow> {
        Ok(BatchRow {
            id: row.get(0)?,
            batch_id: row.get(1)?,
            order_id: row.get(2)?,
            order_row_id: row.get(3)?,
            material_code: row.get(4)?,
            quantity: row.get(5)?,
            cell_id: row.get(6)?,
            cell_public_id: row.get(7)?,
        })
    }

    /// 一次取出多个批次的全部行, 按 batch_id 分组后组装
    fn attach_rows(
        conn: &Connection,
        headers: Vec<(u64, BatchStatus, DateTime<Utc>)>,
    ) -> RepositoryResult<Vec<Batch>> {
        if headers.is_empty() {
            return Ok(vec![]);
        }

        let batch_ids: Vec<u64> = headers.iter().map(|(id, _, _)| *id).collect();
        let placeholders = batch_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let query = format!(
            r#"
            SELECT batch_row_id, batch_id, order_id, order_row_id,
                   material_code, quantity, cell_id, cell_public_id
            FROM wms_batch_row
            WHERE batch_id IN ({})
            ORDER BY batch_id, batch_row_id
            "#,
            placeholders
        );

        let mut stmt = conn.prepare(&query)?;
        let params: Vec<&dyn rusqlite::ToSql> =
            batch_ids.iter().map(|id| id as &dyn rusqlite::ToSql).collect();

        let rows = stmt
            .query_map(params.as_slice(), Self::map_batch_row)?
            .collect::<SqliteResult<Vec<BatchRow>>>()?;

        let mut grouped: HashMap<u64, Vec<BatchRow>> = HashMap::new();
        for row in rows {
            grouped.entry(row.batch_id).or_default().push(row);
        }

        Ok(headers
            .into_iter()
            .map(|(id, status, created_at)| {
                let rows = grouped.remove(&id).unwrap_or_default();
                Batch::from_parts(id, status, created_at, rows)
            })
            .collect())
    }
}
