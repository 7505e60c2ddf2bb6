use crate::db::open_sqlite_connection;
use crate::domain::material::Material;
use crate::domain::order::{Order, OrderRow};
use crate::domain::types::{OrderStatus, OrderType, Priority};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

// ==========================================
// OrderRepository - 订单仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
pub struct OrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OrderRepository {
    /// 创建新的 OrderRepository 实例
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
    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 保存订单（头表 UPSERT + 行差异同步, 单事务）
    ///
    /// # 说明
    /// - 头表用 ON CONFLICT DO UPDATE 而非 INSERT OR REPLACE:
    ///   REPLACE 会先删父行, 级联清空全部订单行
    /// - 行集同步: 库中有而入参无 → 删除; row_id = 0 → 新增;
    ///   其余按 row_id 更新, 保留存活行的 row_id
    pub fn save(&self, order: &Order) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            r#"
            INSERT INTO wms_order (
                order_id, order_type, order_status, priority,
                emission_date, done_date, allocation_percentual, complete_percentual
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(order_id) DO UPDATE SET
                order_type = ?2,
                order_status = ?3,
                priority = ?4,
                emission_date = ?5,
                done_date = ?6,
                allocation_percentual = ?7,
                complete_percentual = ?8
            "#,
            params![
                order.id,
                order.order_type.to_db_str(),
                order.order_status.to_db_str(),
                order.priority.to_db_str(),
                order.emission_date.map(|dt| dt.to_rfc3339()),
                order.done_date.map(|dt| dt.to_rfc3339()),
                order.allocation_percentual as f64,
                order.complete_percentual as f64,
            ],
        )?;

        // 行差异同步
        let existing_ids: HashSet<u64> = {
            let mut stmt =
                tx.prepare("SELECT row_id FROM wms_order_row WHERE order_id = ?1")?;
            let ids = stmt
                .query_map(params![order.id], |row| row.get::<_, u64>(0))?
                .collect::<SqliteResult<HashSet<u64>>>()?;
            ids
        };

        let incoming_ids: HashSet<u64> =
            order.rows().iter().map(|r| r.id).filter(|id| *id != 0).collect();

        for stale_id in existing_ids.difference(&incoming_ids) {
            tx.execute(
                "DELETE FROM wms_order_row WHERE row_id = ?1",
                params![stale_id],
            )?;
        }

        for row in order.rows() {
            if row.id != 0 && existing_ids.contains(&row.id) {
                tx.execute(
                    r#"
                    UPDATE wms_order_row
                    SET material_code = ?2, quantity = ?3, allocated = ?4, completed = ?5
                    WHERE row_id = ?1
                    "#,
                    params![
                        row.id,
                        row.material.code,
                        row.quantity,
                        row.allocated,
                        row.completed
                    ],
                )?;
            } else {
                tx.execute(
                    r#"
                    INSERT INTO wms_order_row (order_id, material_code, quantity, allocated, completed)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                    params![
                        order.id,
                        row.material.code,
                        row.quantity,
                        row.allocated,
                        row.completed
                    ],
                )?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// 删除订单（行表级联删除）
    ///
    /// # 返回
    /// - Ok(true): 删除成功
    /// - Ok(false): 订单不存在
    pub fn delete(&self, order_id: u64) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM wms_order WHERE order_id = ?1",
            params![order_id],
        )?;
        Ok(affected > 0)
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 按订单号查询订单（含行集）
    pub fn find_by_id(&self, order_id: u64) -> RepositoryResult<Option<Order>> {
        let conn = self.get_conn()?;

        let header = conn.query_row(
            r#"
            SELECT order_id, order_type, order_status, priority, emission_date, done_date
            FROM wms_order
            WHERE order_id = ?1
            "#,
            params![order_id],
            Self::map_header_row,
        );

        let header = match header {
            Ok(h) => h,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let rows = Self::load_rows(&conn, order_id)?;
        Ok(Some(Self::assemble(header, rows)))
    }

    /// 订单是否存在
    pub fn exists(&self, order_id: u64) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM wms_order WHERE order_id = ?1",
            params![order_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // ==========================================
    // 行映射辅助
    // ==========================================

    /// 订单头中间结构（行集另行装载）
    pub(super) fn map_header_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<OrderHeader> {
        Ok(OrderHeader {
            id: row.get(0)?,
            order_type: OrderType::from_str(&row.get::<_, String>(1)?)
                .unwrap_or(OrderType::Output),
            order_status: OrderStatus::from_str(&row.get::<_, String>(2)?),
            priority: Priority::from_str(&row.get::<_, String>(3)?),
            emission_date: row
                .get::<_, Option<String>>(4)?
                .and_then(|s| chrono::DateTime::parse_from_rfc3339(&s).ok())
                .map(|dt| dt.with_timezone(&chrono::Utc)),
            done_date: row
                .get::<_, Option<String>>(5)?
                .and_then(|s| chrono::DateTime::parse_from_rfc3339(&s).ok())
                .map(|dt| dt.with_timezone(&chrono::Utc)),
        })
    }

    /// 装载订单行（JOIN 物料描述, 按 row_id 排序）
    pub(super) fn load_rows(
        conn: &Connection,
        order_id: u64,
    ) -> RepositoryResult<Vec<OrderRow>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT r.row_id, r.order_id, r.material_code, m.description, m.created_at,
                   r.quantity, r.allocated, r.completed
            FROM wms_order_row r
            JOIN wms_material m ON m.material_code = r.material_code
            WHERE r.order_id = ?1
            ORDER BY r.row_id
            "#,
        )?;

        let rows = stmt
            .query_map(params![order_id], |row| {
                Ok(OrderRow {
                    id: row.get(0)?,
                    order_id: row.get(1)?,
                    material: Material {
                        code: row.get(2)?,
                        description: row.get(3)?,
                        created_at: row
                            .get::<_, String>(4)?
                            .parse::<chrono::DateTime<chrono::Utc>>()
                            .unwrap_or_else(|_| chrono::Utc::now()),
                    },
                    quantity: row.get(5)?,
                    allocated: row.get(6)?,
                    completed: row.get(7)?,
                })
            })?
            .collect::<SqliteResult<Vec<OrderRow>>>()?;
        Ok(rows)
    }

    /// 头 + 行 组装订单（派生值由 from_parts 急算）
    pub(super) fn assemble(header: OrderHeader, rows: Vec<OrderRow>) -> Order {
        Order::from_parts(
            header.id,
            header.emission_date,
            header.priority,
            header.order_type,
            header.order_status,
            header.done_date,
            rows,
        )
    }
}

/// 订单头中间结构
pub(super) struct OrderHeader {
    pub id: u64,
    pub order_type: OrderType,
    pub order_status: OrderStatus,
    pub priority: Priority,
    pub emission_date: Option<chrono::DateTime<chrono::Utc>>,
    pub done_date: Option<chrono::DateTime<chrono::Utc>>,
}
