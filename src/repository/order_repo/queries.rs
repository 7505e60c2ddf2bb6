use crate::domain::material::Material;
use crate::domain::order::{Order, OrderRow};
use crate::domain::types::OrderStatus;
use crate::repository::error::RepositoryResult;
use rusqlite::{params, Connection, Result as SqliteResult};
use std::collections::HashMap;

use super::core::{OrderHeader, OrderRepository};

// ==========================================
// 订单列表查询
// ==========================================
// 行集批量装载: 先取头, 再按 IN 一次取全行, 内存分组

impl OrderRepository {
    /// 查询全部订单（含行集, 按订单号排序）
    pub fn list_all(&self) -> RepositoryResult<Vec<Order>> {
        let conn = self.get_conn()?;
        let headers = {
            let mut stmt = conn.prepare(
                r#"
                SELECT order_id, order_type, order_status, priority, emission_date, done_date
                FROM wms_order
                ORDER BY order_id
                "#,
            )?;
            let headers = stmt
                .query_map([], Self::map_header_row)?
                .collect::<SqliteResult<Vec<OrderHeader>>>()?;
            headers
        };
        Self::attach_rows(&conn, headers)
    }

    /// 按状态查询订单（含行集, 按订单号排序）
    pub fn list_by_status(&self, status: OrderStatus) -> RepositoryResult<Vec<Order>> {
        let conn = self.get_conn()?;
        let headers = {
            let mut stmt = conn.prepare(
                r#"
                SELECT order_id, order_type, order_status, priority, emission_date, done_date
                FROM wms_order
                WHERE order_status = ?1
                ORDER BY order_id
                "#,
            )?;
            let headers = stmt
                .query_map(params![status.to_db_str()], Self::map_header_row)?
                .collect::<SqliteResult<Vec<OrderHeader>>>()?;
            headers
        };
        Self::attach_rows(&conn, headers)
    }

    /// 按状态统计订单数（看板用）
    pub fn count_by_status(&self, status: OrderStatus) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM wms_order WHERE order_status = ?1",
            params![status.to_db_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 订单总数
    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM wms_order", [], |row| row.get(0))?;
        Ok(count)
    }

    // ==========================================
    // 行集批量装载
    // ==========================================

    fn attach_rows(
        conn: &Connection,
        headers: Vec<OrderHeader>,
    ) -> RepositoryResult<Vec<Order>> {
        if headers.is_empty() {
            return Ok(vec![]);
        }

        let order_ids: Vec<u64> = headers.iter().map(|h| h.id).collect();
        let mut grouped = Self::load_rows_grouped(conn, &order_ids)?;

        Ok(headers
            .into_iter()
            .map(|h| {
                let rows = grouped.remove(&h.id).unwrap_or_default();
                Self::assemble(h, rows)
            })
            .collect())
    }

    /// 一次取出多个订单的全部行, 按 order_id 分组
    fn load_rows_grouped(
        conn: &Connection,
        order_ids: &[u64],
    ) -> RepositoryResult<HashMap<u64, Vec<OrderRow>>> {
        let placeholders = order_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let query = format!(
            r#"
            SELECT r.row_id, r.order_id, r.material_code, m.description, m.created_at,
                   r.quantity, r.allocated, r.completed
            FROM wms_order_row r
            JOIN wms_material m ON m.material_code = r.material_code
            WHERE r.order_id IN ({})
            ORDER BY r.order_id, r.row_id
            "#,
            placeholders
        );

        let mut stmt = conn.prepare(&query)?;
        let params: Vec<&dyn rusqlite::ToSql> =
            order_ids.iter().map(|id| id as &dyn rusqlite::ToSql).collect();

        let rows = stmt
            .query_map(params.as_slice(), |row| {
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

        let mut grouped: HashMap<u64, Vec<OrderRow>> = HashMap::new();
        for row in rows {
            grouped.entry(row.order_id).or_default().push(row);
        }
        Ok(grouped)
    }
}
