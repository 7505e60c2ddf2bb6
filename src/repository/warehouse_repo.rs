// ==========================================
// 仓储管理系统 - 库区拓扑与库存仓储
// ==========================================
// 拓扑三级表: wms_warehouse_line / shelf / cell, 级联删除
// 库存不变量由 CHECK 约束兜底: 0 <= reserved_quantity <= quantity
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::warehouse::{WarehouseCell, WarehouseLine, WarehouseShelf};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult};
use serde::Serialize;
use std::sync::{Arc, Mutex};

// ==========================================
// WarehouseRepository - 库区仓储
// ==========================================
pub struct WarehouseRepository {
    conn: Arc<Mutex<Connection>>,
}

impl WarehouseRepository {
    /// 创建新的 WarehouseRepository 实例
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
    // 拓扑写入
    // ==========================================

    /// 新建巷道
    ///
    /// # 返回
    /// - Ok(line_id): 数据库赋号后的巷道 ID
    /// - Err(UniqueConstraintViolation): 巷道编码已存在
    pub fn insert_line(&self, code: &str) -> RepositoryResult<u64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO wms_warehouse_line (code) VALUES (?1)",
            params![code],
        )?;
        Ok(conn.last_insert_rowid() as u64)
    }

    /// 新建货架
    pub fn insert_shelf(&self, line_id: u64, code: u32) -> RepositoryResult<u64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO wms_warehouse_shelf (line_id, code) VALUES (?1, ?2)",
            params![line_id, code],
        )?;
        Ok(conn.last_insert_rowid() as u64)
    }

    /// 新建库位（id 字段由数据库赋号, 入参中的 id 被忽略）
    pub fn insert_cell(&self, cell: &WarehouseCell) -> RepositoryResult<u64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO wms_warehouse_cell (
                shelf_id, code, public_id, material_code, quantity, reserved_quantity
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                cell.shelf_id,
                cell.code,
                cell.public_id,
                cell.material_code,
                cell.quantity,
                cell.reserved_quantity,
            ],
        )?;
        Ok(conn.last_insert_rowid() as u64)
    }

    /// 删除巷道（货架与库位级联清空）
    ///
    /// # 返回
    /// - Ok(true): 删除成功
    /// - Ok(false): 巷道不存在
    pub fn delete_line(&self, line_id: u64) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM wms_warehouse_line WHERE line_id = ?1",
            params![line_id],
        )?;
        Ok(affected > 0)
    }

    // ==========================================
    // 库存写入
    // ==========================================

    /// 更新库位库存（数量 + 预约量, 单语句）
    ///
    /// # 说明
    /// 预约量超过数量时被 CHECK 约束拒绝, 上抛查询错误
    pub fn update_cell_stock(
        &self,
        cell_id: u64,
        quantity: u32,
        reserved_quantity: u32,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE wms_warehouse_cell
            SET quantity = ?2, reserved_quantity = ?3
            WHERE cell_id = ?1
            "#,
            params![cell_id, quantity, reserved_quantity],
        )?;
        Ok(affected > 0)
    }

    /// 设置库位存放的物料（空位上架 / 清空库位用）
    pub fn update_cell_material(
        &self,
        cell_id: u64,
        material_code: Option<u64>,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE wms_warehouse_cell SET material_code = ?2 WHERE cell_id = ?1",
            params![cell_id, material_code],
        )?;
        Ok(affected > 0)
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 按 ID 查询库位
    pub fn get_cell(&self, cell_id: u64) -> RepositoryResult<Option<WarehouseCell>> {
        let conn = self.get_conn()?;
        let result = conn.query_row(
            r#"
            SELECT cell_id, shelf_id, code, public_id, material_code, quantity, reserved_quantity
            FROM wms_warehouse_cell
            WHERE cell_id = ?1
            "#,
            params![cell_id],
            Self::map_cell,
        );

        match result {
            Ok(cell) => Ok(Some(cell)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询存放指定物料的库位（按库位 ID 稳定排序）
    ///
    /// # 说明
    /// 批次生成引擎按此顺序扫描, 保证同样的库存产出同样的批次
    pub fn list_cells_by_material(
        &self,
        material_code: u64,
    ) -> RepositoryResult<Vec<WarehouseCell>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT cell_id, shelf_id, code, public_id, material_code, quantity, reserved_quantity
            FROM wms_warehouse_cell
            WHERE material_code = ?1
            ORDER BY cell_id
            "#,
        )?;
        let cells = stmt
            .query_map(params![material_code], Self::map_cell)?
            .collect::<SqliteResult<Vec<WarehouseCell>>>()?;
        Ok(cells)
    }

    /// 查询全部库位（按库位 ID 排序）
    pub fn list_all_cells(&self) -> RepositoryResult<Vec<WarehouseCell>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT cell_id, shelf_id, code, public_id, material_code, quantity, reserved_quantity
            FROM wms_warehouse_cell
            ORDER BY cell_id
            "#,
        )?;
        let cells = stmt
            .query_map([], Self::map_cell)?
            .collect::<SqliteResult<Vec<WarehouseCell>>>()?;
        Ok(cells)
    }

    /// 装载完整拓扑: 巷道 → 货架 → 库位 三级嵌套
    pub fn get_topology(&self) -> RepositoryResult<Vec<WarehouseLine>> {
        let conn = self.get_conn()?;

        let mut lines = {
            let mut stmt =
                conn.prepare("SELECT line_id, code FROM wms_warehouse_line ORDER BY line_id")?;
            let lines = stmt
                .query_map([], |row| {
                    Ok(WarehouseLine {
                        id: row.get(0)?,
                        code: row.get(1)?,
                        shelves: Vec::new(),
                    })
                })?
                .collect::<SqliteResult<Vec<WarehouseLine>>>()?;
            lines
        };

        let shelves = {
            let mut stmt = conn.prepare(
                "SELECT shelf_id, line_id, code FROM wms_warehouse_shelf ORDER BY shelf_id",
            )?;
            let shelves = stmt
                .query_map([], |row| {
                    Ok(WarehouseShelf {
                        id: row.get(0)?,
                        line_id: row.get(1)?,
                        code: row.get(2)?,
                        cells: Vec::new(),
                    })
                })?
                .collect::<SqliteResult<Vec<WarehouseShelf>>>()?;
            shelves
        };

        let cells = {
            let mut stmt = conn.prepare(
                r#"
                SELECT cell_id, shelf_id, code, public_id, material_code, quantity, reserved_quantity
                FROM wms_warehouse_cell
                ORDER BY cell_id
                "#,
            )?;
            let cells = stmt
                .query_map([], Self::map_cell)?
                .collect::<SqliteResult<Vec<WarehouseCell>>>()?;
            cells
        };

        // 内存两级分组: cell 挂 shelf, shelf 挂 line
        let mut shelves_by_line: std::collections::HashMap<u64, Vec<WarehouseShelf>> =
            std::collections::HashMap::new();
        let mut cells_by_shelf: std::collections::HashMap<u64, Vec<WarehouseCell>> =
            std::collections::HashMap::new();

        for cell in cells {
            cells_by_shelf.entry(cell.shelf_id).or_default().push(cell);
        }
        for mut shelf in shelves {
            shelf.cells = cells_by_shelf.remove(&shelf.id).unwrap_or_default();
            shelves_by_line.entry(shelf.line_id).or_default().push(shelf);
        }
        for line in &mut lines {
            line.shelves = shelves_by_line.remove(&line.id).unwrap_or_default();
        }

        Ok(lines)
    }

    /// 巷道内是否存在带预约的库位（删除巷道前的防线）
    pub fn line_has_reservations(&self, line_id: u64) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            r#"
            SELECT COUNT(*)
            FROM wms_warehouse_cell c
            JOIN wms_warehouse_shelf s ON s.shelf_id = c.shelf_id
            WHERE s.line_id = ?1 AND c.reserved_quantity > 0
            "#,
            params![line_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// 分物料库存汇总（看板用）
    pub fn stock_summary(&self) -> RepositoryResult<Vec<MaterialStockSummary>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT c.material_code, m.description,
                   SUM(c.quantity), SUM(c.reserved_quantity), COUNT(*)
            FROM wms_warehouse_cell c
            JOIN wms_material m ON m.material_code = c.material_code
            WHERE c.material_code IS NOT NULL
            GROUP BY c.material_code
            ORDER BY c.material_code
            "#,
        )?;
        let summary = stmt
            .query_map([], |row| {
                Ok(MaterialStockSummary {
                    material_code: row.get(0)?,
                    description: row.get(1)?,
                    total_quantity: row.get(2)?,
                    total_reserved: row.get(3)?,
                    cell_count: row.get(4)?,
                })
            })?
            .collect::<SqliteResult<Vec<MaterialStockSummary>>>()?;
        Ok(summary)
    }

    fn map_cell(row: &rusqlite::Row<'_>) -> rusqlite::Result<WarehouseCell> {
        Ok(WarehouseCell {
            id: row.get(0)?,
            shelf_id: row.get(1)?,
            code: row.get(2)?,
            public_id: row.get(3)?,
            material_code: row.get(4)?,
            quantity: row.get(5)?,
            reserved_quantity: row.get(6)?,
        })
    }
}

// ==========================================
// 汇总 DTO
// ==========================================

/// 分物料库存汇总行
#[derive(Debug, Clone, Serialize)]
pub struct MaterialStockSummary {
    pub material_code: u64,
    pub description: String,
    pub total_quantity: i64,
    pub total_reserved: i64,
    pub cell_count: i64,
}
