// ==========================================
// 仓储管理系统 - 物料主数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::material::Material;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult};
use std::sync::{Arc, Mutex};

// ==========================================
// MaterialRepository - 物料主数据仓储
// ==========================================
/// 职责: 管理 wms_material 表的数据访问
/// 物料不可变: 只有 insert / delete, 没有 update
pub struct MaterialRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MaterialRepository {
    /// 创建新的 MaterialRepository 实例
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

    /// 插入物料
    ///
    /// # 返回
    /// - Ok(()): 插入成功
    /// - Err(UniqueConstraintViolation): 编码已存在
    pub fn insert(&self, material: &Material) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO wms_material (material_code, description, created_at)
            VALUES (?1, ?2, ?3)
            "#,
            params![
                material.code,
                material.description,
                material.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// 按编码查询物料
    pub fn find_by_code(&self, code: u64) -> RepositoryResult<Option<Material>> {
        let conn = self.get_conn()?;
        let result = conn.query_row(
            r#"
            SELECT material_code, description, created_at
            FROM wms_material
            WHERE material_code = ?1
            "#,
            params![code],
            Self::map_row,
        );

        match result {
            Ok(material) => Ok(Some(material)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询全部物料（按编码排序）
    pub fn list_all(&self) -> RepositoryResult<Vec<Material>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT material_code, description, created_at
            FROM wms_material
            ORDER BY material_code
            "#,
        )?;

        let materials = stmt
            .query_map([], Self::map_row)?
            .collect::<SqliteResult<Vec<Material>>>()?;
        Ok(materials)
    }

    /// 批量检查编码是否已存在（导入跳过已有物料用）
    ///
    /// # 返回
    /// - Ok(Vec<u64>): 已存在的编码列表
    pub fn batch_check_exists(&self, codes: &[u64]) -> RepositoryResult<Vec<u64>> {
        if codes.is_empty() {
            return Ok(vec![]);
        }

        let conn = self.get_conn()?;
        let placeholders = codes.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let query = format!(
            "SELECT material_code FROM wms_material WHERE material_code IN ({})",
            placeholders
        );

        let mut stmt = conn.prepare(&query)?;
        let params: Vec<&dyn rusqlite::ToSql> =
            codes.iter().map(|c| c as &dyn rusqlite::ToSql).collect();

        let existing = stmt
            .query_map(params.as_slice(), |row| row.get::<_, u64>(0))?
            .collect::<SqliteResult<Vec<u64>>>()?;
        Ok(existing)
    }

    /// 物料是否仍被引用（订单行或库位）
    pub fn is_referenced(&self, code: u64) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let referenced: i64 = conn.query_row(
            r#"
            SELECT
                (SELECT COUNT(*) FROM wms_order_row WHERE material_code = ?1)
              + (SELECT COUNT(*) FROM wms_warehouse_cell WHERE material_code = ?1)
            "#,
            params![code],
            |row| row.get(0),
        )?;
        Ok(referenced > 0)
    }

    /// 删除物料
    ///
    /// # 返回
    /// - Ok(true): 删除成功
    /// - Ok(false): 编码不存在
    pub fn delete(&self, code: u64) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM wms_material WHERE material_code = ?1",
            params![code],
        )?;
        Ok(affected > 0)
    }

    /// 物料总数
    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM wms_material", [], |row| row.get(0))?;
        Ok(count)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Material> {
        Ok(Material {
            code: row.get(0)?,
            description: row.get(1)?,
            created_at: row
                .get::<_, String>(2)?
                .parse::<chrono::DateTime<chrono::Utc>>()
                .unwrap_or_else(|_| chrono::Utc::now()),
        })
    }
}
