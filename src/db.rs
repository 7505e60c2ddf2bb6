// ==========================================
// 仓储管理系统 - SQLite 连接与 schema 初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为，避免“部分模块外键开启/部分不开启”
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 建表语句集中于此, AppState / seed / tests 共用同一事实源
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 建立 schema v1（幂等, CREATE TABLE IF NOT EXISTS）
///
/// # 说明
/// - 行表对聚合父键 ON DELETE CASCADE
/// - `wms_order.order_id` 由应用层赋号, `wms_material.material_code` 为自然键,
///   其余聚合主键 AUTOINCREMENT
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS wms_material (
            material_code INTEGER PRIMARY KEY,
            description TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS wms_warehouse_line (
            line_id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS wms_warehouse_shelf (
            shelf_id INTEGER PRIMARY KEY AUTOINCREMENT,
            line_id INTEGER NOT NULL REFERENCES wms_warehouse_line(line_id) ON DELETE CASCADE,
            code INTEGER NOT NULL,
            UNIQUE(line_id, code)
        );

        CREATE TABLE IF NOT EXISTS wms_warehouse_cell (
            cell_id INTEGER PRIMARY KEY AUTOINCREMENT,
            shelf_id INTEGER NOT NULL REFERENCES wms_warehouse_shelf(shelf_id) ON DELETE CASCADE,
            code INTEGER NOT NULL,
            public_id TEXT NOT NULL UNIQUE,
            material_code INTEGER REFERENCES wms_material(material_code),
            quantity INTEGER NOT NULL DEFAULT 0,
            reserved_quantity INTEGER NOT NULL DEFAULT 0,
            UNIQUE(shelf_id, code),
            CHECK (reserved_quantity >= 0 AND reserved_quantity <= quantity)
        );

        CREATE TABLE IF NOT EXISTS wms_order (
            order_id INTEGER PRIMARY KEY,
            order_type TEXT NOT NULL,
            order_status TEXT NOT NULL DEFAULT 'WAITING',
            priority TEXT NOT NULL DEFAULT 'LOW',
            emission_date TEXT,
            done_date TEXT,
            allocation_percentual REAL NOT NULL DEFAULT 0.0,
            complete_percentual REAL NOT NULL DEFAULT 0.0
        );

        CREATE TABLE IF NOT EXISTS wms_order_row (
            row_id INTEGER PRIMARY KEY AUTOINCREMENT,
            order_id INTEGER NOT NULL REFERENCES wms_order(order_id) ON DELETE CASCADE,
            material_code INTEGER NOT NULL REFERENCES wms_material(material_code),
            quantity INTEGER NOT NULL,
            allocated INTEGER NOT NULL DEFAULT 0,
            completed INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS wms_batch (
            batch_id INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_status TEXT NOT NULL DEFAULT 'CREATED',
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS wms_batch_row (
            batch_row_id INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_id INTEGER NOT NULL REFERENCES wms_batch(batch_id) ON DELETE CASCADE,
            order_id INTEGER NOT NULL,
            order_row_id INTEGER NOT NULL REFERENCES wms_order_row(row_id),
            material_code INTEGER NOT NULL,
            quantity INTEGER NOT NULL,
            cell_id INTEGER NOT NULL REFERENCES wms_warehouse_cell(cell_id),
            cell_public_id TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS action_log (
            action_id TEXT PRIMARY KEY,
            action_type TEXT NOT NULL,
            action_ts TEXT NOT NULL,
            actor TEXT NOT NULL,
            entity_type TEXT,
            entity_id TEXT,
            payload_json TEXT,
            detail TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_action_log_ts ON action_log(action_ts DESC);
        CREATE INDEX IF NOT EXISTS idx_action_log_type ON action_log(action_type);

        CREATE TABLE IF NOT EXISTS config_scope (
            scope_id TEXT PRIMARY KEY,
            scope_type TEXT NOT NULL,
            scope_key TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(scope_type, scope_key)
        );

        INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
        VALUES ('global', 'GLOBAL', 'global');

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}
