// ==========================================
// 仓储管理系统 - 配置管理器
// ==========================================
// 职责: 配置读取、写入、类型化解析
// 存储: config_kv 表 (scope_id + key + value), 当前统一使用 global 作用域
// ==========================================

use crate::db::open_sqlite_connection;
use rusqlite::{params, Connection};
use std::error::Error;
use std::sync::{Arc, Mutex};

/// 批次行数上限默认值
pub const DEFAULT_BATCH_MAX_ROWS: usize = 10;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 参数
    /// - key: 配置键
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 写入配置值（scope_id='global'，已存在则覆盖）
    ///
    /// # 参数
    /// - key: 配置键
    /// - value: 配置值
    pub fn set_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        // 使用UPSERT语法（SQLite 3.24.0+）
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;

        Ok(())
    }

    /// 读取配置值，带默认值
    ///
    /// # 参数
    /// - key: 配置键
    /// - default: 默认值
    fn get_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 读取整数配置，缺失或解析失败时回落默认值
    pub fn get_i64_or(&self, key: &str, default: i64) -> Result<i64, Box<dyn Error>> {
        let value = self.get_or_default(key, &default.to_string())?;
        Ok(value.parse::<i64>().unwrap_or(default))
    }

    /// 获取单个批次允许的最大行数
    ///
    /// # 返回
    /// - usize: 最大行数（默认 10）
    ///
    /// # 说明
    /// 合法区间 1..=500；配置值非数字或越界时回落默认值并记录告警。
    pub fn get_batch_max_rows(&self) -> Result<usize, Box<dyn Error>> {
        let raw = self.get_or_default(config_keys::BATCH_MAX_ROWS_PER_BATCH, "10")?;

        match raw.parse::<usize>() {
            Ok(n) if (1..=500).contains(&n) => Ok(n),
            _ => {
                tracing::warn!(
                    config_key = config_keys::BATCH_MAX_ROWS_PER_BATCH,
                    raw_value = %raw,
                    "批次行数上限配置非法，回落默认值"
                );
                Ok(DEFAULT_BATCH_MAX_ROWS)
            }
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 批次生成
    pub const BATCH_MAX_ROWS_PER_BATCH: &str = "batch/max_rows_per_batch";
}
