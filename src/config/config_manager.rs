// ==========================================
// 校园考勤核心 - 配置管理器
// ==========================================
// 职责: 从 config_kv 表读取客户端配置，缺失或格式错误时回落默认值
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::db::{init_schema, open_sqlite_connection};
use crate::engine::{RemarksPolicy, DEFAULT_REMARKS_MAX_CHARS};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

/// 配置键
pub mod config_keys {
    /// 网络请求超时（毫秒）
    pub const REQUEST_TIMEOUT_MS: &str = "request_timeout_ms";
    /// 备注最大字符数
    pub const REMARKS_MAX_CHARS: &str = "remarks_max_chars";
}

/// 默认网络请求超时（毫秒）
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

// ==========================================
// ClientConfig - 客户端配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub request_timeout_ms: u64,
    pub remarks_max_chars: usize,
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn remarks_policy(&self) -> RemarksPolicy {
        RemarksPolicy::new(self.remarks_max_chars)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            remarks_max_chars: DEFAULT_REMARKS_MAX_CHARS,
        }
    }
}

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
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager（调用方负责 schema）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global 配置（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
            ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// 所有 global 配置的快照
    pub fn get_config_snapshot(&self) -> RepositoryResult<HashMap<String, String>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut map = HashMap::new();
        for row in rows {
            let (key, value) = row?;
            map.insert(key, value);
        }
        Ok(map)
    }

    /// 读取正整数配置，非法值记录告警后回落默认值
    fn get_positive_or_default<T>(&self, key: &str, default: T) -> RepositoryResult<T>
    where
        T: std::str::FromStr + PartialOrd + Default + Copy + std::fmt::Display,
    {
        let Some(raw) = self.get_global_config_value(key)? else {
            return Ok(default);
        };
        match raw.trim().parse::<T>() {
            Ok(v) if v > T::default() => Ok(v),
            _ => {
                warn!("配置值非法，使用默认值: key={}, value={}, default={}", key, raw, default);
                Ok(default)
            }
        }
    }

    /// 加载客户端配置
    pub fn load_client_config(&self) -> RepositoryResult<ClientConfig> {
        let defaults = ClientConfig::default();
        Ok(ClientConfig {
            request_timeout_ms: self.get_positive_or_default(
                config_keys::REQUEST_TIMEOUT_MS,
                defaults.request_timeout_ms,
            )?,
            remarks_max_chars: self.get_positive_or_default(
                config_keys::REMARKS_MAX_CHARS,
                defaults.remarks_max_chars,
            )?,
        })
    }
}
