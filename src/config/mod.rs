// ==========================================
// 校园考勤核心 - 配置层
// ==========================================
// 职责: 客户端配置（超时、备注长度）加载
// 存储: config_kv 表
// ==========================================

pub mod config_manager;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ClientConfig, ConfigManager, DEFAULT_REQUEST_TIMEOUT_MS};
