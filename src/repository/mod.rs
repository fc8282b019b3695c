// ==========================================
// 校园考勤核心 - 数据仓储层
// ==========================================
// 职责: 后端存储接口、凭证能力、本地 SQLite 实现
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod backend;
pub mod credential;
pub mod error;
pub mod sqlite_store;

// 重导出核心仓储
pub use backend::{AttendanceBackend, BackendError};
pub use credential::{Credential, CredentialProvider, StaticCredentialProvider};
pub use error::{RepositoryError, RepositoryResult};
pub use sqlite_store::SqliteAttendanceStore;
