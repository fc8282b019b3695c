// ==========================================
// 校园考勤核心 - 后端存储接口
// ==========================================
// 职责: 定义名册/考勤记录持久化服务的调用接口（不包含传输实现）
// 说明: 核心只依赖此 trait，具体传输由适配器实现
// ==========================================

use crate::domain::{PersistedRecord, RecordPayload, Student};
use crate::repository::credential::Credential;
use crate::repository::error::RepositoryError;
use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

/// 后端调用错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// 网络不可达 / 连接中断
    #[error("后端不可达: {0}")]
    Unreachable(String),

    /// 凭证被拒绝
    #[error("凭证被拒绝")]
    Unauthorized,

    /// 资源不存在（名册/记录）
    #[error("资源不存在")]
    NotFound,

    /// 请求被后端校验拒绝
    #[error("请求被拒绝: {0}")]
    Rejected(String),

    /// 后端内部错误
    #[error("后端错误(code={code}): {message}")]
    Server { code: u16, message: String },
}

// ==========================================
// 从 RepositoryError 转换（本地 SQLite 存储）
// ==========================================
impl From<RepositoryError> for BackendError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { .. } => BackendError::NotFound,
            RepositoryError::CredentialRejected => BackendError::Unauthorized,
            RepositoryError::UniqueConstraintViolation(msg)
            | RepositoryError::ForeignKeyViolation(msg) => BackendError::Rejected(msg),
            RepositoryError::FieldValueError { field, message } => {
                BackendError::Rejected(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::LockError(msg) => BackendError::Unreachable(msg),
            other => BackendError::Server {
                code: 500,
                message: other.to_string(),
            },
        }
    }
}

// ==========================================
// AttendanceBackend Trait
// ==========================================
// 用途: 名册读取、考勤记录读取/创建/整体替换
// 实现者: SqliteAttendanceStore，以及测试中的模拟后端
#[async_trait]
pub trait AttendanceBackend: Send + Sync {
    /// GET roster(classId)
    ///
    /// # 返回
    /// - Ok(Vec<Student>): 名册（顺序不作保证）
    /// - Err(BackendError::NotFound): 班级没有名册
    async fn fetch_roster(
        &self,
        credential: &Credential,
        class_id: &str,
    ) -> Result<Vec<Student>, BackendError>;

    /// GET attendanceRecord(classId, date)
    ///
    /// 记录不存在时返回 `Err(BackendError::NotFound)`，由调用方解释为"走创建路径"。
    async fn fetch_record(
        &self,
        credential: &Credential,
        class_id: &str,
        date: NaiveDate,
    ) -> Result<PersistedRecord, BackendError>;

    /// POST attendanceRecord(classId, {date, entries[]})
    async fn create_record(
        &self,
        credential: &Credential,
        class_id: &str,
        payload: &RecordPayload,
    ) -> Result<PersistedRecord, BackendError>;

    /// PUT attendanceRecord(classId, recordId, {date, entries[]})
    ///
    /// 整体替换记录的条目列表，不做增量合并。
    async fn update_record(
        &self,
        credential: &Credential,
        class_id: &str,
        record_id: &str,
        payload: &RecordPayload,
    ) -> Result<PersistedRecord, BackendError>;
}
