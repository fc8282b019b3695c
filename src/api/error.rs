// ==========================================
// 校园考勤核心 - API层错误类型
// ==========================================
// 职责: 定义读取/提交错误，转换后端错误，并给出处置分类
// 处置原则:
//   - Unauthorized 从不透明重试，交回登录流程
//   - NetworkUnreachable / Timeout 可重试，绝不丢弃本地修改
//   - ValidationRejected / ServerError 原样展示，不清除 dirty
//   - NoChanges / SubmissionInProgress 仅为提示
// ==========================================

use crate::repository::BackendError;
use std::time::Duration;
use thiserror::Error;

/// 调用方对错误的处置方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDisposition {
    /// 可提供"重试"
    Retry,
    /// 结束会话，交回登录流程
    Reauthenticate,
    /// 原样展示给用户
    Display,
    /// 提示性，无破坏
    Advisory,
}

/// 名册/记录读取错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("网络不可达: {0}")]
    NetworkUnreachable(String),

    #[error("请求超时: {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("未授权")]
    Unauthorized,

    #[error("资源不存在")]
    NotFound,

    #[error("服务端错误(code={code}): {message}")]
    ServerError { code: u16, message: String },
}

impl FetchError {
    pub fn disposition(&self) -> ErrorDisposition {
        match self {
            FetchError::NetworkUnreachable(_) | FetchError::Timeout { .. } => ErrorDisposition::Retry,
            FetchError::Unauthorized => ErrorDisposition::Reauthenticate,
            FetchError::NotFound | FetchError::ServerError { .. } => ErrorDisposition::Display,
        }
    }
}

impl From<BackendError> for FetchError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Unreachable(msg) => FetchError::NetworkUnreachable(msg),
            BackendError::Unauthorized => FetchError::Unauthorized,
            BackendError::NotFound => FetchError::NotFound,
            BackendError::Rejected(message) => FetchError::ServerError { code: 400, message },
            BackendError::Server { code, message } => FetchError::ServerError { code, message },
        }
    }
}

/// 考勤提交错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("网络不可达: {0}")]
    NetworkUnreachable(String),

    #[error("请求超时: {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("未授权")]
    Unauthorized,

    #[error("提交被拒绝: {0}")]
    ValidationRejected(String),

    #[error("已有提交正在进行")]
    SubmissionInProgress,

    #[error("没有需要保存的修改")]
    NoChanges,

    #[error("服务端错误(code={code}): {message}")]
    ServerError { code: u16, message: String },
}

impl SubmitError {
    pub fn disposition(&self) -> ErrorDisposition {
        match self {
            SubmitError::NetworkUnreachable(_) | SubmitError::Timeout { .. } => {
                ErrorDisposition::Retry
            }
            SubmitError::Unauthorized => ErrorDisposition::Reauthenticate,
            SubmitError::ValidationRejected(_) | SubmitError::ServerError { .. } => {
                ErrorDisposition::Display
            }
            SubmitError::SubmissionInProgress | SubmitError::NoChanges => ErrorDisposition::Advisory,
        }
    }
}

impl From<BackendError> for SubmitError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Unreachable(msg) => SubmitError::NetworkUnreachable(msg),
            BackendError::Unauthorized => SubmitError::Unauthorized,
            BackendError::Rejected(msg) => SubmitError::ValidationRejected(msg),
            // 更新目标已不存在
            BackendError::NotFound => SubmitError::ServerError {
                code: 404,
                message: "考勤记录不存在".to_string(),
            },
            BackendError::Server { code, message } => SubmitError::ServerError { code, message },
        }
    }
}

/// Result 类型别名
pub type FetchResult<T> = Result<T, FetchError>;
pub type SubmitResult<T> = Result<T, SubmitError>;

/// 超时时长的毫秒数（超出 u64 范围时取 u64::MAX）
pub(crate) fn timeout_millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_millis_saturates() {
        assert_eq!(timeout_millis(Duration::from_millis(10_000)), 10_000);
        assert_eq!(timeout_millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn test_backend_error_conversion() {
        assert_eq!(
            FetchError::from(BackendError::Unreachable("down".into())),
            FetchError::NetworkUnreachable("down".into())
        );
        assert_eq!(FetchError::from(BackendError::NotFound), FetchError::NotFound);
        assert_eq!(
            SubmitError::from(BackendError::Rejected("bad date".into())),
            SubmitError::ValidationRejected("bad date".into())
        );
        match SubmitError::from(BackendError::NotFound) {
            SubmitError::ServerError { code, .. } => assert_eq!(code, 404),
            other => panic!("Expected ServerError, got {:?}", other),
        }
    }

    #[test]
    fn test_disposition_policy() {
        assert_eq!(FetchError::Timeout { timeout_ms: 10 }.disposition(), ErrorDisposition::Retry);
        assert_eq!(FetchError::Unauthorized.disposition(), ErrorDisposition::Reauthenticate);
        assert_eq!(SubmitError::NoChanges.disposition(), ErrorDisposition::Advisory);
        assert_eq!(SubmitError::SubmissionInProgress.disposition(), ErrorDisposition::Advisory);
        assert_eq!(
            SubmitError::ValidationRejected("x".into()).disposition(),
            ErrorDisposition::Display
        );
        assert_eq!(
            SubmitError::NetworkUnreachable("x".into()).disposition(),
            ErrorDisposition::Retry
        );
    }
}
