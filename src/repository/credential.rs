// ==========================================
// 校园考勤核心 - 凭证能力
// ==========================================
// 职责: 以依赖注入方式提供调用凭证，替代全局存储单例
// 红线: 凭证内容不得出现在日志中
// ==========================================

use std::fmt;
use std::sync::{Arc, RwLock};

/// 不透明调用凭证
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// 原始凭证内容（仅供传输层使用）
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// 凭证提供者
///
/// 由会话管理器实现；返回 `None` 表示当前没有可用凭证，
/// 调用方应直接报告未授权而不发起网络请求。
pub trait CredentialProvider: Send + Sync {
    fn credential(&self) -> Option<Credential>;
}

/// 固定凭证提供者（命令行与测试使用）
///
/// 可在运行期替换或清空，模拟会话过期。
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialProvider {
    inner: Arc<RwLock<Option<Credential>>>,
}

impl StaticCredentialProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(Credential::new(token)))),
        }
    }

    /// 没有凭证的提供者
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn replace(&self, credential: Option<Credential>) {
        match self.inner.write() {
            Ok(mut guard) => *guard = credential,
            Err(poisoned) => *poisoned.into_inner() = credential,
        }
    }
}

impl CredentialProvider for StaticCredentialProvider {
    fn credential(&self) -> Option<Credential> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
