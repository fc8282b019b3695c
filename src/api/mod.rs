// ==========================================
// 校园考勤核心 - API层
// ==========================================
// 职责: 名册加载、已有记录查询、考勤提交（唯一的异步 I/O 点）
// 约束: 所有网络调用都带超时，凭证通过 CredentialProvider 注入
// ==========================================

pub mod error;
pub mod record_resolver;
pub mod roster_loader;
pub mod submission;

// 重导出核心类型
pub use error::{ErrorDisposition, FetchError, FetchResult, SubmitError, SubmitResult};
pub use record_resolver::AttendanceRecordResolver;
pub use roster_loader::RosterLoader;
pub use submission::SubmissionCoordinator;
