// ==========================================
// 校园考勤核心 - 引擎层
// ==========================================
// 职责: 核对、变更追踪、离开拦截等纯内存规则
// 红线: 引擎层不做 I/O
// ==========================================

pub mod change_tracker;
pub mod navigation_guard;
pub mod reconciliation;
pub mod remarks_policy;

// 重导出
pub use change_tracker::{ChangeTracker, EditError, EntryChange};
pub use navigation_guard::{ExitDecision, ExitReason, ExitResolution, NavigationGuard};
pub use reconciliation::ReconciliationEngine;
pub use remarks_policy::{RemarksPolicy, DEFAULT_REMARKS_MAX_CHARS};
