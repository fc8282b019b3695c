// ==========================================
// 校园管理移动端 - 考勤核对与提交核心库
// ==========================================
// 范围: 名册加载、已有记录查询、核对合并、变更追踪、
//       创建/更新提交、离开拦截
// 不含: 登录与会话存储、界面渲染、路由机制、其他页面
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 后端接口、凭证、本地存储
pub mod repository;

// 引擎层 - 纯内存规则
pub mod engine;

// API 层 - 异步 I/O
pub mod api;

// 应用层 - 页面会话
pub mod app;

// 配置层
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

pub use domain::{
    AttendanceEntry, AttendanceStatus, AttendanceSummary, PersistedRecord, RecordEntry,
    RecordPayload, Student, WorkingSet,
};

pub use engine::{
    ChangeTracker, EditError, ExitDecision, ExitReason, ExitResolution, NavigationGuard,
    ReconciliationEngine, RemarksPolicy,
};

pub use api::{
    AttendanceRecordResolver, ErrorDisposition, FetchError, RosterLoader, SubmissionCoordinator,
    SubmitError,
};

pub use app::{AttendanceServices, AttendanceSession, SessionError};

pub use repository::{
    AttendanceBackend, BackendError, Credential, CredentialProvider, SqliteAttendanceStore,
    StaticCredentialProvider,
};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "校园考勤";
