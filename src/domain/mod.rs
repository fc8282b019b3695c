// ==========================================
// 校园考勤核心 - 领域模型层
// ==========================================
// 职责: 定义学生、考勤条目、工作集等领域实体
// 红线: 不含数据访问逻辑,不含网络逻辑
// ==========================================

pub mod attendance;
pub mod student;
pub mod types;

// 重导出核心类型
pub use attendance::{
    AttendanceEntry, AttendanceSummary, PersistedRecord, RecordEntry, RecordPayload, WorkingSet,
};
pub use student::Student;
pub use types::{AttendanceStatus, ParseStatusError};
