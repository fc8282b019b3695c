// ==========================================
// 校园考勤核心 - 应用层
// ==========================================
// 职责: 考勤页面会话与服务聚合
// ==========================================

pub mod services;
pub mod session;

pub use services::{AttendanceServices, LoadedData};
pub use session::{
    ApplyOutcome, AttendanceSession, BulkStatusPrompt, ExitOutcome, LoadTicket, SessionError,
    SessionPhase, SubmitOutcome, SubmitTicket,
};

/// 获取默认数据库路径
///
/// 位于平台数据目录下的 `school-attendance/attendance.db`；
/// 无法确定数据目录时使用当前目录。
pub fn get_default_db_path() -> String {
    let base = dirs::data_dir()
        .map(|dir| dir.join("school-attendance"))
        .unwrap_or_else(|| std::path::PathBuf::from("."));

    if let Err(e) = std::fs::create_dir_all(&base) {
        tracing::warn!("无法创建数据目录 {}: {}", base.display(), e);
    }

    base.join("attendance.db").to_string_lossy().to_string()
}
