// ==========================================
// 校园考勤核心 - 变更追踪
// ==========================================
// 职责: 工作集的全部编辑操作与 dirty 标记维护
// 红线:
//   - 所有操作同步、纯内存，返回新的 WorkingSet，不修改入参
//   - dirty 只在成功提交或显式放弃时清除
// ==========================================

use crate::domain::{AttendanceStatus, WorkingSet};
use serde::Serialize;
use thiserror::Error;

/// 编辑错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("学生不在工作集中: {0}")]
    UnknownStudent(String),

    #[error("备注过长: 最多{max}字, 实际{actual}字")]
    RemarksTooLong { max: usize, actual: usize },
}

/// 两个工作集快照之间单个学生的差异
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryChange {
    pub student_id: String,
    /// (旧, 新)，未变化为 None
    pub status: Option<(AttendanceStatus, AttendanceStatus)>,
    pub remarks: Option<(String, String)>,
    pub dirty: Option<(bool, bool)>,
}

/// 变更追踪器
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeTracker;

impl ChangeTracker {
    /// 设置单个学生的出勤状态并标记为脏
    pub fn set_status(
        ws: &WorkingSet,
        student_id: &str,
        status: AttendanceStatus,
    ) -> Result<WorkingSet, EditError> {
        let idx = ws
            .position(student_id)
            .ok_or_else(|| EditError::UnknownStudent(student_id.to_string()))?;

        let mut next = ws.clone();
        let entry = &mut next.entries[idx];
        entry.status = status;
        entry.dirty = true;
        Ok(next)
    }

    /// 设置单个学生的备注并标记为脏
    ///
    /// 长度由调用方用 `RemarksPolicy` 预先校验。
    pub fn set_remarks(
        ws: &WorkingSet,
        student_id: &str,
        remarks: impl Into<String>,
    ) -> Result<WorkingSet, EditError> {
        let idx = ws
            .position(student_id)
            .ok_or_else(|| EditError::UnknownStudent(student_id.to_string()))?;

        let mut next = ws.clone();
        let entry = &mut next.entries[idx];
        entry.remarks = remarks.into();
        entry.dirty = true;
        Ok(next)
    }

    /// 全员设置为同一状态（"全部出勤/全部缺勤"）
    ///
    /// 覆盖此前逐人编辑的状态，调用方需先经用户确认。备注保持不变。
    pub fn bulk_set_status(ws: &WorkingSet, status: AttendanceStatus) -> WorkingSet {
        let mut next = ws.clone();
        for entry in next.entries.iter_mut() {
            entry.status = status;
            entry.dirty = true;
        }
        next
    }

    /// 是否存在未保存的修改
    pub fn is_dirty(ws: &WorkingSet) -> bool {
        ws.is_dirty()
    }

    /// 清除全部 dirty 标记（提交成功或放弃修改后调用）
    pub fn clear_dirty(ws: &WorkingSet) -> WorkingSet {
        let mut next = ws.clone();
        for entry in next.entries.iter_mut() {
            entry.dirty = false;
        }
        next
    }

    /// 比较两个快照，列出发生变化的学生
    ///
    /// 只比较两边都存在的学生ID（同一工作集的前后快照总是如此）。
    pub fn diff(before: &WorkingSet, after: &WorkingSet) -> Vec<EntryChange> {
        let mut changes = Vec::new();
        for new in after.entries() {
            let Some(old) = before.entry(new.student_id()) else {
                continue;
            };

            let status = (old.status != new.status).then(|| (old.status, new.status));
            let remarks =
                (old.remarks != new.remarks).then(|| (old.remarks.clone(), new.remarks.clone()));
            let dirty = (old.dirty != new.dirty).then(|| (old.dirty, new.dirty));

            if status.is_some() || remarks.is_some() || dirty.is_some() {
                changes.push(EntryChange {
                    student_id: new.student_id.clone(),
                    status,
                    remarks,
                    dirty,
                });
            }
        }
        changes
    }
}
