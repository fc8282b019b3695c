// ==========================================
// 校园考勤核心 - 考勤实体
// ==========================================
// 职责: 考勤条目、工作集、已持久化记录、线上载荷
// 红线: 工作集只能通过 ChangeTracker 的操作产生新值
// ==========================================

use crate::domain::types::AttendanceStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// AttendanceEntry - 考勤条目
// ==========================================

/// 单个学生的考勤条目
///
/// `student_id` 创建后不再变化；`student_name` 是合并时刻的显示名快照。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEntry {
    pub(crate) student_id: String,
    pub(crate) student_name: String,
    pub(crate) status: AttendanceStatus,
    pub(crate) remarks: String,
    pub(crate) dirty: bool,
}

impl AttendanceEntry {
    pub fn student_id(&self) -> &str {
        &self.student_id
    }

    pub fn student_name(&self) -> &str {
        &self.student_name
    }

    pub fn status(&self) -> AttendanceStatus {
        self.status
    }

    pub fn remarks(&self) -> &str {
        &self.remarks
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// 去掉 dirty 标记后的线上形式
    pub fn to_record_entry(&self) -> RecordEntry {
        RecordEntry {
            student_id: self.student_id.clone(),
            status: self.status,
            remarks: self.remarks.clone(),
        }
    }
}

// ==========================================
// WorkingSet - 可编辑工作集
// ==========================================

/// 某班级某日期的可编辑考勤工作集
///
/// # 不变量
/// - `entries` 与构建时的名册快照一一对应（按名册顺序）
/// - `existing_record_id` 一旦由成功提交赋值，在工作集生命周期内不再改变
/// - 是否脏由条目的 dirty 标记派生
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingSet {
    pub(crate) class_id: String,
    pub(crate) date: NaiveDate,
    pub(crate) existing_record_id: Option<String>,
    pub(crate) entries: Vec<AttendanceEntry>,
}

impl WorkingSet {
    pub fn class_id(&self) -> &str {
        &self.class_id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn existing_record_id(&self) -> Option<&str> {
        self.existing_record_id.as_deref()
    }

    pub fn entries(&self) -> &[AttendanceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按学生ID查找条目
    pub fn entry(&self, student_id: &str) -> Option<&AttendanceEntry> {
        self.entries.iter().find(|e| e.student_id == student_id)
    }

    pub(crate) fn position(&self, student_id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.student_id == student_id)
    }

    /// 任一条目为脏即为脏
    pub fn is_dirty(&self) -> bool {
        self.entries.iter().any(|e| e.dirty)
    }

    /// 生成提交载荷（全量条目，不含 dirty 标记）
    pub fn to_payload(&self) -> RecordPayload {
        RecordPayload {
            date: self.date,
            entries: self.entries.iter().map(AttendanceEntry::to_record_entry).collect(),
        }
    }

    /// 统计出勤/缺勤/迟到人数及未保存条目数
    pub fn summary(&self) -> AttendanceSummary {
        let mut summary = AttendanceSummary {
            total: self.entries.len(),
            ..AttendanceSummary::default()
        };
        for entry in &self.entries {
            match entry.status {
                AttendanceStatus::Present => summary.present += 1,
                AttendanceStatus::Absent => summary.absent += 1,
                AttendanceStatus::Late => summary.late += 1,
            }
            if entry.dirty {
                summary.dirty += 1;
            }
        }
        summary
    }
}

/// 工作集统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceSummary {
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    pub dirty: usize,
}

// ==========================================
// 已持久化记录 / 线上载荷
// ==========================================

/// 线上条目三元组 {studentId, status, remarks}
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordEntry {
    pub student_id: String,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub remarks: String,
}

/// 后端已持久化的考勤记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedRecord {
    pub record_id: String,
    pub date: NaiveDate,
    pub entries: Vec<RecordEntry>,
}

/// 创建/更新请求体 {date, entries[]}
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPayload {
    pub date: NaiveDate,
    pub entries: Vec<RecordEntry>,
}
