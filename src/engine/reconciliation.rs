// ==========================================
// 校园考勤核心 - 核对引擎
// ==========================================
// 职责: 名册 × 已持久化记录 → 可编辑工作集
// 规则: 以名册为准的左外连接
//   - 名册中有、记录中有 → 沿用记录的状态/备注
//   - 名册中有、记录中无 → absent / ""
//   - 名册中无、记录中有 → 丢弃（学生已离班）
// 红线: 无 I/O，所有条目 dirty=false
// ==========================================

use crate::domain::{AttendanceEntry, AttendanceStatus, PersistedRecord, RecordEntry, Student, WorkingSet};
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// 核对引擎
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconciliationEngine;

impl ReconciliationEngine {
    pub fn new() -> Self {
        Self
    }

    /// 合并名册与已有记录
    ///
    /// # 参数
    /// - `class_id` / `date`: 工作集归属
    /// - `roster`: 名册（决定条目集合与顺序）
    /// - `existing`: 已持久化记录，`None` 表示该日期尚无记录
    ///
    /// # 返回
    /// 与名册一一对应的工作集；名册中重复的学生ID只保留第一次出现
    pub fn reconcile(
        &self,
        class_id: &str,
        date: NaiveDate,
        roster: &[Student],
        existing: Option<&PersistedRecord>,
    ) -> WorkingSet {
        let persisted: HashMap<&str, &RecordEntry> = existing
            .map(|record| {
                record
                    .entries
                    .iter()
                    .map(|e| (e.student_id.as_str(), e))
                    .collect()
            })
            .unwrap_or_default();

        if let Some(record) = existing {
            if record.date != date {
                warn!(
                    "核对: 记录日期与工作集日期不一致 record_id={}, record_date={}, date={}",
                    record.record_id, record.date, date
                );
            }
        }

        let mut seen: HashSet<&str> = HashSet::with_capacity(roster.len());
        let mut entries = Vec::with_capacity(roster.len());
        let mut seeded = 0usize;

        for student in roster {
            if !seen.insert(student.id.as_str()) {
                warn!("核对: 名册中存在重复学生ID, 已忽略 student_id={}", student.id);
                continue;
            }

            let (status, remarks) = match persisted.get(student.id.as_str()) {
                Some(entry) => {
                    seeded += 1;
                    (entry.status, entry.remarks.clone())
                }
                None => (AttendanceStatus::Absent, String::new()),
            };

            entries.push(AttendanceEntry {
                student_id: student.id.clone(),
                student_name: student.display_name.clone(),
                status,
                remarks,
                dirty: false,
            });
        }

        let stale = persisted.len().saturating_sub(seeded);
        debug!(
            "核对完成: class_id={}, date={}, entries={}, seeded={}, stale_dropped={}",
            class_id,
            date,
            entries.len(),
            seeded,
            stale
        );

        WorkingSet {
            class_id: class_id.to_string(),
            date,
            existing_record_id: existing.map(|r| r.record_id.clone()),
            entries,
        }
    }
}
