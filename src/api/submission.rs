// ==========================================
// 校园考勤核心 - 考勤提交协调
// ==========================================
// 职责: 判定创建/更新、序列化工作集、执行写入、回写结果
// 规则:
//   - existing_record_id 为空 → 创建；否则按该 ID 整体替换
//   - 工作集不脏 → NoChanges，不发起网络请求
//   - 同一 (班级, 日期) 同时只允许一个提交在途
//   - 失败时工作集保持原样（dirty 保留）
// ==========================================

use crate::api::error::{timeout_millis, SubmitError, SubmitResult};
use crate::domain::{PersistedRecord, WorkingSet};
use crate::repository::{AttendanceBackend, CredentialProvider};
use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{info, warn};

type FlightKey = (String, NaiveDate);

/// 在途提交登记；Drop 时注销（包括 future 被取消的情况）
struct InFlight {
    registry: Arc<Mutex<HashSet<FlightKey>>>,
    key: FlightKey,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        lock_registry(&self.registry).remove(&self.key);
    }
}

fn lock_registry(registry: &Mutex<HashSet<FlightKey>>) -> MutexGuard<'_, HashSet<FlightKey>> {
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 提交协调器
#[derive(Clone)]
pub struct SubmissionCoordinator {
    backend: Arc<dyn AttendanceBackend>,
    credentials: Arc<dyn CredentialProvider>,
    timeout: Duration,
    in_flight: Arc<Mutex<HashSet<FlightKey>>>,
}

impl SubmissionCoordinator {
    pub fn new(
        backend: Arc<dyn AttendanceBackend>,
        credentials: Arc<dyn CredentialProvider>,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            credentials,
            timeout,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// 该工作集是否有提交在途
    pub fn is_in_flight(&self, ws: &WorkingSet) -> bool {
        lock_registry(&self.in_flight).contains(&(ws.class_id().to_string(), ws.date()))
    }

    fn register(&self, ws: &WorkingSet) -> SubmitResult<InFlight> {
        let key = (ws.class_id().to_string(), ws.date());
        let mut registry = lock_registry(&self.in_flight);
        if !registry.insert(key.clone()) {
            return Err(SubmitError::SubmissionInProgress);
        }
        Ok(InFlight {
            registry: Arc::clone(&self.in_flight),
            key,
        })
    }

    /// 提交工作集
    ///
    /// # 返回
    /// - Ok(PersistedRecord): 后端返回的记录（record_id 非空）
    /// - Err(SubmitError): 工作集未被修改，调用方可直接重试
    pub async fn submit(&self, ws: &WorkingSet) -> SubmitResult<PersistedRecord> {
        if !ws.is_dirty() {
            return Err(SubmitError::NoChanges);
        }

        let _flight = self.register(ws)?;

        let credential = self.credentials.credential().ok_or(SubmitError::Unauthorized)?;
        let payload = ws.to_payload();
        let timeout_ms = timeout_millis(self.timeout);

        let record = match ws.existing_record_id() {
            None => {
                info!(
                    "提交考勤(创建): class_id={}, date={}, entries={}",
                    ws.class_id(),
                    ws.date(),
                    payload.entries.len()
                );
                tokio::time::timeout(
                    self.timeout,
                    self.backend.create_record(&credential, ws.class_id(), &payload),
                )
                .await
                .map_err(|_| SubmitError::Timeout { timeout_ms })??
            }
            Some(record_id) => {
                info!(
                    "提交考勤(更新): class_id={}, date={}, record_id={}, entries={}",
                    ws.class_id(),
                    ws.date(),
                    record_id,
                    payload.entries.len()
                );
                let record = tokio::time::timeout(
                    self.timeout,
                    self.backend
                        .update_record(&credential, ws.class_id(), record_id, &payload),
                )
                .await
                .map_err(|_| SubmitError::Timeout { timeout_ms })??;

                if record.record_id != record_id {
                    warn!(
                        "更新返回的 record_id 不一致: expected={}, actual={}",
                        record_id, record.record_id
                    );
                    return Err(SubmitError::ServerError {
                        code: 502,
                        message: format!("更新返回了不同的记录ID: {}", record.record_id),
                    });
                }
                record
            }
        };

        if record.record_id.trim().is_empty() {
            return Err(SubmitError::ServerError {
                code: 502,
                message: "后端未返回记录ID".to_string(),
            });
        }

        info!(
            "提交成功: class_id={}, date={}, record_id={}",
            ws.class_id(),
            ws.date(),
            record.record_id
        );
        Ok(record)
    }

    /// 提交成功后回写：固定 record_id 并清除全部 dirty
    pub fn promote(ws: &WorkingSet, record: &PersistedRecord) -> WorkingSet {
        Self::promote_with_snapshot(ws, ws, record)
    }

    /// 提交成功后回写（提交期间可能有新编辑）
    ///
    /// 只清除值与已提交快照一致的条目的 dirty；提交在途期间被再次修改的条目保持为脏。
    /// `existing_record_id` 已有值时保持不变。
    pub fn promote_with_snapshot(
        current: &WorkingSet,
        submitted: &WorkingSet,
        record: &PersistedRecord,
    ) -> WorkingSet {
        let mut next = current.clone();

        if next.existing_record_id.is_none() {
            next.existing_record_id = Some(record.record_id.clone());
        } else if next.existing_record_id.as_deref() != Some(record.record_id.as_str()) {
            warn!(
                "record_id 已固定，忽略新值: existing={:?}, returned={}",
                next.existing_record_id, record.record_id
            );
        }

        for entry in next.entries.iter_mut() {
            let unchanged = submitted
                .entry(&entry.student_id)
                .map(|s| s.status == entry.status && s.remarks == entry.remarks)
                .unwrap_or(false);
            if unchanged {
                entry.dirty = false;
            }
        }
        next
    }
}
