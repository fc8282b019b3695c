// ==========================================
// 校园考勤核心 - 已有记录查询
// ==========================================
// 职责: 查询 (班级, 日期) 是否已有考勤记录
// 规则:
//   - 后端"不存在" → Ok(None)，表示走创建路径
//   - 其他失败一律向上传播，不得当作"新日期"处理（避免重复建档）
// ==========================================

use crate::api::error::{timeout_millis, FetchError, FetchResult};
use crate::domain::PersistedRecord;
use crate::repository::{AttendanceBackend, BackendError, CredentialProvider};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// 考勤记录查询器
#[derive(Clone)]
pub struct AttendanceRecordResolver {
    backend: Arc<dyn AttendanceBackend>,
    credentials: Arc<dyn CredentialProvider>,
    timeout: Duration,
}

impl AttendanceRecordResolver {
    pub fn new(
        backend: Arc<dyn AttendanceBackend>,
        credentials: Arc<dyn CredentialProvider>,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            credentials,
            timeout,
        }
    }

    /// 查询已有记录
    pub async fn resolve(
        &self,
        class_id: &str,
        date: NaiveDate,
    ) -> FetchResult<Option<PersistedRecord>> {
        let credential = self.credentials.credential().ok_or(FetchError::Unauthorized)?;

        let result = tokio::time::timeout(
            self.timeout,
            self.backend.fetch_record(&credential, class_id, date),
        )
        .await
        .map_err(|_| FetchError::Timeout {
            timeout_ms: timeout_millis(self.timeout),
        })?;

        match result {
            Ok(record) => {
                debug!(
                    "已有记录: class_id={}, date={}, record_id={}, entries={}",
                    class_id,
                    date,
                    record.record_id,
                    record.entries.len()
                );
                Ok(Some(record))
            }
            Err(BackendError::NotFound) => {
                debug!("无已有记录: class_id={}, date={}", class_id, date);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}
