// ==========================================
// 校园考勤核心 - 名册加载
// ==========================================
// 职责: 读取班级在册学生，按显示名（再按ID）稳定排序
// ==========================================

use crate::api::error::{timeout_millis, FetchError, FetchResult};
use crate::domain::Student;
use crate::repository::{AttendanceBackend, CredentialProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// 名册加载器
#[derive(Clone)]
pub struct RosterLoader {
    backend: Arc<dyn AttendanceBackend>,
    credentials: Arc<dyn CredentialProvider>,
    timeout: Duration,
}

impl RosterLoader {
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

    /// 加载名册
    ///
    /// # 返回
    /// - Ok(Vec<Student>): 按 (display_name, id) 排序的名册
    /// - Err(FetchError::NotFound): 班级没有名册（class_id 为空同样视为没有名册）
    /// - Err(FetchError::Unauthorized): 没有凭证或凭证被拒绝
    ///
    /// class_id 由调用方规范化，这里按原样查询。
    pub async fn load(&self, class_id: &str) -> FetchResult<Vec<Student>> {
        if class_id.is_empty() {
            warn!("名册加载: class_id 为空");
            return Err(FetchError::NotFound);
        }

        let credential = self.credentials.credential().ok_or(FetchError::Unauthorized)?;

        debug!("名册加载开始: class_id={}", class_id);
        let mut roster = tokio::time::timeout(
            self.timeout,
            self.backend.fetch_roster(&credential, class_id),
        )
        .await
        .map_err(|_| FetchError::Timeout {
            timeout_ms: timeout_millis(self.timeout),
        })??;

        roster.sort_by(|a, b| {
            a.display_name
                .cmp(&b.display_name)
                .then_with(|| a.id.cmp(&b.id))
        });

        debug!("名册加载完成: class_id={}, students={}", class_id, roster.len());
        Ok(roster)
    }
}
