// ==========================================
// 校园考勤核心 - 服务聚合
// ==========================================
// 职责: 聚合考勤页面所需的加载器、协调器与策略，简化依赖注入
// ==========================================

use crate::api::{AttendanceRecordResolver, FetchResult, RosterLoader, SubmissionCoordinator};
use crate::config::ClientConfig;
use crate::domain::{PersistedRecord, Student};
use crate::engine::{ReconciliationEngine, RemarksPolicy};
use crate::repository::{AttendanceBackend, CredentialProvider};
use chrono::NaiveDate;
use std::sync::Arc;

/// 一次加载的两路结果（名册 + 已有记录）
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub roster: Vec<Student>,
    pub record: Option<PersistedRecord>,
}

/// 考勤服务集合
///
/// 同一后端与凭证提供者共享给三个 I/O 组件；可在多个会话间共享，
/// 提交协调器的在途登记因此对所有会话生效。
#[derive(Clone)]
pub struct AttendanceServices {
    pub roster_loader: RosterLoader,
    pub record_resolver: AttendanceRecordResolver,
    pub submission: SubmissionCoordinator,
    pub reconciliation: ReconciliationEngine,
    pub remarks_policy: RemarksPolicy,
}

impl AttendanceServices {
    pub fn new(
        backend: Arc<dyn AttendanceBackend>,
        credentials: Arc<dyn CredentialProvider>,
        config: &ClientConfig,
    ) -> Self {
        let timeout = config.request_timeout();
        Self {
            roster_loader: RosterLoader::new(backend.clone(), credentials.clone(), timeout),
            record_resolver: AttendanceRecordResolver::new(
                backend.clone(),
                credentials.clone(),
                timeout,
            ),
            submission: SubmissionCoordinator::new(backend, credentials, timeout),
            reconciliation: ReconciliationEngine::new(),
            remarks_policy: config.remarks_policy(),
        }
    }

    /// 并发读取名册与已有记录
    ///
    /// 任一路失败即整体失败，不返回部分结果。
    pub async fn fetch_both(&self, class_id: &str, date: NaiveDate) -> FetchResult<LoadedData> {
        let (roster, record) = futures::future::try_join(
            self.roster_loader.load(class_id),
            self.record_resolver.resolve(class_id, date),
        )
        .await?;
        Ok(LoadedData { roster, record })
    }
}
