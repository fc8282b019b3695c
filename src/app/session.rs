// ==========================================
// 校园考勤核心 - 考勤页面会话
// ==========================================
// 职责: 持有当前工作集，串起 加载 → 核对 → 编辑 → 提交 → 离开
// 规则:
//   - 每次加载签发 LoadTicket；过期票据（换了班级/日期、会话已结束）的结果到达即丢弃
//   - class_id 在 begin_load 统一去除首尾空白，名册、记录、提交共用同一个值
//   - 加载失败不构建部分工作集，重试总是两路一起重试
//   - 所有离开路径经 NavigationGuard 判定；被拦截时只能 放弃 / 留下
//   - Unauthorized 不重试，标记需要重新登录
// ==========================================

use crate::api::{FetchError, FetchResult, SubmissionCoordinator, SubmitError, SubmitResult};
use crate::app::services::{AttendanceServices, LoadedData};
use crate::domain::{AttendanceStatus, PersistedRecord, WorkingSet};
use crate::engine::{
    ChangeTracker, EditError, ExitDecision, ExitReason, ExitResolution, NavigationGuard,
};
use chrono::NaiveDate;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// 会话错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("会话已结束")]
    Closed,

    #[error("工作集尚未就绪")]
    NotReady,

    #[error("存在未保存的修改")]
    UnsavedChanges,

    #[error("没有待处理的离开请求")]
    NoPendingExit,

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Submit(#[from] SubmitError),
}

/// 会话阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Loading,
    Ready,
    LoadFailed,
    Closed,
}

/// 加载票据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    pub class_id: String,
    pub date: NaiveDate,
}

/// 提交票据（携带提交时刻的快照）
#[derive(Debug, Clone)]
pub struct SubmitTicket {
    generation: u64,
    pub snapshot: WorkingSet,
}

/// 异步结果的应用情况
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// 票据已过期，结果被丢弃
    Discarded,
}

/// 提交结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Saved { record_id: String, created: bool },
    Discarded,
}

/// 离开请求的最终结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    Exited,
    Stayed,
}

/// 批量设置确认提示
///
/// 由 `request_bulk_status` 生成，展示给用户确认后交给 `confirm_bulk_status`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkStatusPrompt {
    generation: u64,
    pub status: AttendanceStatus,
    /// 将被改变状态的人数
    pub affected: usize,
    /// 其中已有未保存修改的人数
    pub overwrites_unsaved: usize,
}

/// 考勤页面会话
pub struct AttendanceSession {
    services: Arc<AttendanceServices>,
    session_id: Uuid,
    generation: u64,
    selection: Option<(String, NaiveDate)>,
    phase: SessionPhase,
    working_set: Option<WorkingSet>,
    /// 最近一次与后端一致的工作集（核对结果或成功提交后的快照）
    baseline: Option<WorkingSet>,
    last_load_error: Option<FetchError>,
    pending_exit: Option<ExitReason>,
    reauth_required: bool,
}

impl AttendanceSession {
    pub fn new(services: Arc<AttendanceServices>) -> Self {
        let session_id = Uuid::new_v4();
        info!("考勤会话创建: session_id={}", session_id);
        Self {
            services,
            session_id,
            generation: 0,
            selection: None,
            phase: SessionPhase::Idle,
            working_set: None,
            baseline: None,
            last_load_error: None,
            pending_exit: None,
            reauth_required: false,
        }
    }

    // ==========================================
    // 只读访问
    // ==========================================

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn services(&self) -> Arc<AttendanceServices> {
        Arc::clone(&self.services)
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn working_set(&self) -> Option<&WorkingSet> {
        self.working_set.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.working_set
            .as_ref()
            .map(ChangeTracker::is_dirty)
            .unwrap_or(false)
    }

    pub fn last_load_error(&self) -> Option<&FetchError> {
        self.last_load_error.as_ref()
    }

    pub fn pending_exit(&self) -> Option<ExitReason> {
        self.pending_exit
    }

    /// 是否需要交回登录流程
    pub fn requires_reauthentication(&self) -> bool {
        self.reauth_required
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.phase == SessionPhase::Closed {
            return Err(SessionError::Closed);
        }
        Ok(())
    }

    fn ready_set(&self) -> Result<&WorkingSet, SessionError> {
        self.ensure_open()?;
        self.working_set.as_ref().ok_or(SessionError::NotReady)
    }

    // ==========================================
    // 加载
    // ==========================================

    /// 开始加载（班级, 日期）
    ///
    /// 使此前所有未完成加载的票据失效。当前工作集有未保存修改时拒绝切换；
    /// class_id 去除首尾空白后为空时视为没有名册。
    pub fn begin_load(&mut self, class_id: &str, date: NaiveDate) -> Result<LoadTicket, SessionError> {
        self.ensure_open()?;
        if self.is_dirty() {
            return Err(SessionError::UnsavedChanges);
        }
        let class_id = class_id.trim();
        if class_id.is_empty() {
            warn!("拒绝加载: session_id={}, class_id 为空", self.session_id);
            return Err(SessionError::Fetch(FetchError::NotFound));
        }

        self.generation += 1;
        self.selection = Some((class_id.to_string(), date));
        self.working_set = None;
        self.baseline = None;
        self.last_load_error = None;
        self.phase = SessionPhase::Loading;

        info!(
            "开始加载: session_id={}, generation={}, class_id={}, date={}",
            self.session_id, self.generation, class_id, date
        );
        Ok(LoadTicket {
            generation: self.generation,
            class_id: class_id.to_string(),
            date,
        })
    }

    /// 重新加载当前选择（两路一起）
    pub fn retry_load(&mut self) -> Result<LoadTicket, SessionError> {
        let (class_id, date) = self.selection.clone().ok_or(SessionError::NotReady)?;
        self.begin_load(&class_id, date)
    }

    /// 应用加载结果
    ///
    /// # 返回
    /// - Ok(Applied): 已构建工作集
    /// - Ok(Discarded): 票据过期，结果被丢弃
    /// - Err(Fetch): 加载失败，未构建工作集
    pub fn apply_load(
        &mut self,
        ticket: &LoadTicket,
        result: FetchResult<LoadedData>,
    ) -> Result<ApplyOutcome, SessionError> {
        if self.phase == SessionPhase::Closed || ticket.generation != self.generation {
            warn!(
                "丢弃过期加载结果: session_id={}, ticket_generation={}, current_generation={}, class_id={}, date={}",
                self.session_id, ticket.generation, self.generation, ticket.class_id, ticket.date
            );
            return Ok(ApplyOutcome::Discarded);
        }

        match result {
            Ok(data) => {
                let ws = self.services.reconciliation.reconcile(
                    &ticket.class_id,
                    ticket.date,
                    &data.roster,
                    data.record.as_ref(),
                );
                info!(
                    "工作集就绪: session_id={}, class_id={}, date={}, entries={}, existing_record_id={:?}",
                    self.session_id,
                    ws.class_id(),
                    ws.date(),
                    ws.len(),
                    ws.existing_record_id()
                );
                self.baseline = Some(ws.clone());
                self.working_set = Some(ws);
                self.phase = SessionPhase::Ready;
                Ok(ApplyOutcome::Applied)
            }
            Err(e) => {
                warn!(
                    "加载失败，跳过核对: session_id={}, class_id={}, date={}, error={}",
                    self.session_id, ticket.class_id, ticket.date, e
                );
                if e == FetchError::Unauthorized {
                    self.reauth_required = true;
                }
                self.last_load_error = Some(e.clone());
                self.phase = SessionPhase::LoadFailed;
                Err(SessionError::Fetch(e))
            }
        }
    }

    /// 加载并核对（begin_load + fetch_both + apply_load）
    pub async fn load(&mut self, class_id: &str, date: NaiveDate) -> Result<&WorkingSet, SessionError> {
        let ticket = self.begin_load(class_id, date)?;
        let services = Arc::clone(&self.services);
        let result = services.fetch_both(&ticket.class_id, ticket.date).await;
        self.apply_load(&ticket, result)?;
        self.working_set.as_ref().ok_or(SessionError::NotReady)
    }

    // ==========================================
    // 编辑
    // ==========================================

    pub fn set_status(&mut self, student_id: &str, status: AttendanceStatus) -> Result<(), SessionError> {
        let next = ChangeTracker::set_status(self.ready_set()?, student_id, status)?;
        self.working_set = Some(next);
        Ok(())
    }

    /// 设置备注（先按备注策略校验长度）
    pub fn set_remarks(&mut self, student_id: &str, remarks: &str) -> Result<(), SessionError> {
        let ws = self.ready_set()?;
        self.services.remarks_policy.validate(remarks)?;
        let next = ChangeTracker::set_remarks(ws, student_id, remarks)?;
        self.working_set = Some(next);
        Ok(())
    }

    /// 生成批量设置的确认提示（不修改工作集）
    pub fn request_bulk_status(&self, status: AttendanceStatus) -> Result<BulkStatusPrompt, SessionError> {
        let ws = self.ready_set()?;
        Ok(BulkStatusPrompt {
            generation: self.generation,
            status,
            affected: ws.entries().iter().filter(|e| e.status() != status).count(),
            overwrites_unsaved: ws
                .entries()
                .iter()
                .filter(|e| e.is_dirty() && e.status() != status)
                .count(),
        })
    }

    /// 用户确认后执行批量设置
    pub fn confirm_bulk_status(&mut self, prompt: &BulkStatusPrompt) -> Result<ApplyOutcome, SessionError> {
        let ws = self.ready_set()?;
        if prompt.generation != self.generation {
            warn!("丢弃过期的批量设置确认: session_id={}", self.session_id);
            return Ok(ApplyOutcome::Discarded);
        }
        let next = ChangeTracker::bulk_set_status(ws, prompt.status);
        info!(
            "批量设置状态: session_id={}, status={}, entries={}",
            self.session_id,
            prompt.status,
            next.len()
        );
        self.working_set = Some(next);
        Ok(ApplyOutcome::Applied)
    }

    // ==========================================
    // 提交
    // ==========================================

    /// 开始提交：对当前工作集取快照
    pub fn begin_submit(&self) -> Result<SubmitTicket, SessionError> {
        Ok(SubmitTicket {
            generation: self.generation,
            snapshot: self.ready_set()?.clone(),
        })
    }

    /// 应用提交结果
    ///
    /// 成功时固定 record_id，并只清除与快照一致的条目的 dirty；失败时工作集不变。
    pub fn finish_submit(
        &mut self,
        ticket: &SubmitTicket,
        result: SubmitResult<PersistedRecord>,
    ) -> Result<SubmitOutcome, SessionError> {
        if self.phase == SessionPhase::Closed || ticket.generation != self.generation {
            warn!(
                "丢弃过期提交结果: session_id={}, ticket_generation={}, current_generation={}",
                self.session_id, ticket.generation, self.generation
            );
            return Ok(SubmitOutcome::Discarded);
        }
        let Some(current) = self.working_set.as_ref() else {
            return Ok(SubmitOutcome::Discarded);
        };

        match result {
            Ok(record) => {
                let created = ticket.snapshot.existing_record_id().is_none();
                let next = SubmissionCoordinator::promote_with_snapshot(current, &ticket.snapshot, &record);
                info!(
                    "提交结果已回写: session_id={}, record_id={}, created={}, still_dirty={}",
                    self.session_id,
                    record.record_id,
                    created,
                    next.summary().dirty
                );
                self.baseline = Some(SubmissionCoordinator::promote(&ticket.snapshot, &record));
                self.working_set = Some(next);
                Ok(SubmitOutcome::Saved {
                    record_id: record.record_id,
                    created,
                })
            }
            Err(e) => {
                warn!("提交失败，保留本地修改: session_id={}, error={}", self.session_id, e);
                if e == SubmitError::Unauthorized {
                    self.reauth_required = true;
                }
                Err(SessionError::Submit(e))
            }
        }
    }

    /// 保存（begin_submit + submit + finish_submit）
    pub async fn save(&mut self) -> Result<SubmitOutcome, SessionError> {
        let ticket = self.begin_submit()?;
        let services = Arc::clone(&self.services);
        let result = services.submission.submit(&ticket.snapshot).await;
        self.finish_submit(&ticket, result)
    }

    // ==========================================
    // 离开
    // ==========================================

    /// 请求离开页面
    ///
    /// - Proceed: 会话已结束
    /// - Blocked: 记录待处理的离开请求，等待 `resolve_exit`
    pub fn request_exit(&mut self, reason: ExitReason) -> Result<ExitDecision, SessionError> {
        self.ensure_open()?;
        match NavigationGuard::evaluate(self.working_set.as_ref(), reason) {
            ExitDecision::Proceed => {
                self.close(reason);
                Ok(ExitDecision::Proceed)
            }
            ExitDecision::Blocked => {
                self.pending_exit = Some(reason);
                Ok(ExitDecision::Blocked)
            }
        }
    }

    /// 处理被拦截的离开请求
    pub fn resolve_exit(&mut self, resolution: ExitResolution) -> Result<ExitOutcome, SessionError> {
        self.ensure_open()?;
        let reason = self.pending_exit.take().ok_or(SessionError::NoPendingExit)?;

        let Some(ws) = self.working_set.as_ref() else {
            self.close(reason);
            return Ok(ExitOutcome::Exited);
        };

        match NavigationGuard::resolve(ws, resolution) {
            Some(discarded) => {
                info!(
                    "放弃修改并离开: session_id={}, reason={:?}",
                    self.session_id, reason
                );
                self.working_set = Some(discarded);
                self.close(reason);
                Ok(ExitOutcome::Exited)
            }
            None => {
                info!("取消离开: session_id={}, reason={:?}", self.session_id, reason);
                Ok(ExitOutcome::Stayed)
            }
        }
    }

    /// 放弃当前未保存的修改（不离开页面）
    ///
    /// 恢复到最近一次与后端一致的值：加载时的核对结果，或最近一次成功提交的快照。
    pub fn discard_changes(&mut self) -> Result<(), SessionError> {
        self.ready_set()?;
        let baseline = self.baseline.clone().ok_or(SessionError::NotReady)?;
        info!(
            "放弃未保存修改: session_id={}, reverted={}",
            self.session_id,
            self.working_set
                .as_ref()
                .map(|ws| ChangeTracker::diff(&baseline, ws).len())
                .unwrap_or(0)
        );
        self.working_set = Some(baseline);
        Ok(())
    }

    /// 应用级销毁（不经守卫）
    pub fn teardown(&mut self) {
        if self.phase != SessionPhase::Closed {
            info!("考勤会话销毁: session_id={}", self.session_id);
        }
        self.generation += 1;
        self.working_set = None;
        self.baseline = None;
        self.pending_exit = None;
        self.phase = SessionPhase::Closed;
    }

    fn close(&mut self, reason: ExitReason) {
        info!("离开考勤页面: session_id={}, reason={:?}", self.session_id, reason);
        self.teardown();
    }
}
