// ==========================================
// 考勤会话流程测试（模拟后端）
// ==========================================
// 职责: 验证 过期结果丢弃、提交在途编辑、批量设置确认、离开拦截、重新登录
// ==========================================


mod helpers;

use helpers::mock_backend::{BackendCall, MockBackend};
use school_attendance::app::{
    ApplyOutcome, AttendanceSession, ExitOutcome, SessionPhase, SubmitOutcome,
};
use school_attendance::config::ClientConfig;
use school_attendance::{
    AttendanceStatus, BackendError, EditError, ExitDecision, ExitReason, ExitResolution,
    FetchError, SessionError, StaticCredentialProvider, SubmitError,
};
use std::sync::Arc;
use test_helpers::{date, scenario_date, services_for, services_with, CLASS_ID, TOKEN};

async fn ready_session(backend: Arc<MockBackend>) -> AttendanceSession {
    school_attendance::logging::init_test();
    let mut session = AttendanceSession::new(services_for(backend));
    session.load(CLASS_ID, scenario_date()).await.unwrap();
    session
}

// ==========================================
// 过期加载结果
// ==========================================

#[tokio::test]
async fn test_stale_load_result_is_discarded() {
    let backend = Arc::new(MockBackend::new());
    let mut session = AttendanceSession::new(services_for(backend));
    let services = session.services();

    let old_ticket = session.begin_load(CLASS_ID, date(2024, 2, 29)).unwrap();
    let old_result = services.fetch_both(&old_ticket.class_id, old_ticket.date).await;

    // 用户在旧结果返回前换了日期
    let new_ticket = session.begin_load(CLASS_ID, scenario_date()).unwrap();
    let new_result = services.fetch_both(&new_ticket.class_id, new_ticket.date).await;

    assert_eq!(
        session.apply_load(&old_ticket, old_result).unwrap(),
        ApplyOutcome::Discarded
    );
    assert_eq!(session.phase(), SessionPhase::Loading);
    assert!(session.working_set().is_none());

    assert_eq!(
        session.apply_load(&new_ticket, new_result).unwrap(),
        ApplyOutcome::Applied
    );
    assert_eq!(session.working_set().unwrap().date(), scenario_date());
}

#[tokio::test]
async fn test_late_result_after_teardown_is_discarded() {
    let backend = Arc::new(MockBackend::new());
    let mut session = AttendanceSession::new(services_for(backend));
    let services = session.services();

    let ticket = session.begin_load(CLASS_ID, scenario_date()).unwrap();
    session.teardown();
    let result = services.fetch_both(&ticket.class_id, ticket.date).await;

    assert_eq!(session.apply_load(&ticket, result).unwrap(), ApplyOutcome::Discarded);
    assert!(session.working_set().is_none());
    assert_eq!(session.phase(), SessionPhase::Closed);
}

// ==========================================
// 加载失败与重试
// ==========================================

#[tokio::test]
async fn test_record_failure_builds_no_working_set_then_retry() {
    let backend = Arc::new(MockBackend::new());
    backend.set_record(Err(BackendError::Unreachable("offline".to_string())));
    let mut session = AttendanceSession::new(services_for(backend.clone()));

    let err = session.load(CLASS_ID, scenario_date()).await.unwrap_err();
    assert_eq!(
        err,
        SessionError::Fetch(FetchError::NetworkUnreachable("offline".to_string()))
    );
    assert_eq!(session.phase(), SessionPhase::LoadFailed);
    assert!(session.working_set().is_none());
    assert!(session.last_load_error().is_some());
    assert!(!session.requires_reauthentication());

    backend.set_record(Err(BackendError::NotFound));
    let ticket = session.retry_load().unwrap();
    let result = session.services().fetch_both(&ticket.class_id, ticket.date).await;
    assert_eq!(session.apply_load(&ticket, result).unwrap(), ApplyOutcome::Applied);
    assert_eq!(session.working_set().unwrap().len(), 2);
    assert!(session.last_load_error().is_none());

    // 重试时两路都重新读取
    let fetches = backend
        .calls()
        .into_iter()
        .filter(|c| matches!(c, BackendCall::FetchRoster(_)))
        .count();
    assert_eq!(fetches, 2);
}

#[tokio::test]
async fn test_switching_date_with_unsaved_edits_is_refused() {
    let backend = Arc::new(MockBackend::new());
    let mut session = ready_session(backend).await;
    session.set_status("s1", AttendanceStatus::Present).unwrap();

    assert_eq!(
        session.begin_load(CLASS_ID, date(2024, 3, 2)).unwrap_err(),
        SessionError::UnsavedChanges
    );
    assert_eq!(session.working_set().unwrap().date(), scenario_date());

    session.discard_changes().unwrap();
    assert!(session.begin_load(CLASS_ID, date(2024, 3, 2)).is_ok());
}

#[tokio::test]
async fn test_blank_class_id_is_refused_before_loading() {
    let backend = Arc::new(MockBackend::new());
    let mut session = AttendanceSession::new(services_for(backend.clone()));

    assert_eq!(
        session.begin_load("  ", scenario_date()).unwrap_err(),
        SessionError::Fetch(FetchError::NotFound)
    );
    assert_eq!(session.phase(), SessionPhase::Idle);
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_padded_class_id_is_normalized_for_both_fetches() {
    let backend = Arc::new(MockBackend::new());
    let mut session = AttendanceSession::new(services_for(backend.clone()));

    let ws = session.load("\tC1 ", scenario_date()).await.unwrap();
    assert_eq!(ws.class_id(), CLASS_ID);

    let mut calls = backend.calls();
    calls.sort_by_key(|c| matches!(c, BackendCall::FetchRecord(..)));
    assert_eq!(
        calls,
        vec![
            BackendCall::FetchRoster(CLASS_ID.to_string()),
            BackendCall::FetchRecord(CLASS_ID.to_string(), scenario_date()),
        ]
    );
}

// ==========================================
// 放弃修改
// ==========================================

#[tokio::test]
async fn test_discard_restores_loaded_values() {
    let backend = Arc::new(MockBackend::new());
    let mut session = ready_session(backend.clone()).await;
    let loaded = session.working_set().unwrap().clone();

    session.set_status("s2", AttendanceStatus::Late).unwrap();
    session.set_remarks("s2", "bus delay").unwrap();
    session.discard_changes().unwrap();

    let ws = session.working_set().unwrap();
    assert_eq!(ws, &loaded);
    let s2 = ws.entry("s2").unwrap();
    assert_eq!(
        (s2.status(), s2.remarks(), s2.is_dirty()),
        (AttendanceStatus::Absent, "", false)
    );

    assert_eq!(
        session.save().await.unwrap_err(),
        SessionError::Submit(SubmitError::NoChanges)
    );
    assert!(backend.write_calls().is_empty());
}

#[tokio::test]
async fn test_discard_after_save_restores_saved_values() {
    let backend = Arc::new(MockBackend::new());
    let mut session = ready_session(backend).await;
    session.set_status("s1", AttendanceStatus::Present).unwrap();
    session.save().await.unwrap();

    session.set_status("s1", AttendanceStatus::Late).unwrap();
    session.set_remarks("s1", "clinic").unwrap();
    session.discard_changes().unwrap();

    let ws = session.working_set().unwrap();
    assert_eq!(ws.existing_record_id(), Some("rec-1"));
    let s1 = ws.entry("s1").unwrap();
    assert_eq!(
        (s1.status(), s1.remarks(), s1.is_dirty()),
        (AttendanceStatus::Present, "", false)
    );
}

#[tokio::test]
async fn test_discard_after_in_flight_edit_reverts_to_submitted_values() {
    let backend = Arc::new(MockBackend::new());
    let mut session = ready_session(backend).await;
    session.set_status("s1", AttendanceStatus::Present).unwrap();

    let ticket = session.begin_submit().unwrap();
    session.set_status("s2", AttendanceStatus::Late).unwrap();
    let result = session.services().submission.submit(&ticket.snapshot).await;
    session.finish_submit(&ticket, result).unwrap();
    assert!(session.is_dirty());

    // 回到已提交的快照：s1 保留已保存的值，s2 的在途编辑被撤销
    session.discard_changes().unwrap();
    let ws = session.working_set().unwrap();
    assert_eq!(ws.entry("s1").unwrap().status(), AttendanceStatus::Present);
    assert_eq!(ws.entry("s2").unwrap().status(), AttendanceStatus::Absent);
    assert!(!ws.is_dirty());
}

// ==========================================
// 提交在途时继续编辑
// ==========================================

#[tokio::test]
async fn test_edit_during_submit_stays_dirty() {
    let backend = Arc::new(MockBackend::new());
    let mut session = ready_session(backend.clone()).await;
    session.set_status("s1", AttendanceStatus::Present).unwrap();
    session.set_status("s2", AttendanceStatus::Late).unwrap();

    let ticket = session.begin_submit().unwrap();
    // 提交发出后用户又改了 s2
    session.set_remarks("s2", "bus delay").unwrap();
    let result = session.services().submission.submit(&ticket.snapshot).await;

    let outcome = session.finish_submit(&ticket, result).unwrap();
    assert_eq!(
        outcome,
        SubmitOutcome::Saved {
            record_id: "rec-1".to_string(),
            created: true
        }
    );

    let ws = session.working_set().unwrap();
    assert_eq!(ws.existing_record_id(), Some("rec-1"));
    assert!(!ws.entry("s1").unwrap().is_dirty());
    let s2 = ws.entry("s2").unwrap();
    assert!(s2.is_dirty());
    assert_eq!(s2.remarks(), "bus delay");

    // 再次保存走更新
    match session.save().await.unwrap() {
        SubmitOutcome::Saved { record_id, created } => {
            assert_eq!(record_id, "rec-1");
            assert!(!created);
        }
        other => panic!("Expected Saved, got {:?}", other),
    }
    assert!(!session.is_dirty());
    assert!(matches!(
        backend.write_calls().last(),
        Some(BackendCall::Update(_, id, _)) if id == "rec-1"
    ));
}

#[tokio::test]
async fn test_submit_result_after_teardown_is_discarded() {
    let backend = Arc::new(MockBackend::new());
    let mut session = ready_session(backend).await;
    session.set_status("s1", AttendanceStatus::Present).unwrap();

    let ticket = session.begin_submit().unwrap();
    let result = session.services().submission.submit(&ticket.snapshot).await;
    session.teardown();

    assert_eq!(
        session.finish_submit(&ticket, result).unwrap(),
        SubmitOutcome::Discarded
    );
}

#[tokio::test]
async fn test_unauthorized_submit_keeps_edits_and_requests_login() {
    let backend = Arc::new(MockBackend::new());
    backend.fail_writes(Some(BackendError::Unauthorized));
    let mut session = ready_session(backend).await;
    session.set_status("s2", AttendanceStatus::Late).unwrap();

    let err = session.save().await.unwrap_err();
    assert_eq!(err, SessionError::Submit(SubmitError::Unauthorized));
    assert!(session.requires_reauthentication());
    assert!(session.is_dirty());
    assert_eq!(
        session.working_set().unwrap().entry("s2").unwrap().status(),
        AttendanceStatus::Late
    );
}

// ==========================================
// 批量设置
// ==========================================

#[tokio::test]
async fn test_bulk_prompt_counts_and_confirmation() {
    let backend = Arc::new(MockBackend::new());
    let mut session = ready_session(backend).await;
    session.set_status("s2", AttendanceStatus::Late).unwrap();
    session.set_remarks("s2", "bus delay").unwrap();

    let prompt = session.request_bulk_status(AttendanceStatus::Present).unwrap();
    assert_eq!(prompt.affected, 2);
    assert_eq!(prompt.overwrites_unsaved, 1);
    // 提示本身不修改工作集
    assert_eq!(
        session.working_set().unwrap().entry("s1").unwrap().status(),
        AttendanceStatus::Absent
    );

    assert_eq!(session.confirm_bulk_status(&prompt).unwrap(), ApplyOutcome::Applied);
    let ws = session.working_set().unwrap();
    assert!(ws
        .entries()
        .iter()
        .all(|e| e.status() == AttendanceStatus::Present && e.is_dirty()));
    assert_eq!(ws.entry("s2").unwrap().remarks(), "bus delay");
}

#[tokio::test]
async fn test_bulk_prompt_from_previous_load_is_discarded() {
    let backend = Arc::new(MockBackend::new());
    let mut session = ready_session(backend).await;
    let prompt = session.request_bulk_status(AttendanceStatus::Late).unwrap();

    session.load(CLASS_ID, date(2024, 3, 2)).await.unwrap();
    assert_eq!(session.confirm_bulk_status(&prompt).unwrap(), ApplyOutcome::Discarded);
    assert!(!session.is_dirty());
}

// ==========================================
// 备注策略
// ==========================================

#[tokio::test]
async fn test_overlong_remarks_leave_set_unchanged() {
    let backend = Arc::new(MockBackend::new());
    let config = ClientConfig {
        remarks_max_chars: 5,
        ..ClientConfig::default()
    };
    let services = services_with(backend, StaticCredentialProvider::new(TOKEN), &config);
    let mut session = AttendanceSession::new(services);
    session.load(CLASS_ID, scenario_date()).await.unwrap();

    let err = session.set_remarks("s1", "迟到十分钟了").unwrap_err();
    assert_eq!(
        err,
        SessionError::Edit(EditError::RemarksTooLong { max: 5, actual: 6 })
    );
    assert!(!session.is_dirty());

    assert_eq!(
        session.set_status("ghost", AttendanceStatus::Present).unwrap_err(),
        SessionError::Edit(EditError::UnknownStudent("ghost".to_string()))
    );
}

#[tokio::test]
async fn test_remarks_on_unready_or_closed_session() {
    let backend = Arc::new(MockBackend::new());
    let mut session = AttendanceSession::new(services_for(backend.clone()));
    let long = "x".repeat(500);

    assert_eq!(
        session.set_remarks("s1", &long).unwrap_err(),
        SessionError::NotReady
    );

    session.load(CLASS_ID, scenario_date()).await.unwrap();
    session.teardown();
    assert_eq!(
        session.set_remarks("s1", &long).unwrap_err(),
        SessionError::Closed
    );
}

// ==========================================
// 离开拦截
// ==========================================

#[tokio::test]
async fn test_stay_keeps_edits() {
    let backend = Arc::new(MockBackend::new());
    let mut session = ready_session(backend).await;
    session.set_status("s1", AttendanceStatus::Late).unwrap();

    assert_eq!(
        session.request_exit(ExitReason::Redirect).unwrap(),
        ExitDecision::Blocked
    );
    assert_eq!(session.resolve_exit(ExitResolution::Stay).unwrap(), ExitOutcome::Stayed);
    assert!(session.is_dirty());
    assert_eq!(session.pending_exit(), None);
    assert_eq!(session.phase(), SessionPhase::Ready);

    assert_eq!(
        session.resolve_exit(ExitResolution::Discard).unwrap_err(),
        SessionError::NoPendingExit
    );
}

#[tokio::test]
async fn test_session_is_closed_after_exit() {
    let backend = Arc::new(MockBackend::new());
    let mut session = ready_session(backend).await;

    assert_eq!(
        session.request_exit(ExitReason::BackAction).unwrap(),
        ExitDecision::Proceed
    );
    assert_eq!(session.phase(), SessionPhase::Closed);
    assert_eq!(
        session.set_status("s1", AttendanceStatus::Present).unwrap_err(),
        SessionError::Closed
    );
    assert_eq!(
        session.request_exit(ExitReason::BackAction).unwrap_err(),
        SessionError::Closed
    );
}
