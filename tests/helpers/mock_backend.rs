// ==========================================
// Mock 后端实现 - 用于集成测试
// ==========================================
// 能力: 故障注入、调用记录、写入闸门（模拟提交在途）、响应延迟
// ==========================================

use async_trait::async_trait;
use chrono::NaiveDate;
use school_attendance::{
    AttendanceBackend, BackendError, Credential, PersistedRecord, RecordPayload, Student,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// 后端调用记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    FetchRoster(String),
    FetchRecord(String, NaiveDate),
    Create(String, RecordPayload),
    Update(String, String, RecordPayload),
}

/// 可编排的模拟后端
pub struct MockBackend {
    roster: Mutex<Result<Vec<Student>, BackendError>>,
    record: Mutex<Result<PersistedRecord, BackendError>>,
    write_failure: Mutex<Option<BackendError>>,
    read_delay: Mutex<Option<Duration>>,
    write_gate: Option<Arc<Notify>>,
    calls: Mutex<Vec<BackendCall>>,
    next_id: AtomicUsize,
}

impl MockBackend {
    /// 名册 Asha(s1) / Ravi(s2)，无已有记录
    pub fn new() -> Self {
        Self {
            roster: Mutex::new(Ok(vec![
                Student::new("s2", "Ravi", "EXT-0002"),
                Student::new("s1", "Asha", "EXT-0001"),
            ])),
            record: Mutex::new(Err(BackendError::NotFound)),
            write_failure: Mutex::new(None),
            read_delay: Mutex::new(None),
            write_gate: None,
            calls: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
        }
    }

    /// 写入在收到闸门通知前一直挂起
    pub fn with_write_gate(gate: Arc<Notify>) -> Self {
        Self {
            write_gate: Some(gate),
            ..Self::new()
        }
    }

    pub fn set_roster(&self, roster: Result<Vec<Student>, BackendError>) {
        *self.roster.lock().unwrap() = roster;
    }

    pub fn set_record(&self, record: Result<PersistedRecord, BackendError>) {
        *self.record.lock().unwrap() = record;
    }

    pub fn fail_writes(&self, err: Option<BackendError>) {
        *self.write_failure.lock().unwrap() = err;
    }

    pub fn delay_reads(&self, delay: Option<Duration>) {
        *self.read_delay.lock().unwrap() = delay;
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn write_calls(&self) -> Vec<BackendCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, BackendCall::Create(..) | BackendCall::Update(..)))
            .collect()
    }

    fn record_call(&self, call: BackendCall) {
        self.calls.lock().unwrap().push(call);
    }

    async fn before_read(&self) {
        let delay = *self.read_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    async fn before_write(&self) -> Result<(), BackendError> {
        if let Some(gate) = &self.write_gate {
            gate.notified().await;
        }
        let failure = self.write_failure.lock().unwrap().clone();
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AttendanceBackend for MockBackend {
    async fn fetch_roster(
        &self,
        _credential: &Credential,
        class_id: &str,
    ) -> Result<Vec<Student>, BackendError> {
        self.record_call(BackendCall::FetchRoster(class_id.to_string()));
        self.before_read().await;
        self.roster.lock().unwrap().clone()
    }

    async fn fetch_record(
        &self,
        _credential: &Credential,
        class_id: &str,
        date: NaiveDate,
    ) -> Result<PersistedRecord, BackendError> {
        self.record_call(BackendCall::FetchRecord(class_id.to_string(), date));
        self.before_read().await;
        self.record.lock().unwrap().clone()
    }

    async fn create_record(
        &self,
        _credential: &Credential,
        class_id: &str,
        payload: &RecordPayload,
    ) -> Result<PersistedRecord, BackendError> {
        self.record_call(BackendCall::Create(class_id.to_string(), payload.clone()));
        self.before_write().await?;

        let record = PersistedRecord {
            record_id: format!("rec-{}", self.next_id.fetch_add(1, Ordering::SeqCst)),
            date: payload.date,
            entries: payload.entries.clone(),
        };
        *self.record.lock().unwrap() = Ok(record.clone());
        Ok(record)
    }

    async fn update_record(
        &self,
        _credential: &Credential,
        class_id: &str,
        record_id: &str,
        payload: &RecordPayload,
    ) -> Result<PersistedRecord, BackendError> {
        self.record_call(BackendCall::Update(
            class_id.to_string(),
            record_id.to_string(),
            payload.clone(),
        ));
        self.before_write().await?;

        let record = PersistedRecord {
            record_id: record_id.to_string(),
            date: payload.date,
            entries: payload.entries.clone(),
        };
        *self.record.lock().unwrap() = Ok(record.clone());
        Ok(record)
    }
}
