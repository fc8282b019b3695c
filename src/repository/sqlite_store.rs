// ==========================================
// 校园考勤核心 - 本地 SQLite 考勤存储
// ==========================================
// 职责: AttendanceBackend 的 SQLite 实现（命令行与集成测试使用）
// 红线: Repository 不含业务逻辑，只负责数据访问
// ==========================================

use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::{AttendanceStatus, PersistedRecord, RecordEntry, RecordPayload, Student};
use crate::repository::backend::{AttendanceBackend, BackendError};
use crate::repository::credential::Credential;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const DATE_FORMAT: &str = "%Y-%m-%d";

// ==========================================
// SqliteAttendanceStore - 考勤存储
// ==========================================
/// 考勤存储
/// 职责: 管理 class_roster / attendance_record / attendance_record_entry / api_credential 表
pub struct SqliteAttendanceStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteAttendanceStore {
    /// 打开（必要时创建）数据库并初始化 schema
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建存储实例（调用方负责 schema）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 维护接口（种子数据）
    // ==========================================

    /// 登记一个可接受的凭证
    pub fn register_credential(&self, token: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO api_credential (token, created_at) VALUES (?1, ?2)",
            params![token, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// 新增或更新名册中的学生
    pub fn upsert_student(&self, class_id: &str, student: &Student) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO class_roster (class_id, student_id, display_name, external_student_id)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(class_id, student_id) DO UPDATE SET
                display_name = ?3,
                external_student_id = ?4
            "#,
            params![
                class_id,
                student.id,
                student.display_name,
                student.external_student_id
            ],
        )?;
        Ok(())
    }

    /// 从名册中移除学生（历史考勤条目保留）
    pub fn remove_student(&self, class_id: &str, student_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM class_roster WHERE class_id = ?1 AND student_id = ?2",
            params![class_id, student_id],
        )?;
        Ok(affected > 0)
    }

    /// 统计班级的考勤记录数
    pub fn count_records(&self, class_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM attendance_record WHERE class_id = ?1",
            params![class_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ==========================================
    // 同步实现（不跨 await 持有锁）
    // ==========================================

    fn check_credential(conn: &Connection, credential: &Credential) -> RepositoryResult<()> {
        let known: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM api_credential WHERE token = ?1",
                params![credential.expose()],
                |row| row.get(0),
            )
            .optional()?;
        match known {
            Some(_) => Ok(()),
            None => Err(RepositoryError::CredentialRejected),
        }
    }

    fn load_roster(&self, credential: &Credential, class_id: &str) -> RepositoryResult<Vec<Student>> {
        let conn = self.get_conn()?;
        Self::check_credential(&conn, credential)?;

        let mut stmt = conn.prepare(
            r#"
            SELECT student_id, display_name, external_student_id
            FROM class_roster
            WHERE class_id = ?1
            ORDER BY display_name, student_id
            "#,
        )?;
        let rows = stmt.query_map(params![class_id], |row| {
            Ok(Student {
                id: row.get(0)?,
                display_name: row.get(1)?,
                external_student_id: row.get(2)?,
            })
        })?;

        let mut students = Vec::new();
        for row in rows {
            students.push(row?);
        }

        if students.is_empty() {
            return Err(RepositoryError::NotFound {
                entity: "ClassRoster".to_string(),
                id: class_id.to_string(),
            });
        }
        Ok(students)
    }

    fn load_record(
        &self,
        credential: &Credential,
        class_id: &str,
        date: NaiveDate,
    ) -> RepositoryResult<PersistedRecord> {
        let conn = self.get_conn()?;
        Self::check_credential(&conn, credential)?;

        let record_id: Option<String> = conn
            .query_row(
                "SELECT record_id FROM attendance_record WHERE class_id = ?1 AND record_date = ?2",
                params![class_id, date.format(DATE_FORMAT).to_string()],
                |row| row.get(0),
            )
            .optional()?;

        let record_id = record_id.ok_or_else(|| RepositoryError::NotFound {
            entity: "AttendanceRecord".to_string(),
            id: format!("{}@{}", class_id, date),
        })?;

        let entries = Self::load_entries(&conn, &record_id)?;
        Ok(PersistedRecord {
            record_id,
            date,
            entries,
        })
    }

    fn load_entries(conn: &Connection, record_id: &str) -> RepositoryResult<Vec<RecordEntry>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT student_id, status, remarks
            FROM attendance_record_entry
            WHERE record_id = ?1
            ORDER BY student_id
            "#,
        )?;
        let rows = stmt.query_map(params![record_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (student_id, status, remarks) = row?;
            let status = status
                .parse::<AttendanceStatus>()
                .map_err(|e| RepositoryError::FieldValueError {
                    field: "status".to_string(),
                    message: e.to_string(),
                })?;
            entries.push(RecordEntry {
                student_id,
                status,
                remarks,
            });
        }
        Ok(entries)
    }

    fn validate_payload(payload: &RecordPayload) -> RepositoryResult<()> {
        let mut seen = HashSet::new();
        for entry in &payload.entries {
            if entry.student_id.trim().is_empty() {
                return Err(RepositoryError::FieldValueError {
                    field: "studentId".to_string(),
                    message: "学生ID为空".to_string(),
                });
            }
            if !seen.insert(entry.student_id.as_str()) {
                return Err(RepositoryError::FieldValueError {
                    field: "studentId".to_string(),
                    message: format!("重复的学生ID: {}", entry.student_id),
                });
            }
        }
        Ok(())
    }

    fn insert_entries(
        tx: &rusqlite::Transaction<'_>,
        record_id: &str,
        entries: &[RecordEntry],
    ) -> RepositoryResult<()> {
        let mut stmt = tx.prepare(
            "INSERT INTO attendance_record_entry (record_id, student_id, status, remarks) VALUES (?1, ?2, ?3, ?4)",
        )?;
        for entry in entries {
            stmt.execute(params![
                record_id,
                entry.student_id,
                entry.status.as_str(),
                entry.remarks
            ])?;
        }
        Ok(())
    }

    fn insert_record(
        &self,
        credential: &Credential,
        class_id: &str,
        payload: &RecordPayload,
    ) -> RepositoryResult<PersistedRecord> {
        let mut conn = self.get_conn()?;
        Self::check_credential(&conn, credential)?;
        Self::validate_payload(payload)?;

        let record_id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let tx = conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO attendance_record (record_id, class_id, record_date, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            "#,
            params![
                record_id,
                class_id,
                payload.date.format(DATE_FORMAT).to_string(),
                now
            ],
        )?;
        Self::insert_entries(&tx, &record_id, &payload.entries)?;
        tx.commit()?;

        Ok(PersistedRecord {
            record_id,
            date: payload.date,
            entries: payload.entries.clone(),
        })
    }

    fn replace_record(
        &self,
        credential: &Credential,
        class_id: &str,
        record_id: &str,
        payload: &RecordPayload,
    ) -> RepositoryResult<PersistedRecord> {
        let mut conn = self.get_conn()?;
        Self::check_credential(&conn, credential)?;
        Self::validate_payload(payload)?;

        let stored_date: Option<String> = conn
            .query_row(
                "SELECT record_date FROM attendance_record WHERE record_id = ?1 AND class_id = ?2",
                params![record_id, class_id],
                |row| row.get(0),
            )
            .optional()?;
        let stored_date = stored_date.ok_or_else(|| RepositoryError::NotFound {
            entity: "AttendanceRecord".to_string(),
            id: record_id.to_string(),
        })?;
        if stored_date != payload.date.format(DATE_FORMAT).to_string() {
            return Err(RepositoryError::FieldValueError {
                field: "date".to_string(),
                message: format!("记录日期为 {}，请求日期为 {}", stored_date, payload.date),
            });
        }

        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM attendance_record_entry WHERE record_id = ?1",
            params![record_id],
        )?;
        Self::insert_entries(&tx, record_id, &payload.entries)?;
        tx.execute(
            "UPDATE attendance_record SET updated_at = ?2 WHERE record_id = ?1",
            params![record_id, Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;

        Ok(PersistedRecord {
            record_id: record_id.to_string(),
            date: payload.date,
            entries: payload.entries.clone(),
        })
    }
}

#[async_trait]
impl AttendanceBackend for SqliteAttendanceStore {
    async fn fetch_roster(
        &self,
        credential: &Credential,
        class_id: &str,
    ) -> Result<Vec<Student>, BackendError> {
        Ok(self.load_roster(credential, class_id)?)
    }

    async fn fetch_record(
        &self,
        credential: &Credential,
        class_id: &str,
        date: NaiveDate,
    ) -> Result<PersistedRecord, BackendError> {
        Ok(self.load_record(credential, class_id, date)?)
    }

    async fn create_record(
        &self,
        credential: &Credential,
        class_id: &str,
        payload: &RecordPayload,
    ) -> Result<PersistedRecord, BackendError> {
        Ok(self.insert_record(credential, class_id, payload)?)
    }

    async fn update_record(
        &self,
        credential: &Credential,
        class_id: &str,
        record_id: &str,
        payload: &RecordPayload,
    ) -> Result<PersistedRecord, BackendError> {
        Ok(self.replace_record(credential, class_id, record_id, payload)?)
    }
}
