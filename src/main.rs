// ==========================================
// 校园考勤 - 命令行入口
// ==========================================
// 用法:
//   school-attendance show <class_id> <YYYY-MM-DD>
//   school-attendance mark-all <class_id> <YYYY-MM-DD> <present|absent|late>
//   school-attendance seed-demo <class_id>
//
// 环境变量:
//   SCHOOL_ATTENDANCE_DB     数据库路径（默认: 平台数据目录）
//   SCHOOL_ATTENDANCE_TOKEN  调用凭证
// ==========================================

use anyhow::{anyhow, bail, Context};
use chrono::NaiveDate;
use school_attendance::app::{get_default_db_path, AttendanceServices, AttendanceSession, SubmitOutcome};
use school_attendance::config::ConfigManager;
use school_attendance::{
    AttendanceStatus, ErrorDisposition, SessionError, SqliteAttendanceStore, StaticCredentialProvider,
    Student,
};
use std::sync::Arc;

const USAGE: &str = "用法: school-attendance <show|mark-all|seed-demo> ...";

fn parse_date(raw: Option<String>) -> anyhow::Result<NaiveDate> {
    let raw = raw.ok_or_else(|| anyhow!("缺少日期参数"))?;
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").with_context(|| format!("日期格式错误: {}", raw))
}

fn describe(err: &SessionError) -> &'static str {
    let disposition = match err {
        SessionError::Fetch(e) => e.disposition(),
        SessionError::Submit(e) => e.disposition(),
        _ => ErrorDisposition::Display,
    };
    match disposition {
        ErrorDisposition::Retry => "可重试",
        ErrorDisposition::Reauthenticate => "需要重新登录",
        ErrorDisposition::Display => "请求失败",
        ErrorDisposition::Advisory => "提示",
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    school_attendance::logging::init();

    let mut args = std::env::args().skip(1);
    let command = args.next().ok_or_else(|| anyhow!(USAGE))?;

    let db_path = std::env::var("SCHOOL_ATTENDANCE_DB").unwrap_or_else(|_| get_default_db_path());
    tracing::info!("使用数据库: {}", db_path);

    let store = Arc::new(SqliteAttendanceStore::new(&db_path).context("无法打开考勤数据库")?);
    let config = ConfigManager::new(&db_path)
        .context("无法打开配置")?
        .load_client_config()
        .context("无法读取配置")?;

    let credentials = match std::env::var("SCHOOL_ATTENDANCE_TOKEN") {
        Ok(token) if !token.trim().is_empty() => StaticCredentialProvider::new(token.trim()),
        _ => StaticCredentialProvider::empty(),
    };

    if command == "seed-demo" {
        let class_id = args.next().ok_or_else(|| anyhow!("缺少 class_id"))?;
        let token = std::env::var("SCHOOL_ATTENDANCE_TOKEN").unwrap_or_else(|_| "demo-token".to_string());
        store.register_credential(token.trim())?;
        store.upsert_student(&class_id, &Student::new("s1", "Asha", "EXT-0001"))?;
        store.upsert_student(&class_id, &Student::new("s2", "Ravi", "EXT-0002"))?;
        println!("seeded class_id={}", class_id);
        return Ok(());
    }

    let services = Arc::new(AttendanceServices::new(store, Arc::new(credentials), &config));
    let mut session = AttendanceSession::new(services);

    let class_id = args.next().ok_or_else(|| anyhow!("缺少 class_id"))?;
    let date = parse_date(args.next())?;

    if let Err(e) = session.load(&class_id, date).await {
        bail!("加载失败（{}）: {}", describe(&e), e);
    }

    match command.as_str() {
        "show" => {}
        "mark-all" => {
            let status: AttendanceStatus = args
                .next()
                .ok_or_else(|| anyhow!("缺少状态参数"))?
                .parse()?;
            let prompt = session.request_bulk_status(status)?;
            tracing::info!(
                "批量设置: status={}, affected={}, overwrites_unsaved={}",
                prompt.status,
                prompt.affected,
                prompt.overwrites_unsaved
            );
            session.confirm_bulk_status(&prompt)?;

            match session.save().await {
                Ok(SubmitOutcome::Saved { record_id, created }) => {
                    println!("saved record_id={} created={}", record_id, created);
                }
                Ok(SubmitOutcome::Discarded) => println!("discarded"),
                Err(e) => bail!("保存失败（{}）: {}", describe(&e), e),
            }
        }
        other => bail!("未知命令: {}\n{}", other, USAGE),
    }

    if let Some(ws) = session.working_set() {
        println!("{}", serde_json::to_string_pretty(ws)?);
    }
    session.teardown();
    Ok(())
}
