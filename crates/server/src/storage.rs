use anyhow::{Context, Result};
use rusqlite::types::{Type, Value as SqlValue};
use rusqlite::{Connection, OptionalExtension, Row, params_from_iter};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use taskdeck_api::db::Built;
use taskdeck_api::db::migrations::MIGRATIONS;
use taskdeck_api::{
    AttendanceResponse, BugResponse, ClientInvitationResponse, MemberResponse,
    NotificationResponse, ProjectResponse, TaskResponse, UserResponse, WeeklyReportResponse,
    WorkspaceResponse,
};
use taskdeck_core::report::TaskRecord;
use taskdeck_core::{CoreError, time};

/// Shared database state
#[derive(Clone)]
pub struct Db {
    conn: Arc<Mutex<Connection>>,
}

impl Db {
    pub fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Initialize the database: open connection, enable WAL, run migrations
pub fn init_db(data_dir: &Path) -> Result<Db> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("creating data directory {}", data_dir.display()))?;
    let db_path = data_dir.join("taskdeck.db");
    let conn = Connection::open(&db_path).context("opening SQLite database")?;

    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;

    run_migrations(&conn)?;

    Ok(Db {
        conn: Arc::new(Mutex::new(conn)),
    })
}

fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    for (name, sql) in MIGRATIONS {
        let already_applied: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM _migrations WHERE name = ?1",
            [name],
            |row| row.get(0),
        )?;

        if !already_applied {
            conn.execute_batch(sql)
                .with_context(|| format!("running migration {name}"))?;
            conn.execute("INSERT INTO _migrations (name) VALUES (?1)", [name])?;
            tracing::info!("Applied migration: {name}");
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// sea-query execution helpers
// ---------------------------------------------------------------------------

fn bind(values: sea_query::Values) -> Vec<SqlValue> {
    use sea_query::Value as Sq;

    fn int(v: Option<i64>) -> SqlValue {
        v.map_or(SqlValue::Null, SqlValue::Integer)
    }

    values
        .0
        .into_iter()
        .map(|v| match v {
            Sq::Bool(b) => int(b.map(i64::from)),
            Sq::TinyInt(n) => int(n.map(i64::from)),
            Sq::SmallInt(n) => int(n.map(i64::from)),
            Sq::Int(n) => int(n.map(i64::from)),
            Sq::BigInt(n) => int(n),
            Sq::TinyUnsigned(n) => int(n.map(i64::from)),
            Sq::SmallUnsigned(n) => int(n.map(i64::from)),
            Sq::Unsigned(n) => int(n.map(i64::from)),
            Sq::BigUnsigned(n) => int(n.and_then(|n| i64::try_from(n).ok())),
            Sq::Float(f) => f.map_or(SqlValue::Null, |f| SqlValue::Real(f64::from(f))),
            Sq::Double(f) => f.map_or(SqlValue::Null, SqlValue::Real),
            Sq::String(s) => s.map_or(SqlValue::Null, |s| SqlValue::Text(*s)),
            Sq::Char(c) => c.map_or(SqlValue::Null, |c| SqlValue::Text(c.to_string())),
            Sq::Bytes(b) => b.map_or(SqlValue::Null, |b| SqlValue::Blob(*b)),
            #[allow(unreachable_patterns)]
            _ => SqlValue::Null,
        })
        .collect()
}

pub fn sq_execute(conn: &Connection, (sql, values): Built) -> rusqlite::Result<usize> {
    conn.execute(&sql, params_from_iter(bind(values)))
}

pub fn sq_query_row<T>(
    conn: &Connection,
    (sql, values): Built,
    f: impl FnOnce(&Row<'_>) -> rusqlite::Result<T>,
) -> rusqlite::Result<T> {
    conn.query_row(&sql, params_from_iter(bind(values)), f)
}

/// Like [`sq_query_row`], but `None` when no row matches.
pub fn sq_query_opt<T>(
    conn: &Connection,
    built: Built,
    f: impl FnOnce(&Row<'_>) -> rusqlite::Result<T>,
) -> rusqlite::Result<Option<T>> {
    sq_query_row(conn, built, f).optional()
}

pub fn sq_query_map<T>(
    conn: &Connection,
    (sql, values): Built,
    f: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
) -> rusqlite::Result<Vec<T>> {
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(bind(values)), f)?;
    rows.collect()
}

/// Run a single-column `COUNT(*)` query.
pub fn sq_count(conn: &Connection, built: Built) -> rusqlite::Result<i64> {
    sq_query_row(conn, built, |row| row.get(0))
}

pub fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Current UTC time in the storage format.
pub fn now_string() -> String {
    time::format_datetime(time::now_utc())
}

// ---------------------------------------------------------------------------
// Column decoding
// ---------------------------------------------------------------------------

fn conversion_error(idx: usize, e: CoreError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

/// Decode a label column (`"IN_PROGRESS"`, `"ADMIN"`, ...) into its enum.
pub fn label<T: FromStr<Err = CoreError>>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_error(idx, e))
}

fn json(row: &Row<'_>, idx: usize) -> rusqlite::Result<serde_json::Value> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn string_list(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn datetime(row: &Row<'_>, idx: usize) -> rusqlite::Result<chrono::NaiveDateTime> {
    let raw: String = row.get(idx)?;
    time::parse_datetime(&raw).map_err(|e| conversion_error(idx, e))
}

fn opt_datetime(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<chrono::NaiveDateTime>> {
    row.get::<_, Option<String>>(idx)?
        .map(|raw| time::parse_datetime(&raw).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn opt_date(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<chrono::NaiveDate>> {
    row.get::<_, Option<String>>(idx)?
        .map(|raw| time::parse_date(&raw).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

// ---------------------------------------------------------------------------
// Row mappers (column order matches the builders in `taskdeck_api::db`)
// ---------------------------------------------------------------------------

pub fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserResponse> {
    Ok(UserResponse {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        created_at: row.get(3)?,
    })
}

pub fn workspace_from_row(row: &Row<'_>) -> rusqlite::Result<WorkspaceResponse> {
    Ok(WorkspaceResponse {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        invite_code: row.get(3)?,
        created_by: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

pub fn member_from_row(row: &Row<'_>) -> rusqlite::Result<MemberResponse> {
    Ok(MemberResponse {
        id: row.get(0)?,
        workspace_id: row.get(1)?,
        user_id: row.get(2)?,
        name: row.get(3)?,
        email: row.get(4)?,
        role: label(row, 5)?,
        joined_at: row.get(6)?,
    })
}

pub fn project_from_row(row: &Row<'_>) -> rusqlite::Result<ProjectResponse> {
    Ok(ProjectResponse {
        id: row.get(0)?,
        workspace_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        created_by: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

pub fn task_from_row(row: &Row<'_>) -> rusqlite::Result<TaskResponse> {
    Ok(TaskResponse {
        id: row.get(0)?,
        workspace_id: row.get(1)?,
        project_id: row.get(2)?,
        project_name: row.get(3)?,
        name: row.get(4)?,
        description: row.get(5)?,
        status: label(row, 6)?,
        priority: label(row, 7)?,
        assignee_id: row.get(8)?,
        assignee_name: row.get(9)?,
        due_date: row.get(10)?,
        position: row.get(11)?,
        estimated_hours: row.get(12)?,
        labels: string_list(row, 13)?,
        created_by: row.get(14)?,
        completed_at: row.get(15)?,
        created_at: row.get(16)?,
        updated_at: row.get(17)?,
    })
}

/// Map a `tasks::report_rows` row into the aggregation input.
pub fn task_record_from_row(row: &Row<'_>) -> rusqlite::Result<TaskRecord> {
    Ok(TaskRecord {
        id: row.get(0)?,
        status: label(row, 1)?,
        priority: label(row, 2)?,
        assignee_id: row.get(3)?,
        assignee_name: row.get(4)?,
        due_date: opt_date(row, 5)?,
        created_at: datetime(row, 6)?,
        completed_at: opt_datetime(row, 7)?,
    })
}

pub fn bug_from_row(row: &Row<'_>) -> rusqlite::Result<BugResponse> {
    Ok(BugResponse {
        id: row.get(0)?,
        workspace_id: row.get(1)?,
        project_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        bug_type: label(row, 5)?,
        priority: label(row, 6)?,
        status: label(row, 7)?,
        reported_by: row.get(8)?,
        reporter_name: row.get(9)?,
        assigned_to: row.get(10)?,
        assignee_name: row.get(11)?,
        metadata: json(row, 12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

pub fn attendance_from_row(row: &Row<'_>) -> rusqlite::Result<AttendanceResponse> {
    Ok(AttendanceResponse {
        id: row.get(0)?,
        workspace_id: row.get(1)?,
        user_id: row.get(2)?,
        user_name: row.get(3)?,
        project_id: row.get(4)?,
        shift_date: row.get(5)?,
        start_time: row.get(6)?,
        end_time: row.get(7)?,
        total_minutes: row.get(8)?,
        status: label(row, 9)?,
        end_activity: row.get(10)?,
        daily_tasks: string_list(row, 11)?,
        created_at: row.get(12)?,
    })
}

/// Map an `attendance::open_shifts` row.
pub fn open_shift_from_row(
    row: &Row<'_>,
) -> rusqlite::Result<taskdeck_core::attendance::OpenShift> {
    let shift_date: String = row.get(1)?;
    Ok(taskdeck_core::attendance::OpenShift {
        id: row.get(0)?,
        shift_date: time::parse_date(&shift_date).map_err(|e| conversion_error(1, e))?,
        start_time: datetime(row, 2)?,
    })
}

pub fn notification_from_row(row: &Row<'_>) -> rusqlite::Result<NotificationResponse> {
    Ok(NotificationResponse {
        id: row.get(0)?,
        workspace_id: row.get(1)?,
        kind: label(row, 2)?,
        title: row.get(3)?,
        message: row.get(4)?,
        metadata: json(row, 5)?,
        is_read: row.get(6)?,
        created_at: row.get(7)?,
    })
}

pub fn weekly_report_from_row(row: &Row<'_>) -> rusqlite::Result<WeeklyReportResponse> {
    Ok(WeeklyReportResponse {
        id: row.get(0)?,
        workspace_id: row.get(1)?,
        user_id: row.get(2)?,
        user_name: row.get(3)?,
        from_date: row.get(4)?,
        to_date: row.get(5)?,
        department: row.get(6)?,
        summary: row.get(7)?,
        task_details: json(row, 8)?,
        is_draft: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

pub fn invitation_from_row(row: &Row<'_>) -> rusqlite::Result<ClientInvitationResponse> {
    Ok(ClientInvitationResponse {
        id: row.get(0)?,
        workspace_id: row.get(1)?,
        project_id: row.get(2)?,
        email: row.get(3)?,
        status: label(row, 4)?,
        invited_by: row.get(5)?,
        expires_at: row.get(6)?,
        accepted_at: row.get(7)?,
        created_at: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskdeck_api::db;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys=ON;").unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = memory_db();
        run_migrations(&conn).unwrap();
        let applied: i64 = conn
            .query_row("SELECT COUNT(*) FROM _migrations", [], |r| r.get(0))
            .unwrap();
        assert_eq!(applied as usize, MIGRATIONS.len());
    }

    #[test]
    fn test_builders_roundtrip_through_sqlite() {
        let conn = memory_db();
        sq_execute(&conn, db::users::insert("u1", "Ann", "ann@example.com", "x")).unwrap();
        let user = sq_query_row(&conn, db::users::get_by_id("u1"), user_from_row).unwrap();
        assert_eq!(user.email, "ann@example.com");

        assert_eq!(sq_count(&conn, db::users::email_count("ann@example.com")).unwrap(), 1);
        let missing = sq_query_opt(&conn, db::users::get_by_id("nope"), user_from_row).unwrap();
        assert!(missing.is_none());

        let dup = sq_execute(&conn, db::users::insert("u2", "Ann", "ann@example.com", "x"))
            .unwrap_err();
        assert!(is_unique_violation(&dup));
    }

    #[test]
    fn test_bool_and_null_binding() {
        let conn = memory_db();
        sq_execute(&conn, db::users::insert("u1", "Ann", "ann@example.com", "x")).unwrap();
        sq_execute(
            &conn,
            db::notifications::insert(&db::notifications::NewNotification {
                id: "n1",
                user_id: "u1",
                workspace_id: None,
                kind: "TASK_ASSIGNED",
                title: "t",
                message: "m",
                metadata: "{}",
            }),
        )
        .unwrap();
        assert_eq!(sq_count(&conn, db::notifications::unread_count("u1")).unwrap(), 1);
        assert_eq!(sq_execute(&conn, db::notifications::mark_read("n1", "u1")).unwrap(), 1);
        assert_eq!(sq_count(&conn, db::notifications::unread_count("u1")).unwrap(), 0);

        let list = sq_query_map(&conn, db::notifications::list("u1", false, 10), notification_from_row)
            .unwrap();
        assert!(list[0].is_read);
        assert!(list[0].workspace_id.is_none());
    }
}
