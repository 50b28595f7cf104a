//! Midnight auto-termination of attendance shifts.

use std::time::Duration;

use chrono::NaiveDateTime;
use rusqlite::Connection;
use tracing::{debug, info, warn};

use taskdeck_api::{AttendanceStatus, db};
use taskdeck_core::attendance::{AUTO_END_ACTIVITY, plan_auto_end};
use taskdeck_core::time;

use crate::storage::{Db, open_shift_from_row, sq_execute, sq_query_map};

/// Close every shift left open from an earlier day. `None` sweeps all workspaces.
///
/// Returns the number of shifts closed.
pub fn auto_end_stale(
    conn: &Connection,
    workspace_id: Option<&str>,
    now: NaiveDateTime,
) -> rusqlite::Result<usize> {
    let open = sq_query_map(conn, db::attendance::open_shifts(workspace_id), open_shift_from_row)?;
    let mut closed = 0;
    for end in plan_auto_end(&open, now) {
        closed += sq_execute(
            conn,
            db::attendance::close(
                &end.id,
                &time::format_datetime(end.end_time),
                end.total_minutes,
                AttendanceStatus::AutoCompleted.as_str(),
                Some(AUTO_END_ACTIVITY),
                None,
            ),
        )?;
    }
    Ok(closed)
}

/// Run the sweep across all workspaces every `interval_secs` until shutdown.
pub async fn run_attendance_sweep(
    db: Db,
    interval_secs: u64,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    if interval_secs == 0 {
        info!("Attendance sweep disabled (interval_secs=0)");
        return;
    }

    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    loop {
        tokio::select! {
            _ = interval.tick() => sweep_once(&db),
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!("Attendance sweep shutting down");
                    break;
                }
            }
        }
    }
}

fn sweep_once(db: &Db) {
    let conn = db.conn();
    match auto_end_stale(&conn, None, time::now_utc()) {
        Ok(0) => debug!("Attendance sweep: nothing to close"),
        Ok(n) => info!("Attendance sweep closed {n} stale shift(s)"),
        Err(e) => warn!("Attendance sweep failed: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_end_closes_only_past_days() {
        let conn = Connection::open_in_memory().unwrap();
        for (_, sql) in db::migrations::MIGRATIONS {
            conn.execute_batch(sql).unwrap();
        }
        sq_execute(&conn, db::users::insert("u1", "Ann", "ann@x.io", "h")).unwrap();
        sq_execute(&conn, db::workspaces::insert("w1", "Ops", None, "CODE123456", "u1")).unwrap();
        sq_execute(
            &conn,
            db::attendance::insert("old", "w1", "u1", None, "2024-05-01", "2024-05-01 22:00:00"),
        )
        .unwrap();
        sq_execute(
            &conn,
            db::attendance::insert("new", "w1", "u1", None, "2024-05-02", "2024-05-02 08:00:00"),
        )
        .unwrap();

        let now = time::parse_datetime("2024-05-02 09:00:00").unwrap();
        assert_eq!(auto_end_stale(&conn, Some("w1"), now).unwrap(), 1);
        assert_eq!(auto_end_stale(&conn, None, now).unwrap(), 0);

        let (status, minutes, end): (String, i64, String) = conn
            .query_row(
                "SELECT status, total_minutes, end_time FROM attendance WHERE id = 'old'",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .unwrap();
        assert_eq!(status, "AUTO_COMPLETED");
        assert_eq!(minutes, 119);
        assert_eq!(end, "2024-05-01 23:59:59");
    }
}
