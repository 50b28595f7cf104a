//! Attendance (shift) query builders.

use sea_query::{Expr, Order, Query, SelectStatement, SqliteQueryBuilder};

use super::Built;
use super::tables::{Attendance, Users};

const IN_PROGRESS: &str = "IN_PROGRESS";

/// SELECT id, workspace_id, user_id, user_name, project_id, shift_date,
/// start_time, end_time, total_minutes, status, end_activity, daily_tasks,
/// created_at
fn attendance_select(q: &mut SelectStatement) -> &mut SelectStatement {
    q.column((Attendance::Table, Attendance::Id))
        .column((Attendance::Table, Attendance::WorkspaceId))
        .column((Attendance::Table, Attendance::UserId))
        .column((Users::Table, Users::Name))
        .column((Attendance::Table, Attendance::ProjectId))
        .column((Attendance::Table, Attendance::ShiftDate))
        .column((Attendance::Table, Attendance::StartTime))
        .column((Attendance::Table, Attendance::EndTime))
        .column((Attendance::Table, Attendance::TotalMinutes))
        .column((Attendance::Table, Attendance::Status))
        .column((Attendance::Table, Attendance::EndActivity))
        .column((Attendance::Table, Attendance::DailyTasks))
        .column((Attendance::Table, Attendance::CreatedAt))
        .from(Attendance::Table)
        .inner_join(
            Users::Table,
            Expr::col((Users::Table, Users::Id)).equals((Attendance::Table, Attendance::UserId)),
        )
}

pub fn insert(
    id: &str,
    workspace_id: &str,
    user_id: &str,
    project_id: Option<&str>,
    shift_date: &str,
    start_time: &str,
) -> Built {
    Query::insert()
        .into_table(Attendance::Table)
        .columns([
            Attendance::Id,
            Attendance::WorkspaceId,
            Attendance::UserId,
            Attendance::ProjectId,
            Attendance::ShiftDate,
            Attendance::StartTime,
            Attendance::Status,
        ])
        .values_panic([
            id.into(),
            workspace_id.into(),
            user_id.into(),
            project_id.map(|s| s.to_string()).into(),
            shift_date.into(),
            start_time.into(),
            IN_PROGRESS.into(),
        ])
        .build(SqliteQueryBuilder)
}

pub fn get_by_id(id: &str) -> Built {
    let mut q = Query::select().to_owned();
    attendance_select(&mut q);
    q.and_where(Expr::col((Attendance::Table, Attendance::Id)).eq(id))
        .build(SqliteQueryBuilder)
}

/// The user's in-progress shift in a workspace, most recent first.
pub fn active_for_user(workspace_id: &str, user_id: &str) -> Built {
    let mut q = Query::select().to_owned();
    attendance_select(&mut q);
    q.and_where(Expr::col((Attendance::Table, Attendance::WorkspaceId)).eq(workspace_id))
        .and_where(Expr::col((Attendance::Table, Attendance::UserId)).eq(user_id))
        .and_where(Expr::col((Attendance::Table, Attendance::Status)).eq(IN_PROGRESS))
        .order_by((Attendance::Table, Attendance::StartTime), Order::Desc)
        .limit(1)
        .build(SqliteQueryBuilder)
}

/// Filters for [`list`]; `from`/`to` are inclusive bounds on `shift_date`.
#[derive(Debug, Default)]
pub struct AttendanceFilter<'a> {
    pub workspace_id: &'a str,
    pub user_id: Option<&'a str>,
    pub from: Option<&'a str>,
    pub to: Option<&'a str>,
}

pub fn list(f: &AttendanceFilter<'_>) -> Built {
    let mut q = Query::select().to_owned();
    attendance_select(&mut q);
    q.and_where(Expr::col((Attendance::Table, Attendance::WorkspaceId)).eq(f.workspace_id));
    if let Some(user_id) = f.user_id {
        q.and_where(Expr::col((Attendance::Table, Attendance::UserId)).eq(user_id));
    }
    if let Some(from) = f.from {
        q.and_where(Expr::col((Attendance::Table, Attendance::ShiftDate)).gte(from));
    }
    if let Some(to) = f.to {
        q.and_where(Expr::col((Attendance::Table, Attendance::ShiftDate)).lte(to));
    }
    q.order_by((Attendance::Table, Attendance::ShiftDate), Order::Desc)
        .order_by((Attendance::Table, Attendance::StartTime), Order::Desc)
        .build(SqliteQueryBuilder)
}

/// Open shifts as (id, shift_date, start_time). `None` scans every workspace.
pub fn open_shifts(workspace_id: Option<&str>) -> Built {
    let mut q = Query::select().to_owned();
    q.columns([Attendance::Id, Attendance::ShiftDate, Attendance::StartTime])
        .from(Attendance::Table)
        .and_where(Expr::col(Attendance::Status).eq(IN_PROGRESS));
    if let Some(ws) = workspace_id {
        q.and_where(Expr::col(Attendance::WorkspaceId).eq(ws));
    }
    q.build(SqliteQueryBuilder)
}

/// Close an in-progress shift. Matches nothing if the shift was already closed.
pub fn close(
    id: &str,
    end_time: &str,
    total_minutes: i64,
    status: &str,
    end_activity: Option<&str>,
    daily_tasks: Option<&str>,
) -> Built {
    let mut q = Query::update();
    q.table(Attendance::Table)
        .value(Attendance::EndTime, end_time)
        .value(Attendance::TotalMinutes, total_minutes)
        .value(Attendance::Status, status)
        .value(Attendance::EndActivity, end_activity.map(|s| s.to_string()));
    if let Some(tasks) = daily_tasks {
        q.value(Attendance::DailyTasks, tasks);
    }
    q.and_where(Expr::col(Attendance::Id).eq(id))
        .and_where(Expr::col(Attendance::Status).eq(IN_PROGRESS))
        .build(SqliteQueryBuilder)
}
