//! Weekly report query builders.

use sea_query::{Expr, Order, Query, SelectStatement, SqliteQueryBuilder};

use super::tables::{Users, WeeklyReports};
use super::{Built, now_expr};

/// SELECT id, workspace_id, user_id, user_name, from_date, to_date,
/// department, summary, task_details, is_draft, created_at, updated_at
fn report_select(q: &mut SelectStatement) -> &mut SelectStatement {
    q.column((WeeklyReports::Table, WeeklyReports::Id))
        .column((WeeklyReports::Table, WeeklyReports::WorkspaceId))
        .column((WeeklyReports::Table, WeeklyReports::UserId))
        .column((Users::Table, Users::Name))
        .column((WeeklyReports::Table, WeeklyReports::FromDate))
        .column((WeeklyReports::Table, WeeklyReports::ToDate))
        .column((WeeklyReports::Table, WeeklyReports::Department))
        .column((WeeklyReports::Table, WeeklyReports::Summary))
        .column((WeeklyReports::Table, WeeklyReports::TaskDetails))
        .column((WeeklyReports::Table, WeeklyReports::IsDraft))
        .column((WeeklyReports::Table, WeeklyReports::CreatedAt))
        .column((WeeklyReports::Table, WeeklyReports::UpdatedAt))
        .from(WeeklyReports::Table)
        .inner_join(
            Users::Table,
            Expr::col((Users::Table, Users::Id))
                .equals((WeeklyReports::Table, WeeklyReports::UserId)),
        )
}

pub struct NewWeeklyReport<'a> {
    pub id: &'a str,
    pub workspace_id: &'a str,
    pub user_id: &'a str,
    pub from_date: &'a str,
    pub to_date: &'a str,
    pub department: Option<&'a str>,
    pub summary: Option<&'a str>,
    /// JSON array text.
    pub task_details: &'a str,
    pub is_draft: bool,
}

pub fn insert(r: &NewWeeklyReport<'_>) -> Built {
    let owned = |s: Option<&str>| s.map(|s| s.to_string());
    Query::insert()
        .into_table(WeeklyReports::Table)
        .columns([
            WeeklyReports::Id,
            WeeklyReports::WorkspaceId,
            WeeklyReports::UserId,
            WeeklyReports::FromDate,
            WeeklyReports::ToDate,
            WeeklyReports::Department,
            WeeklyReports::Summary,
            WeeklyReports::TaskDetails,
            WeeklyReports::IsDraft,
        ])
        .values_panic([
            r.id.into(),
            r.workspace_id.into(),
            r.user_id.into(),
            r.from_date.into(),
            r.to_date.into(),
            owned(r.department).into(),
            owned(r.summary).into(),
            r.task_details.into(),
            r.is_draft.into(),
        ])
        .build(SqliteQueryBuilder)
}

pub fn get_by_id(id: &str) -> Built {
    let mut q = Query::select().to_owned();
    report_select(&mut q);
    q.and_where(Expr::col((WeeklyReports::Table, WeeklyReports::Id)).eq(id))
        .build(SqliteQueryBuilder)
}

/// Reports in a workspace, optionally for one author, newest period first.
pub fn list(workspace_id: &str, user_id: Option<&str>) -> Built {
    let mut q = Query::select().to_owned();
    report_select(&mut q);
    q.and_where(Expr::col((WeeklyReports::Table, WeeklyReports::WorkspaceId)).eq(workspace_id));
    if let Some(user_id) = user_id {
        q.and_where(Expr::col((WeeklyReports::Table, WeeklyReports::UserId)).eq(user_id));
    }
    q.order_by((WeeklyReports::Table, WeeklyReports::FromDate), Order::Desc)
        .order_by((WeeklyReports::Table, WeeklyReports::CreatedAt), Order::Desc)
        .build(SqliteQueryBuilder)
}

#[derive(Debug, Default)]
pub struct WeeklyReportPatch {
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    pub department: Option<Option<String>>,
    pub summary: Option<Option<String>>,
    pub task_details: Option<String>,
    pub is_draft: Option<bool>,
}

pub fn update(id: &str, patch: WeeklyReportPatch) -> Built {
    let mut q = Query::update();
    q.table(WeeklyReports::Table);
    if let Some(v) = patch.from_date {
        q.value(WeeklyReports::FromDate, v);
    }
    if let Some(v) = patch.to_date {
        q.value(WeeklyReports::ToDate, v);
    }
    if let Some(v) = patch.department {
        q.value(WeeklyReports::Department, v);
    }
    if let Some(v) = patch.summary {
        q.value(WeeklyReports::Summary, v);
    }
    if let Some(v) = patch.task_details {
        q.value(WeeklyReports::TaskDetails, v);
    }
    if let Some(v) = patch.is_draft {
        q.value(WeeklyReports::IsDraft, v);
    }
    q.value(WeeklyReports::UpdatedAt, now_expr())
        .and_where(Expr::col(WeeklyReports::Id).eq(id))
        .build(SqliteQueryBuilder)
}

pub fn delete(id: &str) -> Built {
    Query::delete()
        .from_table(WeeklyReports::Table)
        .and_where(Expr::col(WeeklyReports::Id).eq(id))
        .build(SqliteQueryBuilder)
}
