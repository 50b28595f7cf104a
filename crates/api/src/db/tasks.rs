//! Task query builders.

use sea_query::{Expr, Func, Order, Query, SelectStatement, SqliteQueryBuilder};

use super::tables::{Projects, Tasks, Users};
use super::{Built, now_expr, projects};

// ── Task select helper ────────────────────────────────────────────────────

/// SELECT id, workspace_id, project_id, project_name, name, description,
/// status, priority, assignee_id, assignee_name, due_date, position,
/// estimated_hours, labels, created_by, completed_at, created_at, updated_at
fn task_select(q: &mut SelectStatement) -> &mut SelectStatement {
    q.column((Tasks::Table, Tasks::Id))
        .column((Tasks::Table, Tasks::WorkspaceId))
        .column((Tasks::Table, Tasks::ProjectId))
        .column((Projects::Table, Projects::Name))
        .column((Tasks::Table, Tasks::Name))
        .column((Tasks::Table, Tasks::Description))
        .column((Tasks::Table, Tasks::Status))
        .column((Tasks::Table, Tasks::Priority))
        .column((Tasks::Table, Tasks::AssigneeId))
        .column((Users::Table, Users::Name))
        .column((Tasks::Table, Tasks::DueDate))
        .column((Tasks::Table, Tasks::Position))
        .column((Tasks::Table, Tasks::EstimatedHours))
        .column((Tasks::Table, Tasks::Labels))
        .column((Tasks::Table, Tasks::CreatedBy))
        .column((Tasks::Table, Tasks::CompletedAt))
        .column((Tasks::Table, Tasks::CreatedAt))
        .column((Tasks::Table, Tasks::UpdatedAt))
        .from(Tasks::Table)
        .inner_join(
            Projects::Table,
            Expr::col((Projects::Table, Projects::Id)).equals((Tasks::Table, Tasks::ProjectId)),
        )
        .left_join(
            Users::Table,
            Expr::col((Users::Table, Users::Id)).equals((Tasks::Table, Tasks::AssigneeId)),
        )
}

// ── Inserts ───────────────────────────────────────────────────────────────

pub struct NewTask<'a> {
    pub id: &'a str,
    pub workspace_id: &'a str,
    pub project_id: &'a str,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub status: &'a str,
    pub priority: &'a str,
    pub assignee_id: Option<&'a str>,
    pub due_date: Option<&'a str>,
    pub position: i64,
    pub estimated_hours: Option<f64>,
    /// JSON array text.
    pub labels: &'a str,
    pub created_by: &'a str,
    pub completed_at: Option<&'a str>,
}

pub fn insert(t: &NewTask<'_>) -> Built {
    let owned = |s: Option<&str>| s.map(|s| s.to_string());
    Query::insert()
        .into_table(Tasks::Table)
        .columns([
            Tasks::Id,
            Tasks::WorkspaceId,
            Tasks::ProjectId,
            Tasks::Name,
            Tasks::Description,
            Tasks::Status,
            Tasks::Priority,
            Tasks::AssigneeId,
            Tasks::DueDate,
            Tasks::Position,
            Tasks::EstimatedHours,
            Tasks::Labels,
            Tasks::CreatedBy,
            Tasks::CompletedAt,
        ])
        .values_panic([
            t.id.into(),
            t.workspace_id.into(),
            t.project_id.into(),
            t.name.into(),
            owned(t.description).into(),
            t.status.into(),
            t.priority.into(),
            owned(t.assignee_id).into(),
            owned(t.due_date).into(),
            t.position.into(),
            t.estimated_hours.into(),
            t.labels.into(),
            t.created_by.into(),
            owned(t.completed_at).into(),
        ])
        .build(SqliteQueryBuilder)
}

// ── Lookups ───────────────────────────────────────────────────────────────

pub fn get_by_id(id: &str) -> Built {
    let mut q = Query::select().to_owned();
    task_select(&mut q);
    q.and_where(Expr::col((Tasks::Table, Tasks::Id)).eq(id))
        .build(SqliteQueryBuilder)
}

/// Filters for [`list`]. `client_user_id` restricts results to projects
/// granted to that client.
#[derive(Debug, Default)]
pub struct TaskFilter<'a> {
    pub workspace_id: &'a str,
    pub project_id: Option<&'a str>,
    pub assignee_id: Option<&'a str>,
    pub status: Option<&'a str>,
    pub priority: Option<&'a str>,
    pub search: Option<&'a str>,
    pub due_on_or_before: Option<&'a str>,
    pub client_user_id: Option<&'a str>,
}

pub fn list(f: &TaskFilter<'_>) -> Built {
    let mut q = Query::select().to_owned();
    task_select(&mut q);
    q.and_where(Expr::col((Tasks::Table, Tasks::WorkspaceId)).eq(f.workspace_id));
    let optional = [
        (Tasks::ProjectId, f.project_id),
        (Tasks::AssigneeId, f.assignee_id),
        (Tasks::Status, f.status),
        (Tasks::Priority, f.priority),
    ];
    for (column, value) in optional {
        if let Some(v) = value {
            q.and_where(Expr::col((Tasks::Table, column)).eq(v));
        }
    }
    if let Some(due) = f.due_on_or_before {
        q.and_where(Expr::col((Tasks::Table, Tasks::DueDate)).lte(due));
    }
    if let Some(term) = f.search.map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{term}%");
        q.and_where(
            Expr::col((Tasks::Table, Tasks::Name))
                .like(pattern.as_str())
                .or(Expr::col((Tasks::Table, Tasks::Description)).like(pattern.as_str())),
        );
    }
    if let Some(user_id) = f.client_user_id {
        q.and_where(
            Expr::col((Tasks::Table, Tasks::ProjectId))
                .in_subquery(projects::granted_project_ids(user_id)),
        );
    }
    q.order_by((Tasks::Table, Tasks::Position), Order::Asc)
        .order_by((Tasks::Table, Tasks::CreatedAt), Order::Desc)
        .build(SqliteQueryBuilder)
}

/// Highest position in a project's status column (NULL when empty).
pub fn max_position(project_id: &str, status: &str) -> Built {
    Query::select()
        .expr(Func::max(Expr::col(Tasks::Position)))
        .from(Tasks::Table)
        .and_where(Expr::col(Tasks::ProjectId).eq(project_id))
        .and_where(Expr::col(Tasks::Status).eq(status))
        .build(SqliteQueryBuilder)
}

/// Rows for report aggregation: id, status, priority, assignee_id,
/// assignee_name, due_date, created_at, completed_at.
pub fn report_rows(workspace_id: &str, project_id: Option<&str>) -> Built {
    let mut q = Query::select().to_owned();
    q.column((Tasks::Table, Tasks::Id))
        .column((Tasks::Table, Tasks::Status))
        .column((Tasks::Table, Tasks::Priority))
        .column((Tasks::Table, Tasks::AssigneeId))
        .column((Users::Table, Users::Name))
        .column((Tasks::Table, Tasks::DueDate))
        .column((Tasks::Table, Tasks::CreatedAt))
        .column((Tasks::Table, Tasks::CompletedAt))
        .from(Tasks::Table)
        .left_join(
            Users::Table,
            Expr::col((Users::Table, Users::Id)).equals((Tasks::Table, Tasks::AssigneeId)),
        )
        .and_where(Expr::col((Tasks::Table, Tasks::WorkspaceId)).eq(workspace_id));
    if let Some(p) = project_id {
        q.and_where(Expr::col((Tasks::Table, Tasks::ProjectId)).eq(p));
    }
    q.build(SqliteQueryBuilder)
}

// ── Updates ───────────────────────────────────────────────────────────────

/// Column changes for [`update`]. `None` leaves a column untouched;
/// `Some(None)` clears a nullable column.
#[derive(Debug, Default)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub assignee_id: Option<Option<String>>,
    pub due_date: Option<Option<String>>,
    pub estimated_hours: Option<Option<f64>>,
    pub labels: Option<String>,
    pub position: Option<i64>,
    pub completed_at: Option<Option<String>>,
}

pub fn update(id: &str, patch: TaskPatch) -> Built {
    let mut q = Query::update();
    q.table(Tasks::Table);
    if let Some(v) = patch.name {
        q.value(Tasks::Name, v);
    }
    if let Some(v) = patch.description {
        q.value(Tasks::Description, v);
    }
    if let Some(v) = patch.status {
        q.value(Tasks::Status, v);
    }
    if let Some(v) = patch.priority {
        q.value(Tasks::Priority, v);
    }
    if let Some(v) = patch.assignee_id {
        q.value(Tasks::AssigneeId, v);
    }
    if let Some(v) = patch.due_date {
        q.value(Tasks::DueDate, v);
    }
    if let Some(v) = patch.estimated_hours {
        q.value(Tasks::EstimatedHours, v);
    }
    if let Some(v) = patch.labels {
        q.value(Tasks::Labels, v);
    }
    if let Some(v) = patch.position {
        q.value(Tasks::Position, v);
    }
    if let Some(v) = patch.completed_at {
        q.value(Tasks::CompletedAt, v);
    }
    q.value(Tasks::UpdatedAt, now_expr())
        .and_where(Expr::col(Tasks::Id).eq(id))
        .build(SqliteQueryBuilder)
}

pub fn delete(id: &str) -> Built {
    Query::delete()
        .from_table(Tasks::Table)
        .and_where(Expr::col(Tasks::Id).eq(id))
        .build(SqliteQueryBuilder)
}
