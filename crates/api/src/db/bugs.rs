//! Bug query builders.

use sea_query::{Alias, Expr, JoinType, Order, Query, SelectStatement, SqliteQueryBuilder};

use super::tables::{Bugs, Users};
use super::{Built, now_expr};

fn reporter() -> Alias {
    Alias::new("reporter")
}

fn assignee() -> Alias {
    Alias::new("assignee")
}

/// SELECT id, workspace_id, project_id, title, description, bug_type,
/// priority, status, reported_by, reporter_name, assigned_to, assignee_name,
/// metadata, created_at, updated_at
fn bug_select(q: &mut SelectStatement) -> &mut SelectStatement {
    q.column((Bugs::Table, Bugs::Id))
        .column((Bugs::Table, Bugs::WorkspaceId))
        .column((Bugs::Table, Bugs::ProjectId))
        .column((Bugs::Table, Bugs::Title))
        .column((Bugs::Table, Bugs::Description))
        .column((Bugs::Table, Bugs::BugType))
        .column((Bugs::Table, Bugs::Priority))
        .column((Bugs::Table, Bugs::Status))
        .column((Bugs::Table, Bugs::ReportedBy))
        .column((reporter(), Users::Name))
        .column((Bugs::Table, Bugs::AssignedTo))
        .column((assignee(), Users::Name))
        .column((Bugs::Table, Bugs::Metadata))
        .column((Bugs::Table, Bugs::CreatedAt))
        .column((Bugs::Table, Bugs::UpdatedAt))
        .from(Bugs::Table)
        .join_as(
            JoinType::InnerJoin,
            Users::Table,
            reporter(),
            Expr::col((reporter(), Users::Id)).equals((Bugs::Table, Bugs::ReportedBy)),
        )
        .join_as(
            JoinType::LeftJoin,
            Users::Table,
            assignee(),
            Expr::col((assignee(), Users::Id)).equals((Bugs::Table, Bugs::AssignedTo)),
        )
}

pub struct NewBug<'a> {
    pub id: &'a str,
    pub workspace_id: &'a str,
    pub project_id: Option<&'a str>,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub bug_type: &'a str,
    pub priority: &'a str,
    pub status: &'a str,
    pub reported_by: &'a str,
    pub assigned_to: Option<&'a str>,
    /// JSON object text.
    pub metadata: &'a str,
}

pub fn insert(b: &NewBug<'_>) -> Built {
    let owned = |s: Option<&str>| s.map(|s| s.to_string());
    Query::insert()
        .into_table(Bugs::Table)
        .columns([
            Bugs::Id,
            Bugs::WorkspaceId,
            Bugs::ProjectId,
            Bugs::Title,
            Bugs::Description,
            Bugs::BugType,
            Bugs::Priority,
            Bugs::Status,
            Bugs::ReportedBy,
            Bugs::AssignedTo,
            Bugs::Metadata,
        ])
        .values_panic([
            b.id.into(),
            b.workspace_id.into(),
            owned(b.project_id).into(),
            b.title.into(),
            owned(b.description).into(),
            b.bug_type.into(),
            b.priority.into(),
            b.status.into(),
            b.reported_by.into(),
            owned(b.assigned_to).into(),
            b.metadata.into(),
        ])
        .build(SqliteQueryBuilder)
}

pub fn get_by_id(id: &str) -> Built {
    let mut q = Query::select().to_owned();
    bug_select(&mut q);
    q.and_where(Expr::col((Bugs::Table, Bugs::Id)).eq(id))
        .build(SqliteQueryBuilder)
}

/// Filters for [`list`]. With `involving_user`, only bugs that user reported
/// or is assigned to.
#[derive(Debug, Default)]
pub struct BugFilter<'a> {
    pub workspace_id: &'a str,
    pub status: Option<&'a str>,
    pub assigned_to: Option<&'a str>,
    pub project_id: Option<&'a str>,
    pub involving_user: Option<&'a str>,
}

pub fn list(f: &BugFilter<'_>) -> Built {
    let mut q = Query::select().to_owned();
    bug_select(&mut q);
    q.and_where(Expr::col((Bugs::Table, Bugs::WorkspaceId)).eq(f.workspace_id));
    let optional = [
        (Bugs::Status, f.status),
        (Bugs::AssignedTo, f.assigned_to),
        (Bugs::ProjectId, f.project_id),
    ];
    for (column, value) in optional {
        if let Some(v) = value {
            q.and_where(Expr::col((Bugs::Table, column)).eq(v));
        }
    }
    if let Some(user_id) = f.involving_user {
        q.and_where(
            Expr::col((Bugs::Table, Bugs::ReportedBy))
                .eq(user_id)
                .or(Expr::col((Bugs::Table, Bugs::AssignedTo)).eq(user_id)),
        );
    }
    q.order_by((Bugs::Table, Bugs::CreatedAt), Order::Desc)
        .build(SqliteQueryBuilder)
}

/// Column changes for [`update`]. `Some(None)` clears a nullable column.
#[derive(Debug, Default)]
pub struct BugPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub bug_type: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub project_id: Option<Option<String>>,
    pub assigned_to: Option<Option<String>>,
    pub metadata: Option<String>,
}

pub fn update(id: &str, patch: BugPatch) -> Built {
    let mut q = Query::update();
    q.table(Bugs::Table);
    if let Some(v) = patch.title {
        q.value(Bugs::Title, v);
    }
    if let Some(v) = patch.description {
        q.value(Bugs::Description, v);
    }
    if let Some(v) = patch.bug_type {
        q.value(Bugs::BugType, v);
    }
    if let Some(v) = patch.priority {
        q.value(Bugs::Priority, v);
    }
    if let Some(v) = patch.status {
        q.value(Bugs::Status, v);
    }
    if let Some(v) = patch.project_id {
        q.value(Bugs::ProjectId, v);
    }
    if let Some(v) = patch.assigned_to {
        q.value(Bugs::AssignedTo, v);
    }
    if let Some(v) = patch.metadata {
        q.value(Bugs::Metadata, v);
    }
    q.value(Bugs::UpdatedAt, now_expr())
        .and_where(Expr::col(Bugs::Id).eq(id))
        .build(SqliteQueryBuilder)
}

pub fn delete(id: &str) -> Built {
    Query::delete()
        .from_table(Bugs::Table)
        .and_where(Expr::col(Bugs::Id).eq(id))
        .build(SqliteQueryBuilder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_aliases_both_user_joins() {
        let (sql, _) = get_by_id("b1");
        assert!(sql.contains(r#"INNER JOIN "users" AS "reporter""#), "{sql}");
        assert!(sql.contains(r#"LEFT JOIN "users" AS "assignee""#), "{sql}");
    }

    #[test]
    fn test_non_admin_listing_matches_reporter_or_assignee() {
        let (sql, values) = list(&BugFilter {
            workspace_id: "w1",
            involving_user: Some("u1"),
            ..Default::default()
        });
        assert!(
            sql.contains(r#""bugs"."reported_by" = ? OR "bugs"."assigned_to" = ?"#),
            "{sql}"
        );
        assert_eq!(values.0.len(), 3);
    }
}
