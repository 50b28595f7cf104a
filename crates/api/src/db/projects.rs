//! Project + client-grant query builders.

use sea_query::{
    Alias, Asterisk, Expr, Func, OnConflict, Order, Query, SelectStatement, SqliteQueryBuilder,
};

use super::tables::{ProjectClients, Projects};
use super::{Built, now_expr};

/// id, workspace_id, name, description, created_by, created_at, updated_at
fn project_columns(q: &mut SelectStatement) -> &mut SelectStatement {
    q.column((Projects::Table, Projects::Id))
        .column((Projects::Table, Projects::WorkspaceId))
        .column((Projects::Table, Projects::Name))
        .column((Projects::Table, Projects::Description))
        .column((Projects::Table, Projects::CreatedBy))
        .column((Projects::Table, Projects::CreatedAt))
        .column((Projects::Table, Projects::UpdatedAt))
}

pub fn insert(
    id: &str,
    workspace_id: &str,
    name: &str,
    description: Option<&str>,
    created_by: &str,
) -> Built {
    Query::insert()
        .into_table(Projects::Table)
        .columns([
            Projects::Id,
            Projects::WorkspaceId,
            Projects::Name,
            Projects::Description,
            Projects::CreatedBy,
        ])
        .values_panic([
            id.into(),
            workspace_id.into(),
            name.into(),
            description.map(|s| s.to_string()).into(),
            created_by.into(),
        ])
        .build(SqliteQueryBuilder)
}

pub fn get_by_id(id: &str) -> Built {
    let mut q = Query::select().to_owned();
    project_columns(&mut q);
    q.from(Projects::Table)
        .and_where(Expr::col((Projects::Table, Projects::Id)).eq(id))
        .build(SqliteQueryBuilder)
}

/// All projects in a workspace. With `client_user_id`, only projects
/// granted to that client.
pub fn list(workspace_id: &str, client_user_id: Option<&str>) -> Built {
    let mut q = Query::select().to_owned();
    project_columns(&mut q);
    q.from(Projects::Table)
        .and_where(Expr::col((Projects::Table, Projects::WorkspaceId)).eq(workspace_id));
    if let Some(user_id) = client_user_id {
        q.and_where(
            Expr::col((Projects::Table, Projects::Id)).in_subquery(granted_project_ids(user_id)),
        );
    }
    q.order_by((Projects::Table, Projects::CreatedAt), Order::Desc)
        .build(SqliteQueryBuilder)
}

pub fn update_name(id: &str, name: &str) -> Built {
    Query::update()
        .table(Projects::Table)
        .value(Projects::Name, name)
        .value(Projects::UpdatedAt, now_expr())
        .and_where(Expr::col(Projects::Id).eq(id))
        .build(SqliteQueryBuilder)
}

pub fn update_description(id: &str, description: Option<&str>) -> Built {
    Query::update()
        .table(Projects::Table)
        .value(Projects::Description, description.map(|s| s.to_string()))
        .value(Projects::UpdatedAt, now_expr())
        .and_where(Expr::col(Projects::Id).eq(id))
        .build(SqliteQueryBuilder)
}

/// Tasks and client invitations go with the project through FK cascades.
pub fn delete(id: &str) -> Built {
    Query::delete()
        .from_table(Projects::Table)
        .and_where(Expr::col(Projects::Id).eq(id))
        .build(SqliteQueryBuilder)
}

// ── Client grants ─────────────────────────────────────────────────────────

/// Subquery: project ids a client user was granted.
pub fn granted_project_ids(user_id: &str) -> SelectStatement {
    Query::select()
        .column(ProjectClients::ProjectId)
        .from(ProjectClients::Table)
        .and_where(Expr::col(ProjectClients::UserId).eq(user_id))
        .to_owned()
}

pub fn grant_client(project_id: &str, user_id: &str) -> Built {
    Query::insert()
        .into_table(ProjectClients::Table)
        .columns([ProjectClients::ProjectId, ProjectClients::UserId])
        .values_panic([project_id.into(), user_id.into()])
        .on_conflict(
            OnConflict::columns([ProjectClients::ProjectId, ProjectClients::UserId])
                .do_nothing()
                .to_owned(),
        )
        .build(SqliteQueryBuilder)
}

pub fn client_grant_count(project_id: &str, user_id: &str) -> Built {
    Query::select()
        .expr_as(Func::count(Expr::col(Asterisk)), Alias::new("count"))
        .from(ProjectClients::Table)
        .and_where(Expr::col(ProjectClients::ProjectId).eq(project_id))
        .and_where(Expr::col(ProjectClients::UserId).eq(user_id))
        .build(SqliteQueryBuilder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_listing_is_restricted_to_grants() {
        let (staff_sql, staff_values) = list("w1", None);
        assert!(!staff_sql.contains("project_clients"));
        assert_eq!(staff_values.0.len(), 1);

        let (client_sql, client_values) = list("w1", Some("u1"));
        assert!(
            client_sql.contains(r#""projects"."id" IN (SELECT "project_id" FROM "project_clients""#),
            "{client_sql}"
        );
        assert_eq!(client_values.0.len(), 2);
    }

    #[test]
    fn test_grant_is_idempotent() {
        let (sql, _) = grant_client("p1", "u1");
        assert!(sql.contains("ON CONFLICT"), "{sql}");
        assert!(sql.contains("DO NOTHING"), "{sql}");
    }
}
