//! Workspace + member query builders.

use sea_query::{Alias, Asterisk, Expr, Func, Order, Query, SelectStatement, SqliteQueryBuilder};

use super::tables::{Members, Users, Workspaces};
use super::{Built, now_expr};

// ── Workspace columns helper ──────────────────────────────────────────────

/// id, name, description, invite_code, created_by, created_at, updated_at
fn workspace_columns(q: &mut SelectStatement) -> &mut SelectStatement {
    q.column((Workspaces::Table, Workspaces::Id))
        .column((Workspaces::Table, Workspaces::Name))
        .column((Workspaces::Table, Workspaces::Description))
        .column((Workspaces::Table, Workspaces::InviteCode))
        .column((Workspaces::Table, Workspaces::CreatedBy))
        .column((Workspaces::Table, Workspaces::CreatedAt))
        .column((Workspaces::Table, Workspaces::UpdatedAt))
}

// ── Workspace queries ─────────────────────────────────────────────────────

pub fn insert(
    id: &str,
    name: &str,
    description: Option<&str>,
    invite_code: &str,
    created_by: &str,
) -> Built {
    Query::insert()
        .into_table(Workspaces::Table)
        .columns([
            Workspaces::Id,
            Workspaces::Name,
            Workspaces::Description,
            Workspaces::InviteCode,
            Workspaces::CreatedBy,
        ])
        .values_panic([
            id.into(),
            name.into(),
            description.map(|s| s.to_string()).into(),
            invite_code.into(),
            created_by.into(),
        ])
        .build(SqliteQueryBuilder)
}

pub fn get_by_id(id: &str) -> Built {
    let mut q = Query::select().to_owned();
    workspace_columns(&mut q);
    q.from(Workspaces::Table)
        .and_where(Expr::col((Workspaces::Table, Workspaces::Id)).eq(id))
        .build(SqliteQueryBuilder)
}

/// Workspaces the user is a member of, newest first.
pub fn list_for_user(user_id: &str) -> Built {
    let mut q = Query::select().to_owned();
    workspace_columns(&mut q);
    q.from(Workspaces::Table)
        .inner_join(
            Members::Table,
            Expr::col((Members::Table, Members::WorkspaceId))
                .equals((Workspaces::Table, Workspaces::Id)),
        )
        .and_where(Expr::col((Members::Table, Members::UserId)).eq(user_id))
        .order_by((Workspaces::Table, Workspaces::CreatedAt), Order::Desc)
        .build(SqliteQueryBuilder)
}

pub fn update_name(id: &str, name: &str) -> Built {
    Query::update()
        .table(Workspaces::Table)
        .value(Workspaces::Name, name)
        .value(Workspaces::UpdatedAt, now_expr())
        .and_where(Expr::col(Workspaces::Id).eq(id))
        .build(SqliteQueryBuilder)
}

pub fn update_description(id: &str, description: Option<&str>) -> Built {
    Query::update()
        .table(Workspaces::Table)
        .value(Workspaces::Description, description.map(|s| s.to_string()))
        .value(Workspaces::UpdatedAt, now_expr())
        .and_where(Expr::col(Workspaces::Id).eq(id))
        .build(SqliteQueryBuilder)
}

pub fn update_invite_code(id: &str, invite_code: &str) -> Built {
    Query::update()
        .table(Workspaces::Table)
        .value(Workspaces::InviteCode, invite_code)
        .value(Workspaces::UpdatedAt, now_expr())
        .and_where(Expr::col(Workspaces::Id).eq(id))
        .build(SqliteQueryBuilder)
}

pub fn delete(id: &str) -> Built {
    Query::delete()
        .from_table(Workspaces::Table)
        .and_where(Expr::col(Workspaces::Id).eq(id))
        .build(SqliteQueryBuilder)
}

// ── Member columns helper ─────────────────────────────────────────────────

/// SELECT id, workspace_id, user_id, name, email, role, joined_at FROM members JOIN users
fn member_select(q: &mut SelectStatement) -> &mut SelectStatement {
    q.column((Members::Table, Members::Id))
        .column((Members::Table, Members::WorkspaceId))
        .column((Members::Table, Members::UserId))
        .column((Users::Table, Users::Name))
        .column((Users::Table, Users::Email))
        .column((Members::Table, Members::Role))
        .column((Members::Table, Members::JoinedAt))
        .from(Members::Table)
        .inner_join(
            Users::Table,
            Expr::col((Users::Table, Users::Id)).equals((Members::Table, Members::UserId)),
        )
}

// ── Member queries ────────────────────────────────────────────────────────

pub fn member_insert(id: &str, workspace_id: &str, user_id: &str, role: &str) -> Built {
    Query::insert()
        .into_table(Members::Table)
        .columns([
            Members::Id,
            Members::WorkspaceId,
            Members::UserId,
            Members::Role,
        ])
        .values_panic([id.into(), workspace_id.into(), user_id.into(), role.into()])
        .build(SqliteQueryBuilder)
}

/// Role of a user within a workspace.
pub fn member_role(workspace_id: &str, user_id: &str) -> Built {
    Query::select()
        .column(Members::Role)
        .from(Members::Table)
        .and_where(Expr::col(Members::WorkspaceId).eq(workspace_id))
        .and_where(Expr::col(Members::UserId).eq(user_id))
        .build(SqliteQueryBuilder)
}

pub fn member_get(member_id: &str) -> Built {
    let mut q = Query::select().to_owned();
    member_select(&mut q);
    q.and_where(Expr::col((Members::Table, Members::Id)).eq(member_id))
        .build(SqliteQueryBuilder)
}

pub fn member_list(workspace_id: &str) -> Built {
    let mut q = Query::select().to_owned();
    member_select(&mut q);
    q.and_where(Expr::col((Members::Table, Members::WorkspaceId)).eq(workspace_id))
        .order_by((Members::Table, Members::JoinedAt), Order::Asc)
        .order_by((Users::Table, Users::Name), Order::Asc)
        .build(SqliteQueryBuilder)
}

pub fn member_count(workspace_id: &str) -> Built {
    Query::select()
        .expr_as(Func::count(Expr::col(Asterisk)), Alias::new("count"))
        .from(Members::Table)
        .and_where(Expr::col(Members::WorkspaceId).eq(workspace_id))
        .build(SqliteQueryBuilder)
}

pub fn admin_count(workspace_id: &str) -> Built {
    Query::select()
        .expr_as(Func::count(Expr::col(Asterisk)), Alias::new("count"))
        .from(Members::Table)
        .and_where(Expr::col(Members::WorkspaceId).eq(workspace_id))
        .and_where(Expr::col(Members::Role).eq("ADMIN"))
        .build(SqliteQueryBuilder)
}

/// User ids of a workspace's admins.
pub fn admin_user_ids(workspace_id: &str) -> Built {
    Query::select()
        .column(Members::UserId)
        .from(Members::Table)
        .and_where(Expr::col(Members::WorkspaceId).eq(workspace_id))
        .and_where(Expr::col(Members::Role).eq("ADMIN"))
        .build(SqliteQueryBuilder)
}

/// Resolve a member's user id by email (used by CSV import).
pub fn member_user_id_by_email(workspace_id: &str, email: &str) -> Built {
    Query::select()
        .column((Users::Table, Users::Id))
        .from(Members::Table)
        .inner_join(
            Users::Table,
            Expr::col((Users::Table, Users::Id)).equals((Members::Table, Members::UserId)),
        )
        .and_where(Expr::col((Members::Table, Members::WorkspaceId)).eq(workspace_id))
        .and_where(Expr::col((Users::Table, Users::Email)).eq(email))
        .build(SqliteQueryBuilder)
}

pub fn member_update_role(member_id: &str, role: &str) -> Built {
    Query::update()
        .table(Members::Table)
        .value(Members::Role, role)
        .and_where(Expr::col(Members::Id).eq(member_id))
        .build(SqliteQueryBuilder)
}

pub fn member_delete(member_id: &str) -> Built {
    Query::delete()
        .from_table(Members::Table)
        .and_where(Expr::col(Members::Id).eq(member_id))
        .build(SqliteQueryBuilder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_list_joins_users() {
        let (sql, values) = member_list("w1");
        assert!(sql.contains(r#"INNER JOIN "users""#), "{sql}");
        assert!(sql.contains(r#"ORDER BY "members"."joined_at" ASC"#), "{sql}");
        assert_eq!(values.0.len(), 1);
    }

    #[test]
    fn test_update_touches_updated_at() {
        let (sql, _) = update_name("w1", "Ops");
        assert!(sql.contains(r#""updated_at" = CURRENT_TIMESTAMP"#), "{sql}");
    }
}
