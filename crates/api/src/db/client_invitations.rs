//! Client invitation query builders.

use sea_query::{Alias, Asterisk, Expr, Func, Order, Query, SelectStatement, SqliteQueryBuilder};

use super::Built;
use super::tables::{ClientInvitations, Projects, Workspaces};

/// id, workspace_id, project_id, email, status, invited_by, expires_at,
/// accepted_at, created_at
fn invitation_columns(q: &mut SelectStatement) -> &mut SelectStatement {
    q.column((ClientInvitations::Table, ClientInvitations::Id))
        .column((ClientInvitations::Table, ClientInvitations::WorkspaceId))
        .column((ClientInvitations::Table, ClientInvitations::ProjectId))
        .column((ClientInvitations::Table, ClientInvitations::Email))
        .column((ClientInvitations::Table, ClientInvitations::Status))
        .column((ClientInvitations::Table, ClientInvitations::InvitedBy))
        .column((ClientInvitations::Table, ClientInvitations::ExpiresAt))
        .column((ClientInvitations::Table, ClientInvitations::AcceptedAt))
        .column((ClientInvitations::Table, ClientInvitations::CreatedAt))
}

pub fn insert(
    id: &str,
    workspace_id: &str,
    project_id: &str,
    email: &str,
    token_hash: &str,
    invited_by: &str,
    expires_at: &str,
) -> Built {
    Query::insert()
        .into_table(ClientInvitations::Table)
        .columns([
            ClientInvitations::Id,
            ClientInvitations::WorkspaceId,
            ClientInvitations::ProjectId,
            ClientInvitations::Email,
            ClientInvitations::TokenHash,
            ClientInvitations::InvitedBy,
            ClientInvitations::Status,
            ClientInvitations::ExpiresAt,
        ])
        .values_panic([
            id.into(),
            workspace_id.into(),
            project_id.into(),
            email.into(),
            token_hash.into(),
            invited_by.into(),
            "PENDING".into(),
            expires_at.into(),
        ])
        .build(SqliteQueryBuilder)
}

pub fn get_by_id(id: &str) -> Built {
    let mut q = Query::select().to_owned();
    invitation_columns(&mut q);
    q.from(ClientInvitations::Table)
        .and_where(Expr::col((ClientInvitations::Table, ClientInvitations::Id)).eq(id))
        .build(SqliteQueryBuilder)
}

pub fn list_by_project(project_id: &str) -> Built {
    let mut q = Query::select().to_owned();
    invitation_columns(&mut q);
    q.from(ClientInvitations::Table)
        .and_where(
            Expr::col((ClientInvitations::Table, ClientInvitations::ProjectId)).eq(project_id),
        )
        .order_by(
            (ClientInvitations::Table, ClientInvitations::CreatedAt),
            Order::Desc,
        )
        .build(SqliteQueryBuilder)
}

/// Count pending, unexpired invitations for an email on a project.
pub fn pending_count(project_id: &str, email: &str, now: &str) -> Built {
    Query::select()
        .expr_as(Func::count(Expr::col(Asterisk)), Alias::new("count"))
        .from(ClientInvitations::Table)
        .and_where(Expr::col(ClientInvitations::ProjectId).eq(project_id))
        .and_where(Expr::col(ClientInvitations::Email).eq(email))
        .and_where(Expr::col(ClientInvitations::Status).eq("PENDING"))
        .and_where(Expr::col(ClientInvitations::ExpiresAt).gte(now))
        .build(SqliteQueryBuilder)
}

/// Invitation columns followed by project name and workspace name.
pub fn get_by_token_hash(token_hash: &str) -> Built {
    let mut q = Query::select().to_owned();
    invitation_columns(&mut q);
    q.column((Projects::Table, Projects::Name))
        .column((Workspaces::Table, Workspaces::Name))
        .from(ClientInvitations::Table)
        .inner_join(
            Projects::Table,
            Expr::col((Projects::Table, Projects::Id))
                .equals((ClientInvitations::Table, ClientInvitations::ProjectId)),
        )
        .inner_join(
            Workspaces::Table,
            Expr::col((Workspaces::Table, Workspaces::Id))
                .equals((ClientInvitations::Table, ClientInvitations::WorkspaceId)),
        )
        .and_where(
            Expr::col((ClientInvitations::Table, ClientInvitations::TokenHash)).eq(token_hash),
        )
        .build(SqliteQueryBuilder)
}

pub fn mark_accepted(id: &str, user_id: &str, accepted_at: &str) -> Built {
    Query::update()
        .table(ClientInvitations::Table)
        .value(ClientInvitations::Status, "ACCEPTED")
        .value(ClientInvitations::AcceptedBy, user_id)
        .value(ClientInvitations::AcceptedAt, accepted_at)
        .and_where(Expr::col(ClientInvitations::Id).eq(id))
        .and_where(Expr::col(ClientInvitations::Status).eq("PENDING"))
        .build(SqliteQueryBuilder)
}

pub fn revoke(id: &str) -> Built {
    Query::update()
        .table(ClientInvitations::Table)
        .value(ClientInvitations::Status, "REVOKED")
        .and_where(Expr::col(ClientInvitations::Id).eq(id))
        .and_where(Expr::col(ClientInvitations::Status).eq("PENDING"))
        .build(SqliteQueryBuilder)
}
