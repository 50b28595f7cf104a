//! Membership and visibility checks shared by the route handlers.

use rusqlite::Connection;

use taskdeck_api::{ProjectResponse, WorkspaceRole, WorkspaceResponse, db};

use super::ApiResult;
use crate::error::ApiErr;
use crate::storage::{label, project_from_row, sq_count, sq_query_opt, workspace_from_row};

/// The caller's role in a workspace, or `None` if they are not a member.
pub fn member_role(
    conn: &Connection,
    workspace_id: &str,
    user_id: &str,
) -> ApiResult<Option<WorkspaceRole>> {
    sq_query_opt(conn, db::workspaces::member_role(workspace_id, user_id), |row| {
        label::<WorkspaceRole>(row, 0)
    })
    .map_err(ApiErr::from_db("member role lookup"))
}

pub fn load_workspace(conn: &Connection, workspace_id: &str) -> ApiResult<WorkspaceResponse> {
    sq_query_opt(conn, db::workspaces::get_by_id(workspace_id), workspace_from_row)
        .map_err(ApiErr::from_db("workspace lookup"))?
        .ok_or_else(|| ApiErr::not_found("workspace not found"))
}

/// 404 if the workspace does not exist, 403 if the caller is not a member.
pub fn require_member(
    conn: &Connection,
    workspace_id: &str,
    user_id: &str,
) -> ApiResult<WorkspaceRole> {
    load_workspace(conn, workspace_id)?;
    member_role(conn, workspace_id, user_id)?
        .ok_or_else(|| ApiErr::forbidden("not a member of this workspace"))
}

/// ADMIN or MEMBER.
pub fn require_staff(
    conn: &Connection,
    workspace_id: &str,
    user_id: &str,
) -> ApiResult<WorkspaceRole> {
    let role = require_member(conn, workspace_id, user_id)?;
    if !role.is_staff() {
        return Err(ApiErr::forbidden("clients cannot perform this action"));
    }
    Ok(role)
}

pub fn require_admin(conn: &Connection, workspace_id: &str, user_id: &str) -> ApiResult<()> {
    let role = require_member(conn, workspace_id, user_id)?;
    if !role.is_admin() {
        return Err(ApiErr::forbidden("workspace admin only"));
    }
    Ok(())
}

/// Whether a client may see `project_id`. Staff see every project.
pub fn project_visible(
    conn: &Connection,
    project_id: &str,
    user_id: &str,
    role: WorkspaceRole,
) -> ApiResult<bool> {
    if role.is_staff() {
        return Ok(true);
    }
    let grants = sq_count(conn, db::projects::client_grant_count(project_id, user_id))
        .map_err(ApiErr::from_db("client grant lookup"))?;
    Ok(grants > 0)
}

/// Load a project the caller may see, with the caller's workspace role.
///
/// Projects hidden from a client are reported as missing.
pub fn load_project(
    conn: &Connection,
    project_id: &str,
    user_id: &str,
) -> ApiResult<(ProjectResponse, WorkspaceRole)> {
    let project = sq_query_opt(conn, db::projects::get_by_id(project_id), project_from_row)
        .map_err(ApiErr::from_db("project lookup"))?
        .ok_or_else(|| ApiErr::not_found("project not found"))?;
    let role = require_member(conn, &project.workspace_id, user_id)?;
    if !project_visible(conn, &project.id, user_id, role)? {
        return Err(ApiErr::not_found("project not found"));
    }
    Ok((project, role))
}

/// Fail unless `user_id` belongs to the workspace. Used for assignees.
pub fn require_workspace_user(
    conn: &Connection,
    workspace_id: &str,
    user_id: &str,
    field: &str,
) -> ApiResult<()> {
    match member_role(conn, workspace_id, user_id)? {
        Some(_) => Ok(()),
        None => Err(ApiErr::bad_request(format!(
            "{field} must be a member of the workspace"
        ))),
    }
}
