use axum::{Json, extract::State};

use taskdeck_api::{Data, MemberResponse, OkResponse, UpdateMemberRequest, db};
use taskdeck_core::role;

use super::access::{member_role, require_member};
use super::auth::AuthUser;
use super::{ApiResult, ok};
use crate::error::ApiErr;
use crate::extract::{ApiJson, ApiPath};
use crate::storage::{Db, member_from_row, sq_count, sq_execute, sq_query_map, sq_query_opt};

fn load_member(conn: &rusqlite::Connection, member_id: &str) -> ApiResult<MemberResponse> {
    sq_query_opt(conn, db::workspaces::member_get(member_id), member_from_row)
        .map_err(ApiErr::from_db("member lookup"))?
        .ok_or_else(|| ApiErr::not_found("member not found"))
}

/// GET /api/workspaces/{id}/members
pub async fn list_members(
    State(db): State<Db>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Data<Vec<MemberResponse>>>> {
    let conn = db.conn();
    require_member(&conn, &id, &user.user_id)?;
    sq_query_map(&conn, db::workspaces::member_list(&id), member_from_row)
        .map(ok)
        .map_err(ApiErr::from_db("list members"))
}

/// PATCH /api/members/{member_id}: change a member's role (ADMIN only).
pub async fn update_member(
    State(db): State<Db>,
    user: AuthUser,
    ApiPath(member_id): ApiPath<String>,
    ApiJson(req): ApiJson<UpdateMemberRequest>,
) -> ApiResult<Json<Data<MemberResponse>>> {
    let conn = db.conn();
    let member = load_member(&conn, &member_id)?;
    let caller = member_role(&conn, &member.workspace_id, &user.user_id)?;
    match caller {
        None => return Err(ApiErr::not_found("member not found")),
        Some(r) if !r.is_admin() => return Err(ApiErr::forbidden("workspace admin only")),
        Some(_) => {}
    }

    if member.role == req.role {
        return Ok(ok(member));
    }
    let admins = sq_count(&conn, db::workspaces::admin_count(&member.workspace_id))
        .map_err(ApiErr::from_db("admin count"))?;
    if role::demotes_last_admin(admins, member.role, req.role) {
        return Err(ApiErr::bad_request(
            "cannot demote the last admin of a workspace",
        ));
    }

    sq_execute(
        &conn,
        db::workspaces::member_update_role(&member_id, req.role.as_str()),
    )
    .map_err(ApiErr::from_db("update member role"))?;
    tracing::info!(
        workspace_id = %member.workspace_id,
        member_id = %member_id,
        role = %req.role,
        "member role changed"
    );
    load_member(&conn, &member_id).map(ok)
}

/// DELETE /api/members/{member_id}: ADMIN, or the member leaving.
pub async fn remove_member(
    State(db): State<Db>,
    user: AuthUser,
    ApiPath(member_id): ApiPath<String>,
) -> ApiResult<Json<Data<OkResponse>>> {
    let conn = db.conn();
    let member = load_member(&conn, &member_id)?;
    let caller = member_role(&conn, &member.workspace_id, &user.user_id)?
        .ok_or_else(|| ApiErr::not_found("member not found"))?;
    if !caller.is_admin() && member.user_id != user.user_id {
        return Err(ApiErr::forbidden(
            "only admins can remove other members",
        ));
    }

    let members = sq_count(&conn, db::workspaces::member_count(&member.workspace_id))
        .map_err(ApiErr::from_db("member count"))?;
    let admins = sq_count(&conn, db::workspaces::admin_count(&member.workspace_id))
        .map_err(ApiErr::from_db("admin count"))?;
    if let Some(reason) = role::removal_blocked(members, admins, member.role) {
        return Err(ApiErr::bad_request(reason));
    }

    sq_execute(&conn, db::workspaces::member_delete(&member_id))
        .map_err(ApiErr::from_db("remove member"))?;
    Ok(ok(OkResponse { ok: true }))
}
