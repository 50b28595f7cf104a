use axum::{
    Json,
    extract::State,
    http::StatusCode,
};

use taskdeck_api::{
    CreateWorkspaceRequest, Data, JoinWorkspaceRequest, MemberResponse, OkResponse,
    UpdateWorkspaceRequest, WorkspaceDetailResponse, WorkspaceResponse, WorkspaceRole, db,
    service,
};

use super::access::{load_workspace, member_role, require_admin, require_member};
use super::auth::AuthUser;
use super::{ApiResult, created, new_id, ok};
use crate::error::ApiErr;
use crate::extract::{ApiJson, ApiPath};
use crate::storage::{
    Db, is_unique_violation, member_from_row, sq_count, sq_execute, sq_query_map, sq_query_opt,
    workspace_from_row,
};

const NAME_MAX: usize = 100;
const DESCRIPTION_MAX: usize = 1000;

/// POST /api/workspaces: the creator becomes its first ADMIN.
pub async fn create_workspace(
    State(db): State<Db>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateWorkspaceRequest>,
) -> ApiResult<(StatusCode, Json<Data<WorkspaceResponse>>)> {
    let name = service::validate_name("name", &req.name, NAME_MAX)?;
    let description =
        service::normalize_text("description", req.description.as_deref(), DESCRIPTION_MAX)?;
    let invite_code = service::generate_invite_code()?;
    let workspace_id = new_id();

    let mut conn = db.conn();
    let tx = conn
        .transaction()
        .map_err(ApiErr::from_db("begin create workspace"))?;
    sq_execute(
        &tx,
        db::workspaces::insert(
            &workspace_id,
            &name,
            description.as_deref(),
            &invite_code,
            &user.user_id,
        ),
    )
    .map_err(ApiErr::from_db("insert workspace"))?;
    sq_execute(
        &tx,
        db::workspaces::member_insert(
            &new_id(),
            &workspace_id,
            &user.user_id,
            WorkspaceRole::Admin.as_str(),
        ),
    )
    .map_err(ApiErr::from_db("insert workspace admin"))?;
    tx.commit().map_err(ApiErr::from_db("commit create workspace"))?;

    let workspace = load_workspace(&conn, &workspace_id)?;
    tracing::info!(workspace_id = %workspace.id, "workspace created");
    Ok(created(workspace))
}

/// GET /api/workspaces: workspaces the caller belongs to.
pub async fn list_workspaces(
    State(db): State<Db>,
    user: AuthUser,
) -> ApiResult<Json<Data<Vec<WorkspaceResponse>>>> {
    let conn = db.conn();
    sq_query_map(&conn, db::workspaces::list_for_user(&user.user_id), workspace_from_row)
        .map(ok)
        .map_err(ApiErr::from_db("list workspaces"))
}

/// GET /api/workspaces/{id}
pub async fn get_workspace(
    State(db): State<Db>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Data<WorkspaceDetailResponse>>> {
    let conn = db.conn();
    let role = require_member(&conn, &id, &user.user_id)?;
    let workspace = load_workspace(&conn, &id)?;
    let member_count = sq_count(&conn, db::workspaces::member_count(&id))
        .map_err(ApiErr::from_db("member count"))?;
    Ok(ok(WorkspaceDetailResponse {
        workspace,
        member_count,
        role,
    }))
}

/// PATCH /api/workspaces/{id}
pub async fn update_workspace(
    State(db): State<Db>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(req): ApiJson<UpdateWorkspaceRequest>,
) -> ApiResult<Json<Data<WorkspaceResponse>>> {
    let conn = db.conn();
    require_admin(&conn, &id, &user.user_id)?;

    if let Some(ref name) = req.name {
        let name = service::validate_name("name", name, NAME_MAX)?;
        sq_execute(&conn, db::workspaces::update_name(&id, &name))
            .map_err(ApiErr::from_db("update workspace name"))?;
    }
    if let Some(ref description) = req.description {
        let description =
            service::normalize_text("description", description.as_deref(), DESCRIPTION_MAX)?;
        sq_execute(
            &conn,
            db::workspaces::update_description(&id, description.as_deref()),
        )
        .map_err(ApiErr::from_db("update workspace description"))?;
    }

    load_workspace(&conn, &id).map(ok)
}

/// DELETE /api/workspaces/{id}: everything inside goes with it.
pub async fn delete_workspace(
    State(db): State<Db>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Data<OkResponse>>> {
    let conn = db.conn();
    require_admin(&conn, &id, &user.user_id)?;
    sq_execute(&conn, db::workspaces::delete(&id))
        .map_err(ApiErr::from_db("delete workspace"))?;
    tracing::info!(workspace_id = %id, "workspace deleted");
    Ok(ok(OkResponse { ok: true }))
}

/// POST /api/workspaces/{id}/reset-invite-code
pub async fn reset_invite_code(
    State(db): State<Db>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Data<WorkspaceResponse>>> {
    let conn = db.conn();
    require_admin(&conn, &id, &user.user_id)?;
    let code = service::generate_invite_code()?;
    sq_execute(&conn, db::workspaces::update_invite_code(&id, &code))
        .map_err(ApiErr::from_db("reset invite code"))?;
    load_workspace(&conn, &id).map(ok)
}

/// POST /api/workspaces/{id}/join: join as MEMBER with the invite code.
pub async fn join_workspace(
    State(db): State<Db>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(req): ApiJson<JoinWorkspaceRequest>,
) -> ApiResult<(StatusCode, Json<Data<MemberResponse>>)> {
    let conn = db.conn();
    let workspace = load_workspace(&conn, &id)?;
    if workspace.invite_code != req.invite_code.trim() {
        return Err(ApiErr::bad_request("invalid invite code"));
    }
    if member_role(&conn, &id, &user.user_id)?.is_some() {
        return Err(ApiErr::conflict("already a member of this workspace"));
    }

    let member_id = new_id();
    sq_execute(
        &conn,
        db::workspaces::member_insert(
            &member_id,
            &id,
            &user.user_id,
            WorkspaceRole::Member.as_str(),
        ),
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiErr::conflict("already a member of this workspace")
        } else {
            ApiErr::from_db("join workspace")(e)
        }
    })?;

    let member = sq_query_opt(&conn, db::workspaces::member_get(&member_id), member_from_row)
        .map_err(ApiErr::from_db("load member"))?
        .ok_or_else(|| ApiErr::internal("internal server error"))?;
    tracing::info!(workspace_id = %id, user_id = %user.user_id, "member joined");
    Ok(created(member))
}
