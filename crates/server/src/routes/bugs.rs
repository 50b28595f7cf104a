use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use rusqlite::Connection;

use taskdeck_api::{
    BugListQuery, BugResponse, CreateBugRequest, Data, NotificationKind, OkResponse,
    UpdateBugRequest, WorkspaceRole, db, service,
};
use taskdeck_core::role;

use super::access::{load_project, require_member, require_workspace_user};
use super::auth::AuthUser;
use super::notifications::{Notice, notify};
use super::{ApiResult, created, new_id, ok};
use crate::error::ApiErr;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::storage::{Db, bug_from_row, sq_execute, sq_query_map, sq_query_opt};

const TITLE_MAX: usize = 200;
const DESCRIPTION_MAX: usize = 5000;

fn load_bug(conn: &Connection, id: &str) -> ApiResult<BugResponse> {
    sq_query_opt(conn, db::bugs::get_by_id(id), bug_from_row)
        .map_err(ApiErr::from_db("bug lookup"))?
        .ok_or_else(|| ApiErr::not_found("bug not found"))
}

/// Load a bug the caller may see, with the caller's role.
fn load_visible_bug(
    conn: &Connection,
    id: &str,
    user_id: &str,
) -> ApiResult<(BugResponse, WorkspaceRole)> {
    let bug = load_bug(conn, id)?;
    let role = require_member(conn, &bug.workspace_id, user_id)?;
    let is_reporter = bug.reported_by == user_id;
    let is_assignee = bug.assigned_to.as_deref() == Some(user_id);
    if !role::can_view_bug(role, is_reporter, is_assignee) {
        return Err(ApiErr::not_found("bug not found"));
    }
    Ok((bug, role))
}

/// A bug may only reference a project of its own workspace that the caller can see.
fn check_project(
    conn: &Connection,
    workspace_id: &str,
    project_id: &str,
    user_id: &str,
) -> ApiResult<()> {
    let (project, _) = load_project(conn, project_id, user_id)?;
    if project.workspace_id != workspace_id {
        return Err(ApiErr::bad_request("project does not belong to this workspace"));
    }
    Ok(())
}

fn metadata_json(value: Option<serde_json::Value>) -> ApiResult<String> {
    match value {
        None | Some(serde_json::Value::Null) => Ok("{}".to_string()),
        Some(v @ serde_json::Value::Object(_)) => Ok(v.to_string()),
        Some(_) => Err(ApiErr::bad_request("metadata must be a JSON object")),
    }
}

fn assignment_notice<'a>(bug: &'a BugResponse, actor: &AuthUser) -> Option<Notice<'a>> {
    let assignee = bug.assigned_to.as_deref()?;
    Some(Notice {
        user_id: assignee,
        workspace_id: Some(&bug.workspace_id),
        kind: NotificationKind::BugAssigned,
        title: "Bug assigned to you".to_string(),
        message: format!("{} assigned you \"{}\"", actor.name, bug.title),
        metadata: serde_json::json!({ "bug_id": bug.id }),
    })
}

/// POST /api/bugs: any workspace member, clients included.
pub async fn create_bug(
    State(db): State<Db>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateBugRequest>,
) -> ApiResult<(StatusCode, Json<Data<BugResponse>>)> {
    let conn = db.conn();
    require_member(&conn, &req.workspace_id, &user.user_id)?;

    let title = service::validate_name("title", &req.title, TITLE_MAX)?;
    let description =
        service::normalize_text("description", req.description.as_deref(), DESCRIPTION_MAX)?;
    if let Some(ref project_id) = req.project_id {
        check_project(&conn, &req.workspace_id, project_id, &user.user_id)?;
    }
    if let Some(ref assignee) = req.assigned_to {
        require_workspace_user(&conn, &req.workspace_id, assignee, "assignee")?;
    }
    let metadata = metadata_json(req.metadata)?;

    let id = new_id();
    sq_execute(
        &conn,
        db::bugs::insert(&db::bugs::NewBug {
            id: &id,
            workspace_id: &req.workspace_id,
            project_id: req.project_id.as_deref(),
            title: &title,
            description: description.as_deref(),
            bug_type: req.bug_type.unwrap_or_default().as_str(),
            priority: req.priority.unwrap_or_default().as_str(),
            status: taskdeck_api::BugStatus::default().as_str(),
            reported_by: &user.user_id,
            assigned_to: req.assigned_to.as_deref(),
            metadata: &metadata,
        }),
    )
    .map_err(ApiErr::from_db("insert bug"))?;

    let bug = load_bug(&conn, &id)?;
    if let Some(notice) = assignment_notice(&bug, &user) {
        notify(&conn, &user.user_id, notice)?;
    }
    Ok(created(bug))
}

/// GET /api/bugs: admins see every bug, others only bugs they reported or own.
pub async fn list_bugs(
    State(db): State<Db>,
    user: AuthUser,
    ApiQuery(q): ApiQuery<BugListQuery>,
) -> ApiResult<Json<Data<Vec<BugResponse>>>> {
    let conn = db.conn();
    let role = require_member(&conn, &q.workspace_id, &user.user_id)?;
    let filter = db::bugs::BugFilter {
        workspace_id: &q.workspace_id,
        status: q.status.map(|s| s.as_str()),
        assigned_to: q.assigned_to.as_deref(),
        project_id: q.project_id.as_deref(),
        involving_user: (!role::sees_all_records(role)).then_some(user.user_id.as_str()),
    };
    sq_query_map(&conn, db::bugs::list(&filter), bug_from_row)
        .map(ok)
        .map_err(ApiErr::from_db("list bugs"))
}

/// GET /api/bugs/{id}
pub async fn get_bug(
    State(db): State<Db>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Data<BugResponse>>> {
    let conn = db.conn();
    let (bug, _) = load_visible_bug(&conn, &id, &user.user_id)?;
    Ok(ok(bug))
}

/// PATCH /api/bugs/{id}: ADMIN, reporter or assignee.
pub async fn update_bug(
    State(db): State<Db>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(req): ApiJson<UpdateBugRequest>,
) -> ApiResult<Json<Data<BugResponse>>> {
    let conn = db.conn();
    let (current, role) = load_visible_bug(&conn, &id, &user.user_id)?;
    let is_reporter = current.reported_by == user.user_id;
    let is_assignee = current.assigned_to.as_deref() == Some(user.user_id.as_str());
    if !role::can_update_bug(role, is_reporter, is_assignee) {
        return Err(ApiErr::forbidden("not allowed to update this bug"));
    }

    let mut patch = db::bugs::BugPatch::default();
    if let Some(ref title) = req.title {
        patch.title = Some(service::validate_name("title", title, TITLE_MAX)?);
    }
    if let Some(ref description) = req.description {
        patch.description = Some(service::normalize_text(
            "description",
            description.as_deref(),
            DESCRIPTION_MAX,
        )?);
    }
    patch.bug_type = req.bug_type.map(|t| t.as_str().to_string());
    patch.priority = req.priority.map(|p| p.as_str().to_string());
    patch.status = req.status.map(|s| s.as_str().to_string());
    if let Some(ref project_id) = req.project_id {
        if let Some(p) = project_id {
            check_project(&conn, &current.workspace_id, p, &user.user_id)?;
        }
        patch.project_id = Some(project_id.clone());
    }
    if let Some(ref assignee) = req.assigned_to {
        if let Some(a) = assignee {
            require_workspace_user(&conn, &current.workspace_id, a, "assignee")?;
        }
        patch.assigned_to = Some(assignee.clone());
    }
    if req.metadata.is_some() {
        patch.metadata = Some(metadata_json(req.metadata)?);
    }

    sq_execute(&conn, db::bugs::update(&id, patch)).map_err(ApiErr::from_db("update bug"))?;
    let bug = load_bug(&conn, &id)?;

    if bug.assigned_to.is_some() && bug.assigned_to != current.assigned_to {
        if let Some(notice) = assignment_notice(&bug, &user) {
            notify(&conn, &user.user_id, notice)?;
        }
    }
    if bug.status != current.status {
        notify(
            &conn,
            &user.user_id,
            Notice {
                user_id: &bug.reported_by,
                workspace_id: Some(&bug.workspace_id),
                kind: NotificationKind::BugStatusChanged,
                title: "Bug status changed".to_string(),
                message: format!(
                    "{} moved \"{}\" from {} to {}",
                    user.name, bug.title, current.status, bug.status
                ),
                metadata: serde_json::json!({
                    "bug_id": bug.id,
                    "from": current.status,
                    "to": bug.status,
                }),
            },
        )?;
    }
    Ok(ok(bug))
}

/// DELETE /api/bugs/{id}: ADMIN or reporter.
pub async fn delete_bug(
    State(db): State<Db>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Data<OkResponse>>> {
    let conn = db.conn();
    let (bug, role) = load_visible_bug(&conn, &id, &user.user_id)?;
    if !role::can_delete_bug(role, bug.reported_by == user.user_id) {
        return Err(ApiErr::forbidden("only admins or the reporter can delete a bug"));
    }
    sq_execute(&conn, db::bugs::delete(&id)).map_err(ApiErr::from_db("delete bug"))?;
    Ok(ok(OkResponse { ok: true }))
}
