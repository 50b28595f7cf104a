use axum::{
    Json,
    extract::State,
    http::StatusCode,
};

use taskdeck_api::{
    CreateProjectRequest, Data, OkResponse, ProjectResponse, UpdateProjectRequest,
    WorkspaceQuery, db, service,
};

use super::access::{load_project, require_admin, require_member};
use super::auth::AuthUser;
use super::{ApiResult, created, new_id, ok};
use crate::error::ApiErr;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::storage::{Db, project_from_row, sq_execute, sq_query_map, sq_query_opt};

const NAME_MAX: usize = 100;
const DESCRIPTION_MAX: usize = 2000;

fn reload(conn: &rusqlite::Connection, id: &str) -> ApiResult<ProjectResponse> {
    sq_query_opt(conn, db::projects::get_by_id(id), project_from_row)
        .map_err(ApiErr::from_db("project lookup"))?
        .ok_or_else(|| ApiErr::not_found("project not found"))
}

/// POST /api/projects: workspace ADMINs only.
pub async fn create_project(
    State(db): State<Db>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<Data<ProjectResponse>>)> {
    let conn = db.conn();
    require_admin(&conn, &req.workspace_id, &user.user_id)?;
    let name = service::validate_name("name", &req.name, NAME_MAX)?;
    let description =
        service::normalize_text("description", req.description.as_deref(), DESCRIPTION_MAX)?;

    let id = new_id();
    sq_execute(
        &conn,
        db::projects::insert(
            &id,
            &req.workspace_id,
            &name,
            description.as_deref(),
            &user.user_id,
        ),
    )
    .map_err(ApiErr::from_db("insert project"))?;

    tracing::info!(workspace_id = %req.workspace_id, project_id = %id, "project created");
    Ok(created(reload(&conn, &id)?))
}

/// GET /api/projects?workspace_id=
pub async fn list_projects(
    State(db): State<Db>,
    user: AuthUser,
    ApiQuery(q): ApiQuery<WorkspaceQuery>,
) -> ApiResult<Json<Data<Vec<ProjectResponse>>>> {
    let conn = db.conn();
    let role = require_member(&conn, &q.workspace_id, &user.user_id)?;
    let client_filter = (!role.is_staff()).then_some(user.user_id.as_str());
    sq_query_map(
        &conn,
        db::projects::list(&q.workspace_id, client_filter),
        project_from_row,
    )
    .map(ok)
    .map_err(ApiErr::from_db("list projects"))
}

/// GET /api/projects/{id}
pub async fn get_project(
    State(db): State<Db>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Data<ProjectResponse>>> {
    let conn = db.conn();
    let (project, _) = load_project(&conn, &id, &user.user_id)?;
    Ok(ok(project))
}

/// PATCH /api/projects/{id}
pub async fn update_project(
    State(db): State<Db>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(req): ApiJson<UpdateProjectRequest>,
) -> ApiResult<Json<Data<ProjectResponse>>> {
    let conn = db.conn();
    let (project, _) = load_project(&conn, &id, &user.user_id)?;
    require_admin(&conn, &project.workspace_id, &user.user_id)?;

    if let Some(ref name) = req.name {
        let name = service::validate_name("name", name, NAME_MAX)?;
        sq_execute(&conn, db::projects::update_name(&id, &name))
            .map_err(ApiErr::from_db("update project name"))?;
    }
    if let Some(ref description) = req.description {
        let description =
            service::normalize_text("description", description.as_deref(), DESCRIPTION_MAX)?;
        sq_execute(
            &conn,
            db::projects::update_description(&id, description.as_deref()),
        )
        .map_err(ApiErr::from_db("update project description"))?;
    }

    reload(&conn, &id).map(ok)
}

/// DELETE /api/projects/{id}: its tasks and invitations are removed with it.
pub async fn delete_project(
    State(db): State<Db>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Data<OkResponse>>> {
    let conn = db.conn();
    let (project, _) = load_project(&conn, &id, &user.user_id)?;
    require_admin(&conn, &project.workspace_id, &user.user_id)?;
    sq_execute(&conn, db::projects::delete(&id)).map_err(ApiErr::from_db("delete project"))?;
    tracing::info!(workspace_id = %project.workspace_id, project_id = %id, "project deleted");
    Ok(ok(OkResponse { ok: true }))
}
