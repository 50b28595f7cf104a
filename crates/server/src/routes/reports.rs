use axum::{Json, extract::State};
use rusqlite::Connection;

use taskdeck_api::{Data, ReportQuery, TaskAnalytics, TaskReport, db, service};
use taskdeck_core::report::{self, TaskRecord};
use taskdeck_core::time;

use super::access::{load_project, require_member, require_staff};
use super::auth::AuthUser;
use super::{ApiResult, ok};
use crate::error::ApiErr;
use crate::extract::{ApiPath, ApiQuery};
use crate::storage::{Db, project_from_row, sq_query_map, task_record_from_row};

fn task_records(
    conn: &Connection,
    workspace_id: &str,
    project_id: Option<&str>,
) -> ApiResult<Vec<TaskRecord>> {
    sq_query_map(
        conn,
        db::tasks::report_rows(workspace_id, project_id),
        task_record_from_row,
    )
    .map_err(ApiErr::from_db("report rows"))
}

/// GET /api/reports: aggregated task metrics for a workspace or project.
pub async fn task_report(
    State(db): State<Db>,
    user: AuthUser,
    ApiQuery(q): ApiQuery<ReportQuery>,
) -> ApiResult<Json<Data<TaskReport>>> {
    let today = time::now_utc().date();
    let from = service::parse_optional_date(q.from.as_deref())?;
    let to = service::parse_optional_date(q.to.as_deref())?;
    let (from, to) = report::resolve_range(from, to, today)?;

    let conn = db.conn();
    require_staff(&conn, &q.workspace_id, &user.user_id)?;
    if let Some(ref project_id) = q.project_id {
        let (project, _) = load_project(&conn, project_id, &user.user_id)?;
        if project.workspace_id != q.workspace_id {
            return Err(ApiErr::bad_request("project does not belong to this workspace"));
        }
    }

    let records = task_records(&conn, &q.workspace_id, q.project_id.as_deref())?;
    Ok(ok(report::build_report(&records, from, to, today)))
}

/// GET /api/projects/{id}/analytics
pub async fn project_analytics(
    State(db): State<Db>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Data<TaskAnalytics>>> {
    let conn = db.conn();
    let (project, _) = load_project(&conn, &id, &user.user_id)?;
    let records = task_records(&conn, &project.workspace_id, Some(&project.id))?;
    let today = time::now_utc().date();
    Ok(ok(report::month_over_month(&records, &user.user_id, today)))
}

/// GET /api/workspaces/{id}/analytics: clients only count their granted projects.
pub async fn workspace_analytics(
    State(db): State<Db>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Data<TaskAnalytics>>> {
    let conn = db.conn();
    let role = require_member(&conn, &id, &user.user_id)?;

    let records = if role.is_staff() {
        task_records(&conn, &id, None)?
    } else {
        let projects = sq_query_map(
            &conn,
            db::projects::list(&id, Some(&user.user_id)),
            project_from_row,
        )
        .map_err(ApiErr::from_db("client projects"))?;
        let mut records = Vec::new();
        for project in &projects {
            records.extend(task_records(&conn, &id, Some(&project.id))?);
        }
        records
    };

    let today = time::now_utc().date();
    Ok(ok(report::month_over_month(&records, &user.user_id, today)))
}
