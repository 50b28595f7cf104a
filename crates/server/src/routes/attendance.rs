use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use rusqlite::Connection;

use taskdeck_api::{
    AttendanceListQuery, AttendanceResponse, AttendanceStatus, AutoEndRequest, AutoEndResponse,
    Data, EndShiftRequest, StartShiftRequest, WorkspaceQuery, db, service,
};
use taskdeck_core::attendance::shift_minutes;
use taskdeck_core::{role, time};

use super::access::{load_project, require_admin, require_member};
use super::auth::AuthUser;
use super::{ApiResult, created, new_id, ok};
use crate::error::ApiErr;
use crate::extract::{ApiJson, ApiQuery};
use crate::storage::{Db, attendance_from_row, sq_execute, sq_query_map, sq_query_opt};
use crate::sweep::auto_end_stale;

const END_ACTIVITY_MAX: usize = 1000;

fn load_shift(conn: &Connection, id: &str) -> ApiResult<AttendanceResponse> {
    sq_query_opt(conn, db::attendance::get_by_id(id), attendance_from_row)
        .map_err(ApiErr::from_db("attendance lookup"))?
        .ok_or_else(|| ApiErr::not_found("shift not found"))
}

fn active_shift_for(
    conn: &Connection,
    workspace_id: &str,
    user_id: &str,
) -> ApiResult<Option<AttendanceResponse>> {
    sq_query_opt(
        conn,
        db::attendance::active_for_user(workspace_id, user_id),
        attendance_from_row,
    )
    .map_err(ApiErr::from_db("active shift lookup"))
}

fn sweep_workspace(conn: &Connection, workspace_id: &str) -> ApiResult<usize> {
    auto_end_stale(conn, Some(workspace_id), time::now_utc())
        .map_err(ApiErr::from_db("attendance auto-end"))
}

/// POST /api/attendance/start-shift
pub async fn start_shift(
    State(db): State<Db>,
    user: AuthUser,
    ApiJson(req): ApiJson<StartShiftRequest>,
) -> ApiResult<(StatusCode, Json<Data<AttendanceResponse>>)> {
    let conn = db.conn();
    require_member(&conn, &req.workspace_id, &user.user_id)?;
    if let Some(ref project_id) = req.project_id {
        let (project, _) = load_project(&conn, project_id, &user.user_id)?;
        if project.workspace_id != req.workspace_id {
            return Err(ApiErr::bad_request("project does not belong to this workspace"));
        }
    }

    sweep_workspace(&conn, &req.workspace_id)?;
    if active_shift_for(&conn, &req.workspace_id, &user.user_id)?.is_some() {
        return Err(ApiErr::conflict("a shift is already in progress"));
    }

    let now = time::now_utc();
    let id = new_id();
    sq_execute(
        &conn,
        db::attendance::insert(
            &id,
            &req.workspace_id,
            &user.user_id,
            req.project_id.as_deref(),
            &time::format_date(now.date()),
            &time::format_datetime(now),
        ),
    )
    .map_err(ApiErr::from_db("start shift"))?;

    Ok(created(load_shift(&conn, &id)?))
}

/// POST /api/attendance/end-shift
pub async fn end_shift(
    State(db): State<Db>,
    user: AuthUser,
    ApiJson(req): ApiJson<EndShiftRequest>,
) -> ApiResult<Json<Data<AttendanceResponse>>> {
    let end_activity =
        service::normalize_text("end_activity", req.end_activity.as_deref(), END_ACTIVITY_MAX)?;
    let daily_tasks: Vec<&str> = req
        .daily_tasks
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();

    let conn = db.conn();
    let shift = load_shift(&conn, &req.attendance_id)?;
    if shift.user_id != user.user_id {
        return Err(ApiErr::not_found("shift not found"));
    }
    // A shift from an earlier day closes at its own midnight, never "now".
    if sweep_workspace(&conn, &shift.workspace_id)? > 0 {
        let shift = load_shift(&conn, &shift.id)?;
        if shift.status != AttendanceStatus::InProgress {
            return Err(ApiErr::bad_request("shift was auto-ended at midnight"));
        }
    }
    if shift.status != AttendanceStatus::InProgress {
        return Err(ApiErr::bad_request("shift is not in progress"));
    }

    let start = time::parse_datetime(&shift.start_time)?;
    let end = time::now_utc();
    let daily_tasks = serde_json::Value::from(daily_tasks).to_string();
    let n = sq_execute(
        &conn,
        db::attendance::close(
            &shift.id,
            &time::format_datetime(end),
            shift_minutes(start, end),
            AttendanceStatus::Completed.as_str(),
            end_activity.as_deref(),
            Some(&daily_tasks),
        ),
    )
    .map_err(ApiErr::from_db("end shift"))?;
    if n == 0 {
        return Err(ApiErr::bad_request("shift is not in progress"));
    }

    Ok(ok(load_shift(&conn, &shift.id)?))
}

/// GET /api/attendance/active?workspace_id=
pub async fn active_shift(
    State(db): State<Db>,
    user: AuthUser,
    ApiQuery(q): ApiQuery<WorkspaceQuery>,
) -> ApiResult<Json<Data<Option<AttendanceResponse>>>> {
    let conn = db.conn();
    require_member(&conn, &q.workspace_id, &user.user_id)?;
    sweep_workspace(&conn, &q.workspace_id)?;
    active_shift_for(&conn, &q.workspace_id, &user.user_id).map(ok)
}

/// GET /api/attendance: admins see everyone, others their own shifts.
pub async fn list_attendance(
    State(db): State<Db>,
    user: AuthUser,
    ApiQuery(q): ApiQuery<AttendanceListQuery>,
) -> ApiResult<Json<Data<Vec<AttendanceResponse>>>> {
    let from = service::parse_optional_date(q.from.as_deref())?;
    let to = service::parse_optional_date(q.to.as_deref())?;
    if let (Some(f), Some(t)) = (from, to) {
        if f > t {
            return Err(ApiErr::bad_request("from must not be after to"));
        }
    }
    let from = from.map(time::format_date);
    let to = to.map(time::format_date);

    let conn = db.conn();
    let role = require_member(&conn, &q.workspace_id, &user.user_id)?;
    let user_id = if role::sees_all_records(role) {
        q.user_id.as_deref()
    } else {
        Some(user.user_id.as_str())
    };

    let filter = db::attendance::AttendanceFilter {
        workspace_id: &q.workspace_id,
        user_id,
        from: from.as_deref(),
        to: to.as_deref(),
    };
    sq_query_map(&conn, db::attendance::list(&filter), attendance_from_row)
        .map(ok)
        .map_err(ApiErr::from_db("list attendance"))
}

/// POST /api/attendance/auto-end: run the midnight sweep for one workspace.
pub async fn auto_end(
    State(db): State<Db>,
    user: AuthUser,
    ApiJson(req): ApiJson<AutoEndRequest>,
) -> ApiResult<Json<Data<AutoEndResponse>>> {
    let conn = db.conn();
    require_admin(&conn, &req.workspace_id, &user.user_id)?;
    let ended = sweep_workspace(&conn, &req.workspace_id)?;
    if ended > 0 {
        tracing::info!(workspace_id = %req.workspace_id, ended, "shifts auto-ended");
    }
    Ok(ok(AutoEndResponse { ended }))
}
