use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use chrono::NaiveDate;
use rusqlite::Connection;

use taskdeck_api::{
    CreateWeeklyReportRequest, Data, NotificationKind, OkResponse, UpdateWeeklyReportRequest,
    WeeklyReportListQuery, WeeklyReportResponse, WorkspaceRole, db, service,
};
use taskdeck_core::{role, time, weekly};

use super::access::require_member;
use super::auth::AuthUser;
use super::notifications::{Notice, notify};
use super::{ApiResult, created, new_id, ok};
use crate::error::ApiErr;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::storage::{Db, sq_execute, sq_query_map, sq_query_opt, weekly_report_from_row};

const DEPARTMENT_MAX: usize = 100;
const SUMMARY_MAX: usize = 10_000;

fn load_report(conn: &Connection, id: &str) -> ApiResult<WeeklyReportResponse> {
    sq_query_opt(conn, db::weekly_reports::get_by_id(id), weekly_report_from_row)
        .map_err(ApiErr::from_db("weekly report lookup"))?
        .ok_or_else(|| ApiErr::not_found("weekly report not found"))
}

/// Load a report the caller may see: their own, or any report for an admin.
fn load_visible_report(
    conn: &Connection,
    id: &str,
    user_id: &str,
) -> ApiResult<(WeeklyReportResponse, WorkspaceRole)> {
    let report = load_report(conn, id)?;
    let role = require_member(conn, &report.workspace_id, user_id)?;
    if report.user_id != user_id && !role::sees_all_records(role) {
        return Err(ApiErr::not_found("weekly report not found"));
    }
    Ok((report, role))
}

fn task_details_json(value: Option<serde_json::Value>) -> ApiResult<String> {
    match value {
        None | Some(serde_json::Value::Null) => Ok("[]".to_string()),
        Some(v @ (serde_json::Value::Array(_) | serde_json::Value::Object(_))) => {
            Ok(v.to_string())
        }
        Some(_) => Err(ApiErr::bad_request(
            "task_details must be a JSON array or object",
        )),
    }
}

fn parse_period(from: &str, to: &str) -> ApiResult<(NaiveDate, NaiveDate)> {
    let from = time::parse_date(from)?;
    let to = time::parse_date(to)?;
    weekly::validate_period(from, to)?;
    Ok((from, to))
}

/// Tell the workspace admins a report was submitted.
fn notify_admins(conn: &Connection, author: &AuthUser, report: &WeeklyReportResponse) -> ApiResult<()> {
    let admins: Vec<String> = sq_query_map(
        conn,
        db::workspaces::admin_user_ids(&report.workspace_id),
        |row| row.get(0),
    )
    .map_err(ApiErr::from_db("admin lookup"))?;
    for admin in &admins {
        notify(
            conn,
            &author.user_id,
            Notice {
                user_id: admin,
                workspace_id: Some(&report.workspace_id),
                kind: NotificationKind::WeeklyReportSubmitted,
                title: "Weekly report submitted".to_string(),
                message: format!(
                    "{} submitted a report for {} to {}",
                    author.name, report.from_date, report.to_date
                ),
                metadata: serde_json::json!({ "report_id": report.id }),
            },
        )?;
    }
    Ok(())
}

/// POST /api/weekly-reports
pub async fn create_report(
    State(db): State<Db>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateWeeklyReportRequest>,
) -> ApiResult<(StatusCode, Json<Data<WeeklyReportResponse>>)> {
    let (from, to) = parse_period(&req.from_date, &req.to_date)?;
    let department =
        service::normalize_text("department", req.department.as_deref(), DEPARTMENT_MAX)?;
    let summary = service::normalize_text("summary", req.summary.as_deref(), SUMMARY_MAX)?;
    let task_details = task_details_json(req.task_details)?;
    let is_draft = req.is_draft.unwrap_or(false);

    let conn = db.conn();
    require_member(&conn, &req.workspace_id, &user.user_id)?;

    let id = new_id();
    sq_execute(
        &conn,
        db::weekly_reports::insert(&db::weekly_reports::NewWeeklyReport {
            id: &id,
            workspace_id: &req.workspace_id,
            user_id: &user.user_id,
            from_date: &time::format_date(from),
            to_date: &time::format_date(to),
            department: department.as_deref(),
            summary: summary.as_deref(),
            task_details: &task_details,
            is_draft,
        }),
    )
    .map_err(ApiErr::from_db("insert weekly report"))?;

    let report = load_report(&conn, &id)?;
    if !report.is_draft {
        notify_admins(&conn, &user, &report)?;
    }
    Ok(created(report))
}

/// GET /api/weekly-reports: admins see all reports, others their own.
pub async fn list_reports(
    State(db): State<Db>,
    user: AuthUser,
    ApiQuery(q): ApiQuery<WeeklyReportListQuery>,
) -> ApiResult<Json<Data<Vec<WeeklyReportResponse>>>> {
    let conn = db.conn();
    let role = require_member(&conn, &q.workspace_id, &user.user_id)?;
    let author = if role::sees_all_records(role) {
        q.user_id.as_deref()
    } else {
        Some(user.user_id.as_str())
    };
    sq_query_map(
        &conn,
        db::weekly_reports::list(&q.workspace_id, author),
        weekly_report_from_row,
    )
    .map(ok)
    .map_err(ApiErr::from_db("list weekly reports"))
}

/// GET /api/weekly-reports/{id}
pub async fn get_report(
    State(db): State<Db>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Data<WeeklyReportResponse>>> {
    let conn = db.conn();
    let (report, _) = load_visible_report(&conn, &id, &user.user_id)?;
    Ok(ok(report))
}

/// PATCH /api/weekly-reports/{id}: the author edits a draft or submits it.
pub async fn update_report(
    State(db): State<Db>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(req): ApiJson<UpdateWeeklyReportRequest>,
) -> ApiResult<Json<Data<WeeklyReportResponse>>> {
    let conn = db.conn();
    let (current, _) = load_visible_report(&conn, &id, &user.user_id)?;
    if current.user_id != user.user_id {
        return Err(ApiErr::forbidden("only the author can edit a weekly report"));
    }
    if !current.is_draft {
        return Err(ApiErr::bad_request(
            "a submitted report can no longer be edited",
        ));
    }

    let mut patch = db::weekly_reports::WeeklyReportPatch::default();
    if req.from_date.is_some() || req.to_date.is_some() {
        let from = req.from_date.as_deref().unwrap_or(&current.from_date);
        let to = req.to_date.as_deref().unwrap_or(&current.to_date);
        let (from, to) = parse_period(from, to)?;
        patch.from_date = Some(time::format_date(from));
        patch.to_date = Some(time::format_date(to));
    }
    if let Some(ref department) = req.department {
        patch.department = Some(service::normalize_text(
            "department",
            department.as_deref(),
            DEPARTMENT_MAX,
        )?);
    }
    if let Some(ref summary) = req.summary {
        patch.summary = Some(service::normalize_text(
            "summary",
            summary.as_deref(),
            SUMMARY_MAX,
        )?);
    }
    if req.task_details.is_some() {
        patch.task_details = Some(task_details_json(req.task_details)?);
    }
    patch.is_draft = req.is_draft;

    sq_execute(&conn, db::weekly_reports::update(&id, patch))
        .map_err(ApiErr::from_db("update weekly report"))?;
    let report = load_report(&conn, &id)?;
    if !report.is_draft {
        notify_admins(&conn, &user, &report)?;
    }
    Ok(ok(report))
}

/// DELETE /api/weekly-reports/{id}: the author or an admin.
pub async fn delete_report(
    State(db): State<Db>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Data<OkResponse>>> {
    let conn = db.conn();
    load_visible_report(&conn, &id, &user.user_id)?;
    sq_execute(&conn, db::weekly_reports::delete(&id))
        .map_err(ApiErr::from_db("delete weekly report"))?;
    Ok(ok(OkResponse { ok: true }))
}
