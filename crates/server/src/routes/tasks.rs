use std::collections::HashMap;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use rusqlite::Connection;

use taskdeck_api::{
    BulkUpdateTasksRequest, BulkUpdateTasksResponse, CreateTaskRequest, Data, ImportTasksRequest,
    ImportTasksResponse, NotificationKind, OkResponse, RowError, TaskListQuery, TaskResponse,
    TaskStatus, UpdateTaskRequest, db, service,
};
use taskdeck_core::task::{self, CompletionStamp};
use taskdeck_core::{import, role, time};

use super::access::{
    load_project, project_visible, require_member, require_staff, require_workspace_user,
};
use super::auth::AuthUser;
use super::notifications::{Notice, notify};
use super::{ApiResult, created, new_id, ok};
use crate::error::ApiErr;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::storage::{
    Db, now_string, sq_execute, sq_query_map, sq_query_opt, sq_query_row, task_from_row,
};

fn load_task(conn: &Connection, id: &str) -> ApiResult<TaskResponse> {
    sq_query_opt(conn, db::tasks::get_by_id(id), task_from_row)
        .map_err(ApiErr::from_db("task lookup"))?
        .ok_or_else(|| ApiErr::not_found("task not found"))
}

fn next_position(conn: &Connection, project_id: &str, status: TaskStatus) -> ApiResult<i64> {
    let max: Option<i64> = sq_query_row(
        conn,
        db::tasks::max_position(project_id, status.as_str()),
        |row| row.get(0),
    )
    .map_err(ApiErr::from_db("max task position"))?;
    Ok(task::next_position(max))
}

fn labels_json(labels: &[String]) -> String {
    serde_json::Value::from(service::normalize_labels(labels)).to_string()
}

fn assignment_notice<'a>(task: &'a TaskResponse, assigner: &AuthUser) -> Option<Notice<'a>> {
    let assignee = task.assignee_id.as_deref()?;
    Some(Notice {
        user_id: assignee,
        workspace_id: Some(&task.workspace_id),
        kind: NotificationKind::TaskAssigned,
        title: "New task assigned".to_string(),
        message: format!("{} assigned you \"{}\"", assigner.name, task.name),
        metadata: serde_json::json!({ "task_id": task.id, "project_id": task.project_id }),
    })
}

// ---------------------------------------------------------------------------
// Create / read
// ---------------------------------------------------------------------------

/// POST /api/tasks
pub async fn create_task(
    State(db): State<Db>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Data<TaskResponse>>)> {
    let conn = db.conn();
    let (project, role) = load_project(&conn, &req.project_id, &user.user_id)?;
    if project.workspace_id != req.workspace_id {
        return Err(ApiErr::bad_request("project does not belong to this workspace"));
    }
    if !role.is_staff() {
        return Err(ApiErr::forbidden("clients cannot create tasks"));
    }

    let name = service::validate_name("name", &req.name, task::NAME_MAX)?;
    let description = service::normalize_text(
        "description",
        req.description.as_deref(),
        task::DESCRIPTION_MAX,
    )?;
    let status = req.status.unwrap_or_default();
    let priority = req.priority.unwrap_or_default();
    let due_date = service::parse_optional_date(req.due_date.as_deref())?.map(time::format_date);
    let estimated_hours = service::validate_estimate(req.estimated_hours)?;
    if let Some(ref assignee) = req.assignee_id {
        require_workspace_user(&conn, &project.workspace_id, assignee, "assignee")?;
    }

    let position = next_position(&conn, &project.id, status)?;
    let completed_at = (status == TaskStatus::Done).then(now_string);
    let labels = labels_json(&req.labels);

    let id = new_id();
    sq_execute(
        &conn,
        db::tasks::insert(&db::tasks::NewTask {
            id: &id,
            workspace_id: &project.workspace_id,
            project_id: &project.id,
            name: &name,
            description: description.as_deref(),
            status: status.as_str(),
            priority: priority.as_str(),
            assignee_id: req.assignee_id.as_deref(),
            due_date: due_date.as_deref(),
            position,
            estimated_hours,
            labels: &labels,
            created_by: &user.user_id,
            completed_at: completed_at.as_deref(),
        }),
    )
    .map_err(ApiErr::from_db("insert task"))?;

    let task = load_task(&conn, &id)?;
    if let Some(notice) = assignment_notice(&task, &user) {
        notify(&conn, &user.user_id, notice)?;
    }
    Ok(created(task))
}

/// GET /api/tasks
pub async fn list_tasks(
    State(db): State<Db>,
    user: AuthUser,
    ApiQuery(q): ApiQuery<TaskListQuery>,
) -> ApiResult<Json<Data<Vec<TaskResponse>>>> {
    let due = service::parse_optional_date(q.due_date.as_deref())?.map(time::format_date);
    let conn = db.conn();
    let role = require_member(&conn, &q.workspace_id, &user.user_id)?;

    let filter = db::tasks::TaskFilter {
        workspace_id: &q.workspace_id,
        project_id: q.project_id.as_deref(),
        assignee_id: q.assignee_id.as_deref(),
        status: q.status.map(|s| s.as_str()),
        priority: q.priority.map(|p| p.as_str()),
        search: q.search.as_deref(),
        due_on_or_before: due.as_deref(),
        client_user_id: (!role.is_staff()).then_some(user.user_id.as_str()),
    };
    sq_query_map(&conn, db::tasks::list(&filter), task_from_row)
        .map(ok)
        .map_err(ApiErr::from_db("list tasks"))
}

/// GET /api/tasks/{id}
pub async fn get_task(
    State(db): State<Db>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Data<TaskResponse>>> {
    let conn = db.conn();
    let task = load_task(&conn, &id)?;
    let role = require_member(&conn, &task.workspace_id, &user.user_id)?;
    if !project_visible(&conn, &task.project_id, &user.user_id, role)? {
        return Err(ApiErr::not_found("task not found"));
    }
    Ok(ok(task))
}

// ---------------------------------------------------------------------------
// Update / delete
// ---------------------------------------------------------------------------

/// PATCH /api/tasks/{id}
pub async fn update_task(
    State(db): State<Db>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(req): ApiJson<UpdateTaskRequest>,
) -> ApiResult<Json<Data<TaskResponse>>> {
    let conn = db.conn();
    let current = load_task(&conn, &id)?;
    require_staff(&conn, &current.workspace_id, &user.user_id)?;

    let mut patch = db::tasks::TaskPatch::default();
    if let Some(ref name) = req.name {
        patch.name = Some(service::validate_name("name", name, task::NAME_MAX)?);
    }
    if let Some(ref description) = req.description {
        patch.description = Some(service::normalize_text(
            "description",
            description.as_deref(),
            task::DESCRIPTION_MAX,
        )?);
    }
    if let Some(priority) = req.priority {
        patch.priority = Some(priority.as_str().to_string());
    }
    if let Some(ref assignee) = req.assignee_id {
        if let Some(a) = assignee {
            require_workspace_user(&conn, &current.workspace_id, a, "assignee")?;
        }
        patch.assignee_id = Some(assignee.clone());
    }
    if let Some(ref due) = req.due_date {
        let parsed = service::parse_optional_date(due.as_deref())?;
        patch.due_date = Some(parsed.map(time::format_date));
    }
    if let Some(hours) = req.estimated_hours {
        patch.estimated_hours = Some(service::validate_estimate(hours)?);
    }
    if let Some(ref labels) = req.labels {
        patch.labels = Some(labels_json(labels));
    }
    if let Some(status) = req.status.filter(|s| *s != current.status) {
        patch.status = Some(status.as_str().to_string());
        patch.completed_at = match task::completion_change(current.status, status) {
            CompletionStamp::Set => Some(Some(now_string())),
            CompletionStamp::Clear => Some(None),
            CompletionStamp::Unchanged => None,
        };
        if req.position.is_none() {
            patch.position = Some(next_position(&conn, &current.project_id, status)?);
        }
    }
    if let Some(position) = req.position {
        patch.position = Some(position);
    }

    sq_execute(&conn, db::tasks::update(&id, patch)).map_err(ApiErr::from_db("update task"))?;
    let task = load_task(&conn, &id)?;

    if task.assignee_id.is_some() && task.assignee_id != current.assignee_id {
        if let Some(notice) = assignment_notice(&task, &user) {
            notify(&conn, &user.user_id, notice)?;
        }
    }
    Ok(ok(task))
}

/// DELETE /api/tasks/{id}: ADMIN or the task's creator.
pub async fn delete_task(
    State(db): State<Db>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Data<OkResponse>>> {
    let conn = db.conn();
    let task = load_task(&conn, &id)?;
    let role = require_member(&conn, &task.workspace_id, &user.user_id)?;
    if !role::can_delete_task(role, task.created_by == user.user_id) {
        return Err(ApiErr::forbidden(
            "only admins or the task creator can delete a task",
        ));
    }
    sq_execute(&conn, db::tasks::delete(&id)).map_err(ApiErr::from_db("delete task"))?;
    Ok(ok(OkResponse { ok: true }))
}

// ---------------------------------------------------------------------------
// Kanban moves
// ---------------------------------------------------------------------------

/// POST /api/tasks/bulk-update: apply kanban moves in one transaction.
pub async fn bulk_update(
    State(db): State<Db>,
    user: AuthUser,
    ApiJson(req): ApiJson<BulkUpdateTasksRequest>,
) -> ApiResult<Json<Data<BulkUpdateTasksResponse>>> {
    if req.tasks.is_empty() {
        return Ok(ok(BulkUpdateTasksResponse { updated: 0 }));
    }

    let mut conn = db.conn();
    let mut current = Vec::with_capacity(req.tasks.len());
    for item in &req.tasks {
        current.push(load_task(&conn, &item.id)?);
    }
    let workspace_id = current[0].workspace_id.clone();
    if current.iter().any(|t| t.workspace_id != workspace_id) {
        return Err(ApiErr::bad_request(
            "all tasks must belong to the same workspace",
        ));
    }
    require_staff(&conn, &workspace_id, &user.user_id)?;

    let tx = conn
        .transaction()
        .map_err(ApiErr::from_db("begin bulk update"))?;
    let now = now_string();
    for (item, before) in req.tasks.iter().zip(&current) {
        let completed_at = match task::completion_change(before.status, item.status) {
            CompletionStamp::Set => Some(Some(now.clone())),
            CompletionStamp::Clear => Some(None),
            CompletionStamp::Unchanged => None,
        };
        let patch = db::tasks::TaskPatch {
            status: Some(item.status.as_str().to_string()),
            position: Some(item.position),
            completed_at,
            ..Default::default()
        };
        sq_execute(&tx, db::tasks::update(&item.id, patch))
            .map_err(ApiErr::from_db("bulk update task"))?;
    }
    tx.commit().map_err(ApiErr::from_db("commit bulk update"))?;

    Ok(ok(BulkUpdateTasksResponse {
        updated: req.tasks.len(),
    }))
}

// ---------------------------------------------------------------------------
// CSV import
// ---------------------------------------------------------------------------

/// POST /api/tasks/import: insert valid rows, report the rest.
pub async fn import_tasks(
    State(db): State<Db>,
    user: AuthUser,
    ApiJson(req): ApiJson<ImportTasksRequest>,
) -> ApiResult<(StatusCode, Json<Data<ImportTasksResponse>>)> {
    let parsed = import::parse_tasks_csv(&req.csv)?;

    let mut conn = db.conn();
    let (project, role) = load_project(&conn, &req.project_id, &user.user_id)?;
    if project.workspace_id != req.workspace_id {
        return Err(ApiErr::bad_request("project does not belong to this workspace"));
    }
    if !role.is_staff() {
        return Err(ApiErr::forbidden("clients cannot import tasks"));
    }

    let mut warnings = Vec::new();
    let mut assignees: HashMap<String, Option<String>> = HashMap::new();
    for row in &parsed.tasks {
        let Some(ref email) = row.assignee_email else {
            continue;
        };
        if !assignees.contains_key(email) {
            let found: Option<String> = sq_query_opt(
                &conn,
                db::workspaces::member_user_id_by_email(&project.workspace_id, email),
                |r| r.get(0),
            )
            .map_err(ApiErr::from_db("import assignee lookup"))?;
            assignees.insert(email.clone(), found);
        }
        if assignees.get(email).is_some_and(Option::is_none) {
            warnings.push(RowError {
                row: row.row,
                error: format!("no workspace member with email {email}; task left unassigned"),
            });
        }
    }

    let mut positions: HashMap<TaskStatus, i64> = HashMap::new();
    for status in TaskStatus::ALL {
        positions.insert(*status, next_position(&conn, &project.id, *status)?);
    }

    let tx = conn.transaction().map_err(ApiErr::from_db("begin import"))?;
    let now = now_string();
    let mut task_ids = Vec::with_capacity(parsed.tasks.len());
    for row in &parsed.tasks {
        let id = new_id();
        let assignee_id = row
            .assignee_email
            .as_ref()
            .and_then(|email| assignees.get(email).cloned().flatten());
        let position = positions.entry(row.status).or_insert(task::POSITION_STEP);
        let due_date = row.due_date.map(time::format_date);
        let labels = labels_json(&row.labels);
        sq_execute(
            &tx,
            db::tasks::insert(&db::tasks::NewTask {
                id: &id,
                workspace_id: &project.workspace_id,
                project_id: &project.id,
                name: &row.name,
                description: row.description.as_deref(),
                status: row.status.as_str(),
                priority: row.priority.as_str(),
                assignee_id: assignee_id.as_deref(),
                due_date: due_date.as_deref(),
                position: *position,
                estimated_hours: row.estimated_hours,
                labels: &labels,
                created_by: &user.user_id,
                completed_at: (row.status == TaskStatus::Done).then_some(now.as_str()),
            }),
        )
        .map_err(ApiErr::from_db("import task"))?;
        *position += task::POSITION_STEP;
        task_ids.push(id);
    }
    tx.commit().map_err(ApiErr::from_db("commit import"))?;

    tracing::info!(
        project_id = %project.id,
        imported = task_ids.len(),
        rejected = parsed.errors.len(),
        "tasks imported"
    );
    Ok(created(ImportTasksResponse {
        imported: task_ids.len(),
        task_ids,
        errors: parsed.errors,
        warnings,
    }))
}
