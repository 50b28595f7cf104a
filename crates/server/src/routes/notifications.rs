use axum::{Json, extract::State};
use rusqlite::Connection;

use taskdeck_api::{
    Data, NotificationKind, NotificationListQuery, NotificationResponse, OkResponse,
    ReadAllResponse, UnreadCountResponse, db,
};

use super::auth::AuthUser;
use super::{ApiResult, new_id, ok};
use crate::error::ApiErr;
use crate::extract::{ApiPath, ApiQuery};
use crate::storage::{Db, notification_from_row, sq_count, sq_execute, sq_query_map};

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 200;

/// A notification to deliver to one user.
pub struct Notice<'a> {
    pub user_id: &'a str,
    pub workspace_id: Option<&'a str>,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub metadata: serde_json::Value,
}

/// Store a notification. Skipped when the recipient is the actor.
pub fn notify(conn: &Connection, actor_id: &str, notice: Notice<'_>) -> ApiResult<()> {
    if notice.user_id == actor_id {
        return Ok(());
    }
    let metadata = notice.metadata.to_string();
    sq_execute(
        conn,
        db::notifications::insert(&db::notifications::NewNotification {
            id: &new_id(),
            user_id: notice.user_id,
            workspace_id: notice.workspace_id,
            kind: notice.kind.as_str(),
            title: &notice.title,
            message: &notice.message,
            metadata: &metadata,
        }),
    )
    .map_err(ApiErr::from_db("insert notification"))?;
    tracing::debug!(user_id = %notice.user_id, kind = %notice.kind, "notification stored");
    Ok(())
}

/// GET /api/notifications
pub async fn list_notifications(
    State(db): State<Db>,
    user: AuthUser,
    ApiQuery(q): ApiQuery<NotificationListQuery>,
) -> ApiResult<Json<Data<Vec<NotificationResponse>>>> {
    let limit = q.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let conn = db.conn();
    sq_query_map(
        &conn,
        db::notifications::list(&user.user_id, q.unread_only.unwrap_or(false), u64::from(limit)),
        notification_from_row,
    )
    .map(ok)
    .map_err(ApiErr::from_db("list notifications"))
}

/// GET /api/notifications/unread-count
pub async fn unread_count(
    State(db): State<Db>,
    user: AuthUser,
) -> ApiResult<Json<Data<UnreadCountResponse>>> {
    let conn = db.conn();
    let count = sq_count(&conn, db::notifications::unread_count(&user.user_id))
        .map_err(ApiErr::from_db("unread count"))?;
    Ok(ok(UnreadCountResponse { count }))
}

/// PATCH /api/notifications/{id}/read
pub async fn mark_read(
    State(db): State<Db>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Data<OkResponse>>> {
    let conn = db.conn();
    let n = sq_execute(&conn, db::notifications::mark_read(&id, &user.user_id))
        .map_err(ApiErr::from_db("mark notification read"))?;
    if n == 0 {
        return Err(ApiErr::not_found("notification not found"));
    }
    Ok(ok(OkResponse { ok: true }))
}

/// POST /api/notifications/read-all
pub async fn read_all(
    State(db): State<Db>,
    user: AuthUser,
) -> ApiResult<Json<Data<ReadAllResponse>>> {
    let conn = db.conn();
    let updated = sq_execute(&conn, db::notifications::mark_all_read(&user.user_id))
        .map_err(ApiErr::from_db("mark all read"))?;
    Ok(ok(ReadAllResponse { updated }))
}

/// DELETE /api/notifications/{id}
pub async fn delete_notification(
    State(db): State<Db>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Data<OkResponse>>> {
    let conn = db.conn();
    let n = sq_execute(&conn, db::notifications::delete(&id, &user.user_id))
        .map_err(ApiErr::from_db("delete notification"))?;
    if n == 0 {
        return Err(ApiErr::not_found("notification not found"));
    }
    Ok(ok(OkResponse { ok: true }))
}
