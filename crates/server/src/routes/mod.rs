pub mod access;
pub mod attendance;
pub mod auth;
pub mod bugs;
pub mod client_invitations;
pub mod health;
pub mod members;
pub mod notifications;
pub mod projects;
pub mod reports;
pub mod tasks;
pub mod weekly_reports;
pub mod workspaces;

use axum::{Json, http::StatusCode};

use taskdeck_api::Data;

use crate::error::ApiErr;

pub type ApiResult<T> = Result<T, ApiErr>;

/// `200 OK` with the `{ "data": ... }` envelope.
pub fn ok<T>(data: T) -> Json<Data<T>> {
    Json(Data::new(data))
}

/// `201 Created` with the `{ "data": ... }` envelope.
pub fn created<T>(data: T) -> (StatusCode, Json<Data<T>>) {
    (StatusCode::CREATED, Json(Data::new(data)))
}

pub(crate) fn now_unix() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
