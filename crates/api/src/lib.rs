//! Shared API types, crypto, and SQL builders for Taskdeck.
//!
//! This crate is the single source of truth for request/response shapes.
//! Successful responses are wrapped in [`Data`]; failures serialize as
//! [`ApiError`].

use serde::{Deserialize, Deserializer, Serialize};

#[cfg(feature = "backend")]
pub mod crypto;
#[cfg(feature = "backend")]
pub mod db;
#[cfg(feature = "backend")]
pub mod service;

pub use taskdeck_core::attendance::AttendanceStatus;
pub use taskdeck_core::bug::{BugStatus, BugType};
pub use taskdeck_core::import::RowError;
pub use taskdeck_core::invitation::{InvitationRejection, InvitationStatus};
pub use taskdeck_core::notification::NotificationKind;
pub use taskdeck_core::report::{TaskAnalytics, TaskReport};
pub use taskdeck_core::role::WorkspaceRole;
pub use taskdeck_core::task::{Priority, TaskStatus};

// ─── Envelopes ───────────────────────────────────────────────────────────────

/// Success envelope: `{ "data": ... }`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Data<T> {
    pub data: T,
}

impl<T> Data<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Failure envelope: `{ "error": "..." }`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

impl From<&ServiceError> for ApiError {
    fn from(e: &ServiceError) -> Self {
        Self {
            error: e.message().to_string(),
        }
    }
}

/// Generic success response for operations that don't return data.
#[derive(Debug, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`)
/// in PATCH bodies.
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

// ─── Health ──────────────────────────────────────────────────────────────────

/// Returned by `GET /api/health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// ─── Auth ────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

/// Public user profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: String,
}

/// Returned on successful login / register / refresh.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthTokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub user: UserResponse,
}

// ─── Workspaces & members ────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateWorkspaceRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateWorkspaceRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub invite_code: String,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Returned by `GET /api/workspaces/:id`.
#[derive(Debug, Serialize, Deserialize)]
pub struct WorkspaceDetailResponse {
    #[serde(flatten)]
    pub workspace: WorkspaceResponse,
    pub member_count: i64,
    pub role: WorkspaceRole,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinWorkspaceRequest {
    pub invite_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberResponse {
    pub id: String,
    pub workspace_id: String,
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub role: WorkspaceRole,
    pub joined_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateMemberRequest {
    pub role: WorkspaceRole,
}

/// Query string carrying the workspace scope of a listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct WorkspaceQuery {
    pub workspace_id: String,
}

// ─── Projects ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateProjectRequest {
    pub workspace_id: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectResponse {
    pub id: String,
    pub workspace_id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

// ─── Tasks ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub workspace_id: String,
    pub project_id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub assignee_id: Option<String>,
    /// `YYYY-MM-DD`
    pub due_date: Option<String>,
    pub estimated_hours: Option<f64>,
    #[serde(default)]
    pub labels: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateTaskRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "double_option")]
    pub assignee_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub estimated_hours: Option<Option<f64>>,
    pub labels: Option<Vec<String>>,
    pub position: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResponse {
    pub id: String,
    pub workspace_id: String,
    pub project_id: String,
    pub project_name: String,
    pub name: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub assignee_id: Option<String>,
    pub assignee_name: Option<String>,
    pub due_date: Option<String>,
    pub position: i64,
    pub estimated_hours: Option<f64>,
    pub labels: Vec<String>,
    pub created_by: String,
    pub completed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Query parameters for `GET /api/tasks`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TaskListQuery {
    pub workspace_id: String,
    pub project_id: Option<String>,
    pub assignee_id: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub search: Option<String>,
    /// Tasks due on or before this date.
    pub due_date: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BulkTaskUpdate {
    pub id: String,
    pub status: TaskStatus,
    pub position: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BulkUpdateTasksRequest {
    pub tasks: Vec<BulkTaskUpdate>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BulkUpdateTasksResponse {
    pub updated: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImportTasksRequest {
    pub workspace_id: String,
    pub project_id: String,
    pub csv: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImportTasksResponse {
    pub imported: usize,
    pub task_ids: Vec<String>,
    pub errors: Vec<RowError>,
    pub warnings: Vec<RowError>,
}

// ─── Bugs ────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateBugRequest {
    pub workspace_id: String,
    pub title: String,
    pub description: Option<String>,
    pub bug_type: Option<BugType>,
    pub priority: Option<Priority>,
    pub project_id: Option<String>,
    pub assigned_to: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateBugRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub bug_type: Option<BugType>,
    pub priority: Option<Priority>,
    pub status: Option<BugStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub project_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to: Option<Option<String>>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BugResponse {
    pub id: String,
    pub workspace_id: String,
    pub project_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub bug_type: BugType,
    pub priority: Priority,
    pub status: BugStatus,
    pub reported_by: String,
    pub reporter_name: String,
    pub assigned_to: Option<String>,
    pub assignee_name: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BugListQuery {
    pub workspace_id: String,
    pub status: Option<BugStatus>,
    pub assigned_to: Option<String>,
    pub project_id: Option<String>,
}

// ─── Attendance ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct StartShiftRequest {
    pub workspace_id: String,
    pub project_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EndShiftRequest {
    pub attendance_id: String,
    pub end_activity: Option<String>,
    #[serde(default)]
    pub daily_tasks: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceResponse {
    pub id: String,
    pub workspace_id: String,
    pub user_id: String,
    pub user_name: String,
    pub project_id: Option<String>,
    pub shift_date: String,
    pub start_time: String,
    pub end_time: Option<String>,
    pub total_minutes: Option<i64>,
    pub status: AttendanceStatus,
    pub end_activity: Option<String>,
    pub daily_tasks: Vec<String>,
    pub created_at: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AttendanceListQuery {
    pub workspace_id: String,
    pub user_id: Option<String>,
    /// Inclusive `YYYY-MM-DD` bounds on `shift_date`.
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AutoEndRequest {
    pub workspace_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AutoEndResponse {
    pub ended: usize,
}

// ─── Notifications ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationResponse {
    pub id: String,
    pub workspace_id: Option<String>,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub metadata: serde_json::Value,
    pub is_read: bool,
    pub created_at: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct NotificationListQuery {
    pub unread_only: Option<bool>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnreadCountResponse {
    pub count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadAllResponse {
    pub updated: usize,
}

// ─── Weekly reports ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateWeeklyReportRequest {
    pub workspace_id: String,
    pub from_date: String,
    pub to_date: String,
    pub department: Option<String>,
    pub summary: Option<String>,
    pub task_details: Option<serde_json::Value>,
    pub is_draft: Option<bool>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateWeeklyReportRequest {
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub department: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub summary: Option<Option<String>>,
    pub task_details: Option<serde_json::Value>,
    pub is_draft: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyReportResponse {
    pub id: String,
    pub workspace_id: String,
    pub user_id: String,
    pub user_name: String,
    pub from_date: String,
    pub to_date: String,
    pub department: Option<String>,
    pub summary: Option<String>,
    pub task_details: serde_json::Value,
    pub is_draft: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct WeeklyReportListQuery {
    pub workspace_id: String,
    pub user_id: Option<String>,
}

// ─── Client invitations ──────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateClientInvitationRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInvitationResponse {
    pub id: String,
    pub workspace_id: String,
    pub project_id: String,
    pub email: String,
    pub status: InvitationStatus,
    pub invited_by: String,
    pub expires_at: String,
    pub accepted_at: Option<String>,
    pub created_at: String,
}

/// Returned once on creation. The raw `token` is never stored or shown again.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateClientInvitationResponse {
    #[serde(flatten)]
    pub invitation: ClientInvitationResponse,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyInvitationQuery {
    pub token: String,
}

/// Returned by `GET /api/client-invitations/verify`.
#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyInvitationResponse {
    pub valid: bool,
    pub reason: Option<InvitationRejection>,
    pub email: Option<String>,
    pub project_name: Option<String>,
    pub workspace_name: Option<String>,
    pub expires_at: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AcceptInvitationRequest {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AcceptInvitationResponse {
    pub workspace_id: String,
    pub project_id: String,
    pub role: WorkspaceRole,
}

// ─── Reports ─────────────────────────────────────────────────────────────────

/// Query parameters for `GET /api/reports`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ReportQuery {
    pub workspace_id: String,
    pub project_id: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

// ─── Service Error ───────────────────────────────────────────────────────────

/// Framework-agnostic service error. Each variant maps to an HTTP status code.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ServiceError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Gone(String),
    Internal(String),
}

impl ServiceError {
    /// HTTP status code as a `u16`.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Gone(_) => 410,
            Self::Internal(_) => 500,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest(m)
            | Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::NotFound(m)
            | Self::Conflict(m)
            | Self::Gone(m)
            | Self::Internal(m) => m,
        }
    }

    /// Build a closure that wraps a DB/IO error as `Internal`.
    pub fn from_db<E: std::fmt::Display>(context: &str) -> impl FnOnce(E) -> Self + '_ {
        move |e| Self::Internal(format!("{context}: {e}"))
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ServiceError {}

impl From<taskdeck_core::CoreError> for ServiceError {
    fn from(e: taskdeck_core::CoreError) -> Self {
        Self::BadRequest(e.to_string())
    }
}
