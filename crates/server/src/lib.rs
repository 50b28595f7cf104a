//! Taskdeck HTTP server: application state, router, and background work.

pub mod error;
pub mod extract;
pub mod routes;
pub mod storage;
pub mod sweep;

use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef},
    routing::{delete, get, patch, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use taskdeck_runtime_config::ServerConfig;

pub use storage::Db;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub config: AppConfig,
}

/// Settings handlers need at request time.
#[derive(Clone)]
pub struct AppConfig {
    pub base_url: String,
    pub jwt_secret: String,
    pub password_iterations: u32,
    pub invitation_ttl_days: i64,
    pub body_limit_bytes: usize,
}

impl AppConfig {
    /// Derive request-time settings from the loaded server config.
    ///
    /// `jwt_secret` is passed separately because the caller may have
    /// generated one when none was configured.
    pub fn from_server_config(config: &ServerConfig, jwt_secret: String) -> Self {
        Self {
            base_url: config.server.base_url.clone(),
            jwt_secret,
            password_iterations: config.auth.password_iterations,
            invitation_ttl_days: config.invitations.ttl_days,
            body_limit_bytes: config.server.body_limit_bytes,
        }
    }
}

impl FromRef<AppState> for Db {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

/// Build the full application router.
pub fn build_router(state: AppState) -> Router {
    use routes::{
        attendance, auth, bugs, client_invitations, health, members, notifications, projects,
        reports, tasks, weekly_reports, workspaces,
    };

    let body_limit = state.config.body_limit_bytes;

    let api = Router::new()
        // Health
        .route("/health", get(health::health))
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        // Workspaces
        .route(
            "/workspaces",
            post(workspaces::create_workspace).get(workspaces::list_workspaces),
        )
        .route(
            "/workspaces/{id}",
            get(workspaces::get_workspace)
                .patch(workspaces::update_workspace)
                .delete(workspaces::delete_workspace),
        )
        .route(
            "/workspaces/{id}/reset-invite-code",
            post(workspaces::reset_invite_code),
        )
        .route("/workspaces/{id}/join", post(workspaces::join_workspace))
        .route("/workspaces/{id}/members", get(members::list_members))
        .route(
            "/workspaces/{id}/analytics",
            get(reports::workspace_analytics),
        )
        // Members
        .route(
            "/members/{member_id}",
            patch(members::update_member).delete(members::remove_member),
        )
        // Projects
        .route(
            "/projects",
            post(projects::create_project).get(projects::list_projects),
        )
        .route(
            "/projects/{id}",
            get(projects::get_project)
                .patch(projects::update_project)
                .delete(projects::delete_project),
        )
        .route("/projects/{id}/analytics", get(reports::project_analytics))
        .route(
            "/projects/{id}/client-invitations",
            post(client_invitations::create_invitation).get(client_invitations::list_invitations),
        )
        // Tasks
        .route("/tasks", post(tasks::create_task).get(tasks::list_tasks))
        .route("/tasks/bulk-update", post(tasks::bulk_update))
        .route("/tasks/import", post(tasks::import_tasks))
        .route(
            "/tasks/{id}",
            get(tasks::get_task)
                .patch(tasks::update_task)
                .delete(tasks::delete_task),
        )
        // Bugs
        .route("/bugs", post(bugs::create_bug).get(bugs::list_bugs))
        .route(
            "/bugs/{id}",
            get(bugs::get_bug)
                .patch(bugs::update_bug)
                .delete(bugs::delete_bug),
        )
        // Attendance
        .route("/attendance", get(attendance::list_attendance))
        .route("/attendance/start-shift", post(attendance::start_shift))
        .route("/attendance/end-shift", post(attendance::end_shift))
        .route("/attendance/active", get(attendance::active_shift))
        .route("/attendance/auto-end", post(attendance::auto_end))
        // Notifications
        .route("/notifications", get(notifications::list_notifications))
        .route(
            "/notifications/unread-count",
            get(notifications::unread_count),
        )
        .route("/notifications/read-all", post(notifications::read_all))
        .route("/notifications/{id}/read", patch(notifications::mark_read))
        .route(
            "/notifications/{id}",
            delete(notifications::delete_notification),
        )
        // Weekly reports
        .route(
            "/weekly-reports",
            post(weekly_reports::create_report).get(weekly_reports::list_reports),
        )
        .route(
            "/weekly-reports/{id}",
            get(weekly_reports::get_report)
                .patch(weekly_reports::update_report)
                .delete(weekly_reports::delete_report),
        )
        // Client invitations
        .route(
            "/client-invitations/verify",
            get(client_invitations::verify_invitation),
        )
        .route(
            "/client-invitations/accept",
            post(client_invitations::accept_invitation),
        )
        .route(
            "/client-invitations/{id}",
            delete(client_invitations::revoke_invitation),
        )
        // Reports
        .route("/reports", get(reports::task_report))
        .layer(DefaultBodyLimit::max(body_limit));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
