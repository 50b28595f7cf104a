use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use rusqlite::Connection;

use taskdeck_api::{
    AcceptInvitationRequest, AcceptInvitationResponse, ClientInvitationResponse,
    CreateClientInvitationRequest, CreateClientInvitationResponse, Data, InvitationRejection,
    NotificationKind, OkResponse, VerifyInvitationQuery, VerifyInvitationResponse, WorkspaceRole,
    crypto, db, service,
};
use taskdeck_core::{invitation, time};

use super::access::{load_project, member_role, require_admin};
use super::auth::AuthUser;
use super::notifications::{Notice, notify};
use super::{ApiResult, created, new_id, now_unix, ok};
use crate::AppConfig;
use crate::error::ApiErr;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::storage::{Db, invitation_from_row, now_string, sq_count, sq_execute, sq_query_map, sq_query_opt};

/// An invitation looked up by token, with the names shown to the invitee.
struct TokenLookup {
    invitation: ClientInvitationResponse,
    project_name: String,
    workspace_name: String,
}

fn find_by_token(conn: &Connection, token: &str) -> ApiResult<Option<TokenLookup>> {
    let token_hash = crypto::hash_token(token.trim());
    sq_query_opt(
        conn,
        db::client_invitations::get_by_token_hash(&token_hash),
        |row| {
            Ok(TokenLookup {
                invitation: invitation_from_row(row)?,
                project_name: row.get(9)?,
                workspace_name: row.get(10)?,
            })
        },
    )
    .map_err(ApiErr::from_db("invitation token lookup"))
}

/// Whether the invitation can still be accepted right now.
fn usable(invitation: &ClientInvitationResponse) -> ApiResult<Result<(), InvitationRejection>> {
    let expires_at = time::parse_datetime(&invitation.expires_at)?;
    Ok(invitation::check(invitation.status, expires_at, time::now_utc()))
}

fn load_pending(conn: &Connection, id: &str) -> ApiResult<ClientInvitationResponse> {
    sq_query_opt(conn, db::client_invitations::get_by_id(id), invitation_from_row)
        .map_err(ApiErr::from_db("invitation lookup"))?
        .ok_or_else(|| ApiErr::not_found("invitation not found"))
}

/// POST /api/projects/{id}/client-invitations
pub async fn create_invitation(
    State(db): State<Db>,
    State(config): State<AppConfig>,
    user: AuthUser,
    ApiPath(project_id): ApiPath<String>,
    ApiJson(req): ApiJson<CreateClientInvitationRequest>,
) -> ApiResult<(StatusCode, Json<Data<CreateClientInvitationResponse>>)> {
    let email = service::validate_email(&req.email)?;

    let conn = db.conn();
    let (project, _) = load_project(&conn, &project_id, &user.user_id)?;
    require_admin(&conn, &project.workspace_id, &user.user_id)?;

    let pending = sq_count(
        &conn,
        db::client_invitations::pending_count(&project.id, &email, &now_string()),
    )
    .map_err(ApiErr::from_db("pending invitation count"))?;
    if pending > 0 {
        return Err(ApiErr::conflict(
            "a pending invitation already exists for this email",
        ));
    }

    let token = crypto::generate_token()?;
    let expires_at = service::expiry_after_days(now_unix(), config.invitation_ttl_days)?;
    let id = new_id();
    sq_execute(
        &conn,
        db::client_invitations::insert(
            &id,
            &project.workspace_id,
            &project.id,
            &email,
            &crypto::hash_token(&token),
            &user.user_id,
            &expires_at,
        ),
    )
    .map_err(ApiErr::from_db("insert invitation"))?;

    let invitation = load_pending(&conn, &id)?;
    tracing::info!(project_id = %project.id, invitation_id = %id, "client invited");
    Ok(created(CreateClientInvitationResponse { invitation, token }))
}

/// GET /api/projects/{id}/client-invitations
pub async fn list_invitations(
    State(db): State<Db>,
    user: AuthUser,
    ApiPath(project_id): ApiPath<String>,
) -> ApiResult<Json<Data<Vec<ClientInvitationResponse>>>> {
    let conn = db.conn();
    let (project, _) = load_project(&conn, &project_id, &user.user_id)?;
    require_admin(&conn, &project.workspace_id, &user.user_id)?;
    sq_query_map(
        &conn,
        db::client_invitations::list_by_project(&project.id),
        invitation_from_row,
    )
    .map(ok)
    .map_err(ApiErr::from_db("list invitations"))
}

/// DELETE /api/client-invitations/{id}: revoke a pending invitation.
pub async fn revoke_invitation(
    State(db): State<Db>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Data<OkResponse>>> {
    let conn = db.conn();
    let invitation = load_pending(&conn, &id)?;
    require_admin(&conn, &invitation.workspace_id, &user.user_id)?;
    let n = sq_execute(&conn, db::client_invitations::revoke(&id))
        .map_err(ApiErr::from_db("revoke invitation"))?;
    if n == 0 {
        return Err(ApiErr::not_found("invitation not found"));
    }
    Ok(ok(OkResponse { ok: true }))
}

/// GET /api/client-invitations/verify?token=: public preview of an invitation.
pub async fn verify_invitation(
    State(db): State<Db>,
    ApiQuery(q): ApiQuery<VerifyInvitationQuery>,
) -> ApiResult<Json<Data<VerifyInvitationResponse>>> {
    let conn = db.conn();
    let Some(found) = find_by_token(&conn, &q.token)? else {
        return Ok(ok(VerifyInvitationResponse {
            valid: false,
            reason: Some(InvitationRejection::NotFound),
            email: None,
            project_name: None,
            workspace_name: None,
            expires_at: None,
        }));
    };

    let reason = usable(&found.invitation)?.err();
    Ok(ok(VerifyInvitationResponse {
        valid: reason.is_none(),
        reason,
        email: Some(found.invitation.email),
        project_name: Some(found.project_name),
        workspace_name: Some(found.workspace_name),
        expires_at: Some(found.invitation.expires_at),
    }))
}

/// POST /api/client-invitations/accept
pub async fn accept_invitation(
    State(db): State<Db>,
    user: AuthUser,
    ApiJson(req): ApiJson<AcceptInvitationRequest>,
) -> ApiResult<Json<Data<AcceptInvitationResponse>>> {
    let mut conn = db.conn();
    let found = find_by_token(&conn, &req.token)?
        .ok_or_else(|| ApiErr::not_found(InvitationRejection::NotFound.message()))?;
    let invitation = found.invitation;

    match usable(&invitation)? {
        Ok(()) => {}
        Err(reason @ InvitationRejection::Expired) => return Err(ApiErr::gone(reason.message())),
        Err(reason) => return Err(ApiErr::bad_request(reason.message())),
    }
    if !invitation.email.eq_ignore_ascii_case(&user.email) {
        return Err(ApiErr::forbidden(
            "this invitation was sent to a different email address",
        ));
    }

    let existing = member_role(&conn, &invitation.workspace_id, &user.user_id)?;
    let tx = conn
        .transaction()
        .map_err(ApiErr::from_db("begin accept invitation"))?;
    if existing.is_none() {
        sq_execute(
            &tx,
            db::workspaces::member_insert(
                &new_id(),
                &invitation.workspace_id,
                &user.user_id,
                WorkspaceRole::Client.as_str(),
            ),
        )
        .map_err(ApiErr::from_db("insert client membership"))?;
    }
    sq_execute(
        &tx,
        db::projects::grant_client(&invitation.project_id, &user.user_id),
    )
    .map_err(ApiErr::from_db("grant project access"))?;
    let n = sq_execute(
        &tx,
        db::client_invitations::mark_accepted(&invitation.id, &user.user_id, &now_string()),
    )
    .map_err(ApiErr::from_db("mark invitation accepted"))?;
    if n == 0 {
        return Err(ApiErr::bad_request(
            InvitationRejection::AlreadyAccepted.message(),
        ));
    }
    notify(
        &tx,
        &user.user_id,
        Notice {
            user_id: &invitation.invited_by,
            workspace_id: Some(&invitation.workspace_id),
            kind: NotificationKind::ClientJoined,
            title: "Client joined".to_string(),
            message: format!("{} accepted the invitation to {}", user.name, found.project_name),
            metadata: serde_json::json!({
                "project_id": invitation.project_id,
                "user_id": user.user_id,
            }),
        },
    )?;
    tx.commit()
        .map_err(ApiErr::from_db("commit accept invitation"))?;

    tracing::info!(
        project_id = %invitation.project_id,
        user_id = %user.user_id,
        "client invitation accepted"
    );
    Ok(ok(AcceptInvitationResponse {
        workspace_id: invitation.workspace_id,
        project_id: invitation.project_id,
        role: existing.unwrap_or(WorkspaceRole::Client),
    }))
}
