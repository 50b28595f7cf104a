use axum::{
    Json,
    extract::{FromRef, FromRequestParts, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
};
use rusqlite::Connection;

use taskdeck_api::{
    AuthTokenResponse, Data, LoginRequest, LogoutRequest, OkResponse, RefreshRequest,
    RegisterRequest, UserResponse, crypto, db, service,
};

use super::{ApiResult, created, new_id, now_unix, ok};
use crate::AppConfig;
use crate::error::ApiErr;
use crate::extract::ApiJson;
use crate::storage::{
    Db, is_unique_violation, now_string, sq_count, sq_execute, sq_query_opt, user_from_row,
};

// ---------------------------------------------------------------------------
// Auth extractor
// ---------------------------------------------------------------------------

/// Authenticated user extracted from the `Authorization: Bearer <jwt>` header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub name: String,
    pub email: String,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Db: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiErr;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| ApiErr::unauthorized("missing or invalid Authorization header"))?;

        let config = AppConfig::from_ref(state);
        let user_id = service::resolve_bearer(token.trim(), &config.jwt_secret, now_unix())?;

        let db = Db::from_ref(state);
        let conn = db.conn();
        let user = sq_query_opt(&conn, db::users::get_by_id(&user_id), user_from_row)
            .map_err(ApiErr::from_db("auth user lookup"))?
            .ok_or_else(|| ApiErr::unauthorized("user no longer exists"))?;

        Ok(AuthUser {
            user_id: user.id,
            name: user.name,
            email: user.email,
        })
    }
}

/// Insert a fresh refresh token for `user` and build the response bundle.
fn issue_tokens(
    conn: &Connection,
    jwt_secret: &str,
    user: UserResponse,
) -> ApiResult<AuthTokenResponse> {
    let bundle = service::prepare_token_bundle(jwt_secret, user, now_unix())?;
    sq_execute(
        conn,
        db::users::delete_expired_refresh_tokens(&bundle.response.user.id, &now_string()),
    )
    .map_err(ApiErr::from_db("prune refresh tokens"))?;
    sq_execute(
        conn,
        db::users::insert_refresh_token(
            &bundle.token_id,
            &bundle.response.user.id,
            &bundle.token_hash,
            &bundle.expires_at,
        ),
    )
    .map_err(ApiErr::from_db("insert refresh token"))?;
    Ok(bundle.response)
}

/// PBKDF2 at production iteration counts takes a noticeable slice of a
/// second; keep it off the async workers.
async fn run_blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(ApiErr::from_db("password hashing task"))
}

// ---------------------------------------------------------------------------
// Register
// ---------------------------------------------------------------------------

/// POST /api/auth/register
pub async fn register(
    State(db): State<Db>,
    State(config): State<AppConfig>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<Data<AuthTokenResponse>>)> {
    let name = service::validate_name("name", &req.name, 64)?;
    let email = service::validate_email(&req.email)?;
    service::validate_password(&req.password)?;

    {
        let conn = db.conn();
        let taken = sq_count(&conn, db::users::email_count(&email))
            .map_err(ApiErr::from_db("email lookup"))?;
        if taken > 0 {
            return Err(ApiErr::conflict("email already registered"));
        }
    }

    let iterations = config.password_iterations;
    let password = req.password;
    let password_hash =
        run_blocking(move || crypto::hash_password(&password, iterations)).await??;

    let user_id = new_id();
    let conn = db.conn();
    sq_execute(&conn, db::users::insert(&user_id, &name, &email, &password_hash)).map_err(
        |e| {
            if is_unique_violation(&e) {
                ApiErr::conflict("email already registered")
            } else {
                ApiErr::from_db("register")(e)
            }
        },
    )?;
    let user = sq_query_opt(&conn, db::users::get_by_id(&user_id), user_from_row)
        .map_err(ApiErr::from_db("load new user"))?
        .ok_or_else(|| ApiErr::internal("internal server error"))?;

    tracing::info!(user_id = %user.id, "user registered");
    Ok(created(issue_tokens(&conn, &config.jwt_secret, user)?))
}

// ---------------------------------------------------------------------------
// Login / refresh / logout
// ---------------------------------------------------------------------------

/// POST /api/auth/login
pub async fn login(
    State(db): State<Db>,
    State(config): State<AppConfig>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<Data<AuthTokenResponse>>> {
    let invalid = || ApiErr::unauthorized("invalid email or password");
    let email = service::validate_email(&req.email).map_err(|_| invalid())?;

    let found = {
        let conn = db.conn();
        sq_query_opt(&conn, db::users::get_for_login(&email), |row| {
            Ok((user_from_row(row)?, row.get::<_, String>(4)?))
        })
        .map_err(ApiErr::from_db("login lookup"))?
    };
    let (user, stored_hash) = found.ok_or_else(invalid)?;

    let password = req.password;
    let matches = run_blocking(move || crypto::verify_password(&password, &stored_hash)).await?;
    if !matches {
        return Err(invalid());
    }

    let conn = db.conn();
    Ok(ok(issue_tokens(&conn, &config.jwt_secret, user)?))
}

/// POST /api/auth/refresh: rotate a refresh token.
pub async fn refresh(
    State(db): State<Db>,
    State(config): State<AppConfig>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> ApiResult<Json<Data<AuthTokenResponse>>> {
    let token_hash = crypto::hash_token(req.refresh_token.trim());
    let conn = db.conn();

    let user_id: String = sq_query_opt(
        &conn,
        db::users::refresh_token_owner(&token_hash, &now_string()),
        |row| row.get(0),
    )
    .map_err(ApiErr::from_db("refresh token lookup"))?
    .ok_or_else(|| ApiErr::unauthorized("invalid or expired refresh token"))?;

    sq_execute(&conn, db::users::delete_refresh_token(&token_hash))
        .map_err(ApiErr::from_db("delete refresh token"))?;

    let user = sq_query_opt(&conn, db::users::get_by_id(&user_id), user_from_row)
        .map_err(ApiErr::from_db("refresh user lookup"))?
        .ok_or_else(|| ApiErr::unauthorized("invalid or expired refresh token"))?;

    Ok(ok(issue_tokens(&conn, &config.jwt_secret, user)?))
}

/// POST /api/auth/logout
pub async fn logout(
    State(db): State<Db>,
    ApiJson(req): ApiJson<LogoutRequest>,
) -> ApiResult<Json<Data<OkResponse>>> {
    let token_hash = crypto::hash_token(req.refresh_token.trim());
    let conn = db.conn();
    sq_execute(&conn, db::users::delete_refresh_token(&token_hash))
        .map_err(ApiErr::from_db("logout"))?;
    Ok(ok(OkResponse { ok: true }))
}

/// GET /api/auth/me
pub async fn me(State(db): State<Db>, user: AuthUser) -> ApiResult<Json<Data<UserResponse>>> {
    let conn = db.conn();
    sq_query_opt(&conn, db::users::get_by_id(&user.user_id), user_from_row)
        .map_err(ApiErr::from_db("me"))?
        .map(ok)
        .ok_or_else(|| ApiErr::not_found("user not found"))
}
