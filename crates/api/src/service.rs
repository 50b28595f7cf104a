//! Shared business logic as framework-agnostic pure functions.
//!
//! Route handlers stay thin adapters: they validate through here, then hit
//! the database.

use chrono::NaiveDate;
use taskdeck_core::time;

use crate::{AuthTokenResponse, ServiceError, UserResponse};

// ─── Validation ─────────────────────────────────────────────────────────────

/// Validate and normalize an email address. Returns the lowercased, trimmed email.
pub fn validate_email(email: &str) -> Result<String, ServiceError> {
    let email = email.trim().to_lowercase();
    let valid_shape = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid_shape || email.len() > 254 || email.contains(char::is_whitespace) {
        return Err(ServiceError::BadRequest("invalid email address".into()));
    }
    Ok(email)
}

/// Validate a password (8-64 characters).
pub fn validate_password(password: &str) -> Result<(), ServiceError> {
    let len = password.chars().count();
    if len < 8 {
        return Err(ServiceError::BadRequest(
            "password must be at least 8 characters".into(),
        ));
    }
    if len > 64 {
        return Err(ServiceError::BadRequest(
            "password must be at most 64 characters".into(),
        ));
    }
    Ok(())
}

/// Trim a required display name and bound its length.
pub fn validate_name(field: &str, value: &str, max: usize) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.chars().count() > max {
        return Err(ServiceError::BadRequest(format!(
            "{field} must be 1-{max} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Trim optional free text; blank input becomes `None`.
pub fn normalize_text(field: &str, value: Option<&str>, max: usize) -> Result<Option<String>, ServiceError> {
    let Some(trimmed) = value.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if trimmed.chars().count() > max {
        return Err(ServiceError::BadRequest(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(Some(trimmed.to_string()))
}

/// Parse an optional `YYYY-MM-DD` field.
pub fn parse_optional_date(raw: Option<&str>) -> Result<Option<NaiveDate>, ServiceError> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(time::parse_date)
        .transpose()
        .map_err(ServiceError::from)
}

/// Validate a task estimate in hours.
pub fn validate_estimate(hours: Option<f64>) -> Result<Option<f64>, ServiceError> {
    match hours {
        Some(h) if !h.is_finite() || h < 0.0 => Err(ServiceError::BadRequest(
            "estimated_hours must be a non-negative number".into(),
        )),
        other => Ok(other),
    }
}

/// Trim labels, drop blanks and duplicates, keep first-seen order.
pub fn normalize_labels(labels: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for label in labels.iter().map(|l| l.trim()).filter(|l| !l.is_empty()) {
        if !out.iter().any(|l| l == label) {
            out.push(label.to_string());
        }
    }
    out
}

// ─── Invite codes ───────────────────────────────────────────────────────────

pub const INVITE_CODE_LEN: usize = 10;
const INVITE_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnpqrstuvwxyz23456789";

/// Generate a workspace invite code.
pub fn generate_invite_code() -> Result<String, ServiceError> {
    crate::crypto::random_string(INVITE_CODE_ALPHABET, INVITE_CODE_LEN)
}

/// Timestamp `days` after `now_unix`, in the storage format.
pub fn expiry_after_days(now_unix: u64, days: i64) -> Result<String, ServiceError> {
    let base = chrono::DateTime::from_timestamp(now_unix as i64, 0)
        .ok_or_else(|| ServiceError::Internal("invalid timestamp".into()))?;
    base.checked_add_signed(chrono::Duration::days(days))
        .map(|t| time::format_datetime(t.naive_utc()))
        .ok_or_else(|| ServiceError::Internal("timestamp overflow".into()))
}

// ─── Auth Token Resolution ──────────────────────────────────────────────────

/// Extract the user id from a bearer token.
pub fn resolve_bearer(token: &str, jwt_secret: &str, now: u64) -> Result<String, ServiceError> {
    if jwt_secret.is_empty() {
        return Err(ServiceError::Unauthorized(
            "authentication not configured".into(),
        ));
    }
    crate::crypto::verify_jwt(token, jwt_secret, now)
}

// ─── Token Bundle ───────────────────────────────────────────────────────────

/// Pre-computed token bundle returned by [`prepare_token_bundle`].
///
/// The caller only needs to insert the refresh token row.
pub struct TokenBundle {
    /// SHA-256 hash of the refresh token (stored in DB).
    pub token_hash: String,
    /// UUID primary key for the refresh_tokens row.
    pub token_id: String,
    /// Refresh token expiry (DB column value).
    pub expires_at: String,
    /// Ready-to-return API response.
    pub response: AuthTokenResponse,
}

/// Build a JWT, a refresh token, and the auth response for `user`.
pub fn prepare_token_bundle(
    jwt_secret: &str,
    user: UserResponse,
    now_unix: u64,
) -> Result<TokenBundle, ServiceError> {
    use crate::crypto;

    let access_token = crypto::sign_jwt(&user.id, jwt_secret, now_unix)?;
    let refresh_token = crypto::generate_token()?;
    let token_hash = crypto::hash_token(&refresh_token);
    let token_id = uuid::Uuid::new_v4().to_string();

    let base = chrono::DateTime::from_timestamp(now_unix as i64, 0)
        .ok_or_else(|| ServiceError::Internal("invalid timestamp".into()))?;
    let expires_at = base
        .checked_add_signed(chrono::Duration::seconds(
            crypto::REFRESH_EXPIRY_SECS as i64,
        ))
        .map(|t| time::format_datetime(t.naive_utc()))
        .ok_or_else(|| ServiceError::Internal("timestamp overflow".into()))?;

    Ok(TokenBundle {
        token_hash,
        token_id,
        expires_at,
        response: AuthTokenResponse {
            access_token,
            refresh_token,
            expires_in: crypto::JWT_EXPIRY_SECS,
            user,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert_eq!(validate_email("  Ann@Example.COM ").unwrap(), "ann@example.com");
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("ann@localhost").is_err());
        assert!(validate_email("a b@example.com").is_err());
    }

    #[test]
    fn test_validate_password_bounds() {
        assert!(validate_password("1234567").is_err());
        assert!(validate_password("12345678").is_ok());
        assert!(validate_password(&"x".repeat(64)).is_ok());
        assert!(validate_password(&"x".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("name", "  Ops  ", 64).unwrap(), "Ops");
        assert!(validate_name("name", "   ", 64).is_err());
        assert!(validate_name("name", &"x".repeat(65), 64).is_err());
    }

    #[test]
    fn test_normalize_text_and_labels() {
        assert_eq!(normalize_text("d", Some("  "), 10).unwrap(), None);
        assert_eq!(normalize_text("d", Some(" hi "), 10).unwrap(), Some("hi".into()));
        assert!(normalize_text("d", Some("01234567890"), 10).is_err());

        let labels = vec![" ui ".to_string(), "".into(), "ui".into(), "api".into()];
        assert_eq!(normalize_labels(&labels), vec!["ui".to_string(), "api".into()]);
    }

    #[test]
    fn test_invite_code_shape() {
        let code = generate_invite_code().unwrap();
        assert_eq!(code.len(), INVITE_CODE_LEN);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_expiry_after_days() {
        // 2024-01-01 00:00:00 UTC
        assert_eq!(expiry_after_days(1_704_067_200, 7).unwrap(), "2024-01-08 00:00:00");
    }

    #[test]
    fn test_token_bundle() {
        let user = UserResponse {
            id: "u1".into(),
            name: "Ann".into(),
            email: "ann@example.com".into(),
            created_at: "2024-01-01 00:00:00".into(),
        };
        let bundle = prepare_token_bundle("secret", user, 1_704_067_200).unwrap();
        assert_eq!(bundle.expires_at, "2024-01-08 00:00:00");
        assert_eq!(
            bundle.token_hash,
            crate::crypto::hash_token(&bundle.response.refresh_token)
        );
        assert_eq!(
            resolve_bearer(&bundle.response.access_token, "secret", 1_704_067_200).unwrap(),
            "u1"
        );
        assert!(resolve_bearer(&bundle.response.access_token, "", 1_704_067_200).is_err());
    }
}
