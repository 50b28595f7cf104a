//! User / auth query builders.

use sea_query::{Alias, Asterisk, Expr, Func, Query, SqliteQueryBuilder};

use super::Built;
use super::tables::{RefreshTokens, Users};

// ── User lookups ───────────────────────────────────────────────────────────

/// Public profile columns: id, name, email, created_at.
const PROFILE: [Users; 4] = [Users::Id, Users::Name, Users::Email, Users::CreatedAt];

/// Find user by id.
pub fn get_by_id(user_id: &str) -> Built {
    Query::select()
        .columns(PROFILE)
        .from(Users::Table)
        .and_where(Expr::col(Users::Id).eq(user_id))
        .build(SqliteQueryBuilder)
}

/// Find user by email for login: profile columns followed by password_hash.
pub fn get_for_login(email: &str) -> Built {
    Query::select()
        .columns(PROFILE)
        .column(Users::PasswordHash)
        .from(Users::Table)
        .and_where(Expr::col(Users::Email).eq(email))
        .build(SqliteQueryBuilder)
}

/// Count users with this email.
pub fn email_count(email: &str) -> Built {
    Query::select()
        .expr_as(Func::count(Expr::col(Asterisk)), Alias::new("count"))
        .from(Users::Table)
        .and_where(Expr::col(Users::Email).eq(email))
        .build(SqliteQueryBuilder)
}

// ── User inserts ───────────────────────────────────────────────────────────

pub fn insert(id: &str, name: &str, email: &str, password_hash: &str) -> Built {
    Query::insert()
        .into_table(Users::Table)
        .columns([Users::Id, Users::Name, Users::Email, Users::PasswordHash])
        .values_panic([id.into(), name.into(), email.into(), password_hash.into()])
        .build(SqliteQueryBuilder)
}

// ── Refresh tokens ─────────────────────────────────────────────────────────

pub fn insert_refresh_token(id: &str, user_id: &str, token_hash: &str, expires_at: &str) -> Built {
    Query::insert()
        .into_table(RefreshTokens::Table)
        .columns([
            RefreshTokens::Id,
            RefreshTokens::UserId,
            RefreshTokens::TokenHash,
            RefreshTokens::ExpiresAt,
        ])
        .values_panic([
            id.into(),
            user_id.into(),
            token_hash.into(),
            expires_at.into(),
        ])
        .build(SqliteQueryBuilder)
}

/// Owner of an unexpired refresh token.
pub fn refresh_token_owner(token_hash: &str, now: &str) -> Built {
    Query::select()
        .column(RefreshTokens::UserId)
        .from(RefreshTokens::Table)
        .and_where(Expr::col(RefreshTokens::TokenHash).eq(token_hash))
        .and_where(Expr::col(RefreshTokens::ExpiresAt).gt(now))
        .build(SqliteQueryBuilder)
}

pub fn delete_refresh_token(token_hash: &str) -> Built {
    Query::delete()
        .from_table(RefreshTokens::Table)
        .and_where(Expr::col(RefreshTokens::TokenHash).eq(token_hash))
        .build(SqliteQueryBuilder)
}

/// Drop a user's expired refresh tokens.
pub fn delete_expired_refresh_tokens(user_id: &str, now: &str) -> Built {
    Query::delete()
        .from_table(RefreshTokens::Table)
        .and_where(Expr::col(RefreshTokens::UserId).eq(user_id))
        .and_where(Expr::col(RefreshTokens::ExpiresAt).lte(now))
        .build(SqliteQueryBuilder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_query_selects_hash_last() {
        let (sql, values) = get_for_login("ann@example.com");
        assert!(sql.ends_with(r#""password_hash" FROM "users" WHERE "email" = ?"#), "{sql}");
        assert_eq!(values.0.len(), 1);
    }

    #[test]
    fn test_refresh_lookup_filters_expired() {
        let (sql, values) = refresh_token_owner("h", "2024-01-01 00:00:00");
        assert!(sql.contains(r#""expires_at" > ?"#), "{sql}");
        assert_eq!(values.0.len(), 2);
    }
}
