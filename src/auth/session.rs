//! Opaque cookie sessions. The cookie carries a random token; only its SHA-256 digest
//! is stored in `app_sessions`.

use axum::http::HeaderValue;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use diesel::prelude::*;
use diesel::PgConnection;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::models::{AppUser, NewAppSession};
use crate::schema::{app_sessions, app_users};

pub const SESSION_COOKIE_NAME: &str = "app_session_id";

pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub fn create_session(
    conn: &mut PgConnection,
    user_id: Uuid,
    expiry_days: i64,
) -> QueryResult<IssuedSession> {
    let token = generate_session_token();
    let expires_at = Utc::now() + ChronoDuration::days(expiry_days);

    let new_session = NewAppSession {
        id: Uuid::new_v4(),
        user_id,
        token_hash: hash_session_token(&token),
        expires_at: expires_at.naive_utc(),
    };
    diesel::insert_into(app_sessions::table)
        .values(&new_session)
        .execute(conn)?;

    Ok(IssuedSession { token, expires_at })
}

/// Resolves a cookie token to its user when the session exists and has not expired.
pub fn find_session_user(conn: &mut PgConnection, token: &str) -> QueryResult<Option<AppUser>> {
    let now = Utc::now().naive_utc();
    app_sessions::table
        .inner_join(app_users::table)
        .filter(app_sessions::token_hash.eq(hash_session_token(token)))
        .filter(app_sessions::expires_at.gt(now))
        .select(app_users::all_columns)
        .first::<AppUser>(conn)
        .optional()
}

pub fn delete_session(conn: &mut PgConnection, token: &str) -> QueryResult<usize> {
    diesel::delete(app_sessions::table.filter(app_sessions::token_hash.eq(hash_session_token(token))))
        .execute(conn)
}

pub fn purge_expired_sessions(conn: &mut PgConnection) -> QueryResult<usize> {
    let now = Utc::now().naive_utc();
    diesel::delete(app_sessions::table.filter(app_sessions::expires_at.le(now))).execute(conn)
}

pub fn build_session_cookie(config: &AppConfig, session: &IssuedSession) -> HeaderValue {
    let max_age = ChronoDuration::days(config.session_expiry_days).num_seconds();

    let mut parts = vec![format!("{}={}", SESSION_COOKIE_NAME, session.token)];
    parts.push("Path=/".into());
    parts.push("HttpOnly".into());
    parts.push("SameSite=Lax".into());
    parts.push(format!("Max-Age={}", max_age));
    parts.push(format!("Expires={}", session.expires_at.to_rfc2822()));
    if config.session_cookie_secure {
        parts.push("Secure".into());
    }

    HeaderValue::from_str(&parts.join("; ")).expect("valid session cookie")
}

pub fn build_clear_session_cookie(config: &AppConfig) -> HeaderValue {
    let mut parts = vec![format!("{}=", SESSION_COOKIE_NAME)];
    parts.push("Path=/".into());
    parts.push("HttpOnly".into());
    parts.push("SameSite=Lax".into());
    parts.push("Max-Age=0".into());
    parts.push("Expires=Thu, 01 Jan 1970 00:00:00 GMT".into());
    if config.session_cookie_secure {
        parts.push("Secure".into());
    }

    HeaderValue::from_str(&parts.join("; ")).expect("valid session cookie")
}

fn hash_session_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
