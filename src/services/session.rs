//! Session token management.
//!
//! ARCHITECTURE
//! ============
//! Login creates an opaque random token stored in `sessions` with an expiry.
//! Browsers carry it in an HttpOnly cookie; other clients send it as a bearer
//! token. Validation joins the profile and refuses inactive accounts, so
//! deactivating a user cuts off existing sessions immediately.

use std::fmt::Write;
use std::time::Duration;

use rand::Rng;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::MAX_SESSION_TTL;
use crate::services::profile::{PROFILE_COLUMNS, Profile, profile_from_row};
use crate::services::record::RecordError;

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

pub(crate) fn hex_to_bytes(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| hex.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
        .collect()
}

/// Generate a cryptographically random 32-byte hex token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

/// Create a session for the given profile, returning the token.
///
/// # Errors
///
/// Returns a database error if the insert fails.
pub async fn create_session(pool: &PgPool, profile_id: Uuid, ttl: Duration) -> Result<String, sqlx::Error> {
    let token = generate_token();
    let ttl_secs = i64::try_from(ttl.min(MAX_SESSION_TTL).as_secs()).unwrap_or(i64::MAX);
    sqlx::query(
        "INSERT INTO sessions (token, profile_id, expires_at)
         VALUES ($1, $2, now() + make_interval(secs => $3::double precision))",
    )
    .bind(&token)
    .bind(profile_id)
    .bind(ttl_secs)
    .execute(pool)
    .await?;
    Ok(token)
}

/// Validate a session token and return the associated active profile.
///
/// # Errors
///
/// Returns a database error if the lookup fails.
pub async fn validate_session(pool: &PgPool, token: &str) -> Result<Option<Profile>, RecordError> {
    let query = format!(
        "SELECT {PROFILE_COLUMNS}
         FROM sessions s
         JOIN profiles p ON p.id = s.profile_id
         WHERE s.token = $1 AND s.expires_at > now() AND p.active"
    );
    let row = sqlx::query(&query).bind(token).fetch_optional(pool).await?;
    row.as_ref().map(profile_from_row).transpose()
}

/// Delete a session by token.
///
/// # Errors
///
/// Returns a database error if the delete fails.
pub async fn delete_session(pool: &PgPool, token: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM sessions WHERE token = $1")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

/// Delete every session of a profile, optionally keeping one token alive.
///
/// # Errors
///
/// Returns a database error if the delete fails.
pub async fn delete_profile_sessions(pool: &PgPool, profile_id: Uuid, keep: Option<&str>) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sessions WHERE profile_id = $1 AND ($2::text IS NULL OR token <> $2)")
        .bind(profile_id)
        .bind(keep)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
