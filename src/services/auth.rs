//! Password login service: email normalization, password hashing, and
//! credential checks.
//!
//! Password hashes are self-describing strings:
//! `pbkdf2-sha256$<iterations>$<salt hex>$<derived key hex>`, so the
//! iteration count can be raised without invalidating existing accounts.

use pbkdf2::pbkdf2_hmac;
use rand::Rng;
use sha2::Sha256;
use sqlx::{PgPool, Row};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::ErrorCode;
use crate::services::profile::{PROFILE_COLUMNS, Profile, profile_from_row};
use crate::services::record::RecordError;
use crate::services::session::{bytes_to_hex, hex_to_bytes};

pub const MIN_PASSWORD_LEN: usize = 8;
const HASH_SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("this account has been deactivated")]
    Inactive,
    #[error(transparent)]
    Record(#[from] RecordError),
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        Self::Record(RecordError::Database(err))
    }
}

impl ErrorCode for AuthError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials | Self::Inactive => "E_UNAUTHORIZED",
            Self::Record(err) => err.error_code(),
        }
    }
}

// =============================================================================
// EMAIL
// =============================================================================

#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let (local, domain) = normalized.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') || normalized.chars().any(char::is_whitespace) {
        return None;
    }
    Some(normalized)
}

/// Display name fallback derived from the local part of an email.
#[must_use]
pub fn name_from_email(email: &str) -> String {
    email
        .split('@')
        .next()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or("user")
        .to_owned()
}

// =============================================================================
// PASSWORDS
// =============================================================================

fn derive_key(password: &str, salt: &[u8], iterations: u32) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
    key
}

/// Hash a password with a fresh random salt.
#[must_use]
pub fn hash_password(password: &str, iterations: u32) -> String {
    let iterations = iterations.max(1);
    let salt: [u8; SALT_LEN] = rand::rng().random();
    let key = derive_key(password, &salt, iterations);
    format!("{HASH_SCHEME}${iterations}${}${}", bytes_to_hex(&salt), bytes_to_hex(&key))
}

/// Check a password against a stored hash. Malformed hashes never verify.
#[must_use]
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(scheme), Some(iterations), Some(salt), Some(expected), None) =
        (parts.next(), parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    if scheme != HASH_SCHEME {
        return false;
    }
    let Some(iterations) = iterations.parse::<u32>().ok().filter(|n| *n > 0) else {
        return false;
    };
    let (Some(salt), Some(expected)) = (hex_to_bytes(salt), hex_to_bytes(expected)) else {
        return false;
    };

    if expected.len() != KEY_LEN {
        return false;
    }

    let key = derive_key(password, &salt, iterations);
    key.as_slice().ct_eq(&expected).into()
}

/// Stored-hash stand-in for unknown emails, so a miss costs the same
/// derivation as a wrong password.
fn dummy_hash(iterations: u32) -> String {
    let zeros = "00".repeat(SALT_LEN);
    let key = "00".repeat(KEY_LEN);
    format!("{HASH_SCHEME}${}${zeros}${key}", iterations.max(1))
}

/// [`hash_password`] on the blocking pool.
///
/// # Errors
///
/// Returns `Worker` if the hashing task panicked.
pub async fn hash_password_blocking(password: &str, iterations: u32) -> Result<String, RecordError> {
    let password = password.to_owned();
    Ok(tokio::task::spawn_blocking(move || hash_password(&password, iterations)).await?)
}

/// [`verify_password`] on the blocking pool.
///
/// # Errors
///
/// Returns `Worker` if the verification task panicked.
pub async fn verify_password_blocking(password: &str, stored: &str) -> Result<bool, RecordError> {
    let (password, stored) = (password.to_owned(), stored.to_owned());
    Ok(tokio::task::spawn_blocking(move || verify_password(&password, &stored)).await?)
}

// =============================================================================
// LOGIN
// =============================================================================

/// Check an email/password pair and return the matching active profile.
///
/// # Errors
///
/// Returns `InvalidCredentials` for an unknown email or wrong password,
/// `Inactive` for a deactivated account, or a database error.
/// `hash_iterations` sets the cost of the dummy check run for unknown emails.
pub async fn authenticate(pool: &PgPool, email: &str, password: &str, hash_iterations: u32) -> Result<Profile, AuthError> {
    let Some(email) = normalize_email(email) else {
        return Err(AuthError::InvalidCredentials);
    };

    let query = format!("SELECT {PROFILE_COLUMNS}, p.password_hash FROM profiles p WHERE p.email = $1");
    let Some(row) = sqlx::query(&query).bind(&email).fetch_optional(pool).await? else {
        verify_password_blocking(password, &dummy_hash(hash_iterations)).await?;
        warn!(%email, "login rejected: unknown email");
        return Err(AuthError::InvalidCredentials);
    };

    let stored: String = row.try_get("password_hash")?;
    if !verify_password_blocking(password, &stored).await? {
        warn!(%email, "login rejected: wrong password");
        return Err(AuthError::InvalidCredentials);
    }

    let profile = profile_from_row(&row)?;
    if !profile.active {
        warn!(%email, profile_id = %profile.id, "login rejected: inactive account");
        return Err(AuthError::Inactive);
    }
    Ok(profile)
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
