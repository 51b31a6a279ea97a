//! Shared pieces of the entity services: error type, priority, and input
//! validation helpers used by tasks, tickets, calls, messages and profiles.

use serde::{Deserialize, Deserializer, Serialize};
use sqlx::PgPool;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use crate::error::ErrorCode;

/// Longest accepted single-line text field (titles, names, subjects).
pub const MAX_LINE_LEN: usize = 200;
/// Longest accepted free-text field (descriptions, notes, bodies).
pub const MAX_TEXT_LEN: usize = 10_000;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("you do not have permission to {0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    Invalid(String),
    #[error("{0}")]
    Conflict(String),
    #[error("unexpected {column} value in database: {value:?}")]
    Decode { column: &'static str, value: String },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("background task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl ErrorCode for RecordError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_NOT_FOUND",
            Self::Forbidden(_) => "E_FORBIDDEN",
            Self::Invalid(_) => "E_INVALID",
            Self::Conflict(_) => "E_CONFLICT",
            Self::Decode { .. } | Self::Database(_) => "E_DATABASE",
            Self::Worker(_) => "E_INTERNAL",
        }
    }
}

/// Map a unique-constraint violation to `Conflict`, everything else to `Database`.
pub(crate) fn conflict_or_database(err: sqlx::Error, message: &str) -> RecordError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return RecordError::Conflict(message.to_owned());
        }
    }
    RecordError::Database(err)
}

// =============================================================================
// PRIORITY
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    #[allow(clippy::should_implement_trait)]
    #[must_use]
    pub fn from_str(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "urgent" => Some(Self::Urgent),
            _ => None,
        }
    }

    /// Numeric rank used for sorting; higher is more pressing.
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
            Self::Urgent => 3,
        }
    }
}

// =============================================================================
// INPUT HELPERS
// =============================================================================

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`).
/// Use with `#[serde(default, deserialize_with = "double_option")]`.
pub(crate) fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Trim and bound a required single-line field.
pub(crate) fn required_line(field: &str, value: &str) -> Result<String, RecordError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RecordError::Invalid(format!("{field} is required")));
    }
    if trimmed.chars().count() > MAX_LINE_LEN {
        return Err(RecordError::Invalid(format!("{field} must be at most {MAX_LINE_LEN} characters")));
    }
    Ok(trimmed.to_owned())
}

/// Trim an optional single-line field; blank becomes `None`.
pub(crate) fn optional_line(field: &str, value: Option<&str>) -> Result<Option<String>, RecordError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => required_line(field, v).map(Some),
    }
}

/// Bound a free-text field. Leading/trailing whitespace is kept except for
/// fully blank input.
pub(crate) fn free_text(field: &str, value: &str) -> Result<String, RecordError> {
    if value.chars().count() > MAX_TEXT_LEN {
        return Err(RecordError::Invalid(format!("{field} must be at most {MAX_TEXT_LEN} characters")));
    }
    if value.trim().is_empty() {
        return Ok(String::new());
    }
    Ok(value.to_owned())
}

/// Parse an RFC 3339 timestamp field.
pub(crate) fn parse_timestamp(field: &str, value: &str) -> Result<OffsetDateTime, RecordError> {
    OffsetDateTime::parse(value.trim(), &Rfc3339)
        .map_err(|_| RecordError::Invalid(format!("{field} must be an RFC 3339 timestamp")))
}

pub(crate) fn parse_optional_timestamp(field: &str, value: Option<&str>) -> Result<Option<OffsetDateTime>, RecordError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => parse_timestamp(field, v).map(Some),
    }
}

/// Parse an enum-valued input field with the enum's own parser.
pub(crate) fn parse_enum<T>(field: &str, value: &str, parse: fn(&str) -> Option<T>) -> Result<T, RecordError> {
    parse(value).ok_or_else(|| RecordError::Invalid(format!("unknown {field}: {:?}", value.trim())))
}

/// Parse an enum-valued column read back from Postgres.
pub(crate) fn decode_enum<T>(column: &'static str, value: String, parse: fn(&str) -> Option<T>) -> Result<T, RecordError> {
    parse(&value).ok_or(RecordError::Decode { column, value })
}

// =============================================================================
// SHARED QUERIES
// =============================================================================

/// Verify that `profile_id` is an active profile of `organization_id`.
///
/// # Errors
///
/// Returns `Invalid` if the profile is missing, inactive or in another
/// organization, or a database error if the lookup fails.
pub async fn ensure_active_member(
    pool: &PgPool,
    organization_id: Uuid,
    profile_id: Uuid,
    field: &str,
) -> Result<(), RecordError> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(
            SELECT 1 FROM profiles
            WHERE id = $1 AND organization_id = $2 AND active
        )",
    )
    .bind(profile_id)
    .bind(organization_id)
    .fetch_one(pool)
    .await?;

    if !exists {
        return Err(RecordError::Invalid(format!("{field} must be an active user in your organization")));
    }
    Ok(())
}

#[cfg(test)]
#[path = "record_test.rs"]
mod tests;
