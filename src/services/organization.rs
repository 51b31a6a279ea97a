//! Organization settings.

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::services::access::Role;
use crate::services::profile::Profile;
use crate::services::record::{RecordError, required_line};

const MAX_TIMEZONE_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub timezone: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrganizationPatch {
    pub name: Option<String>,
    pub timezone: Option<String>,
}

/// Accept IANA-style names such as `UTC`, `Europe/Berlin`, `Etc/GMT+5`.
pub(crate) fn validate_timezone(raw: &str) -> Result<String, RecordError> {
    let tz = raw.trim();
    let well_formed = !tz.is_empty()
        && tz.len() <= MAX_TIMEZONE_LEN
        && !tz.starts_with('/')
        && !tz.ends_with('/')
        && !tz.contains("//")
        && tz
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '-' | '+'));
    if !well_formed {
        return Err(RecordError::Invalid(format!("timezone is not a valid zone name: {tz:?}")));
    }
    Ok(tz.to_owned())
}

/// Load the organization.
///
/// # Errors
///
/// Returns `NotFound` if the organization does not exist.
pub async fn get_organization(pool: &PgPool, organization_id: Uuid) -> Result<Organization, RecordError> {
    let row = sqlx::query("SELECT id, name, timezone, created_at FROM organizations WHERE id = $1")
        .bind(organization_id)
        .fetch_optional(pool)
        .await?
        .ok_or(RecordError::NotFound("organization"))?;

    Ok(Organization {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        timezone: row.try_get("timezone")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Update name and/or timezone of the actor's organization. Admin only.
///
/// # Errors
///
/// Returns `Forbidden` for non-admins, `Invalid` for bad input, or a
/// database error.
pub async fn update_organization(pool: &PgPool, actor: &Profile, patch: OrganizationPatch) -> Result<Organization, RecordError> {
    if actor.role != Role::Admin {
        return Err(RecordError::Forbidden("change organization settings"));
    }
    let name = patch
        .name
        .as_deref()
        .map(|name| required_line("name", name))
        .transpose()?;
    let timezone = patch.timezone.as_deref().map(validate_timezone).transpose()?;

    sqlx::query(
        "UPDATE organizations
         SET name = COALESCE($2, name), timezone = COALESCE($3, timezone)
         WHERE id = $1",
    )
    .bind(actor.organization_id)
    .bind(&name)
    .bind(&timezone)
    .execute(pool)
    .await?;

    info!(organization_id = %actor.organization_id, updated_by = %actor.id, "organization settings updated");
    get_organization(pool, actor.organization_id).await
}

#[cfg(test)]
#[path = "organization_test.rs"]
mod tests;
