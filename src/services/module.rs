//! Module catalog and per-organization grants.
//!
//! The `modules` table is a fixed catalog seeded by migration. Each
//! organization has one `organization_modules` row per module it has
//! configured; a module without a row is treated as disabled.

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::services::access::{ModuleGrant, ModuleKey, Role};
use crate::services::profile::Profile;
use crate::services::record::{RecordError, decode_enum, optional_line};

/// A catalog module joined with the organization's grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleSetting {
    pub key: ModuleKey,
    pub name: String,
    pub description: String,
    pub enabled: bool,
    pub team: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GrantUpdate {
    pub enabled: bool,
    pub team: Option<String>,
}

impl From<&ModuleSetting> for ModuleGrant {
    fn from(setting: &ModuleSetting) -> Self {
        Self { key: setting.key, enabled: setting.enabled, team: setting.team.clone() }
    }
}

/// Load every catalog module with the organization's grant state.
///
/// # Errors
///
/// Returns a database error, or `Decode` if the catalog holds an unknown key.
pub async fn list_module_settings(pool: &PgPool, organization_id: Uuid) -> Result<Vec<ModuleSetting>, RecordError> {
    let rows = sqlx::query(
        "SELECT m.key, m.name, m.description,
                COALESCE(om.enabled, FALSE) AS enabled, om.team
         FROM modules m
         LEFT JOIN organization_modules om
                ON om.module_id = m.id AND om.organization_id = $1
         ORDER BY m.sort_order, m.key",
    )
    .bind(organization_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| -> Result<ModuleSetting, RecordError> {
            Ok(ModuleSetting {
                key: decode_enum("module key", row.try_get("key")?, ModuleKey::from_str)?,
                name: row.try_get("name")?,
                description: row.try_get("description")?,
                enabled: row.try_get("enabled")?,
                team: row.try_get("team")?,
            })
        })
        .collect()
}

/// Load the organization's grants for access checks.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn load_grants(pool: &PgPool, organization_id: Uuid) -> Result<Vec<ModuleGrant>, RecordError> {
    let settings = list_module_settings(pool, organization_id).await?;
    Ok(settings.iter().map(ModuleGrant::from).collect())
}

/// Validate a grant change without touching the database.
pub(crate) fn validate_grant_update(actor: &Profile, key: ModuleKey, update: &GrantUpdate) -> Result<Option<String>, RecordError> {
    if actor.role != Role::Admin {
        return Err(RecordError::Forbidden("change module settings"));
    }
    if key == ModuleKey::Settings && !update.enabled {
        return Err(RecordError::Invalid("the settings module cannot be disabled".to_owned()));
    }
    let team = optional_line("team", update.team.as_deref())?;
    if key == ModuleKey::Settings && team.is_some() {
        return Err(RecordError::Invalid("the settings module cannot be restricted to a team".to_owned()));
    }
    Ok(team)
}

/// Enable/disable a module for the actor's organization. Admin only.
///
/// # Errors
///
/// Returns `Forbidden` for non-admins, `Invalid` when disabling settings,
/// or a database error.
pub async fn set_module_grant(
    pool: &PgPool,
    actor: &Profile,
    key: ModuleKey,
    update: GrantUpdate,
) -> Result<ModuleSetting, RecordError> {
    let team = validate_grant_update(actor, key, &update)?;

    let result = sqlx::query(
        "INSERT INTO organization_modules (organization_id, module_id, enabled, team)
         SELECT $1, m.id, $3, $4 FROM modules m WHERE m.key = $2
         ON CONFLICT (organization_id, module_id)
         DO UPDATE SET enabled = EXCLUDED.enabled, team = EXCLUDED.team",
    )
    .bind(actor.organization_id)
    .bind(key.as_str())
    .bind(update.enabled)
    .bind(&team)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(RecordError::NotFound("module"));
    }

    info!(
        organization_id = %actor.organization_id,
        module = key.as_str(),
        enabled = update.enabled,
        team = team.as_deref().unwrap_or(""),
        "module grant updated"
    );

    list_module_settings(pool, actor.organization_id)
        .await?
        .into_iter()
        .find(|setting| setting.key == key)
        .ok_or(RecordError::NotFound("module"))
}

#[cfg(test)]
#[path = "module_test.rs"]
mod tests;
