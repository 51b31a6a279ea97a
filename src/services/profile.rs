//! Profiles: the user accounts of an organization.
//!
//! DESIGN
//! ======
//! A profile carries the `role` and `team` that every access check reads.
//! Account creation and role changes are privileged: only admins may call
//! `create_user` / `update_user`, and an admin cannot demote or deactivate
//! themselves.
//! Self-service edits go through `update_own_profile` / `change_password`.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::config::BootstrapAdmin;
use crate::services::access::{self, ModuleKey, Role};
use crate::services::auth::{self, MIN_PASSWORD_LEN};
use crate::services::record::{
    RecordError, conflict_or_database, decode_enum, double_option, optional_line, parse_enum, required_line,
};
use crate::services::session;

/// Column list shared by every query that loads a `Profile` (alias `p`).
pub(crate) const PROFILE_COLUMNS: &str =
    "p.id, p.organization_id, p.email, p.full_name, p.role, p.team, p.avatar_url, p.active, p.created_at, p.updated_at";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub team: Option<String>,
    pub avatar_url: Option<String>,
    pub active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

pub(crate) fn profile_from_row(row: &PgRow) -> Result<Profile, RecordError> {
    Ok(Profile {
        id: row.try_get("id")?,
        organization_id: row.try_get("organization_id")?,
        email: row.try_get("email")?,
        full_name: row.try_get("full_name")?,
        role: decode_enum("role", row.try_get("role")?, Role::from_str)?,
        team: row.try_get("team")?,
        avatar_url: row.try_get("avatar_url")?,
        active: row.try_get("active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// =============================================================================
// INPUTS
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: Option<String>,
    pub team: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub full_name: Option<String>,
    pub role: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub team: Option<Option<String>>,
    pub active: Option<bool>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfilePatch {
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub avatar_url: Option<Option<String>>,
}

fn validate_password(password: &str) -> Result<(), RecordError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(RecordError::Invalid(format!("password must be at least {MIN_PASSWORD_LEN} characters")));
    }
    Ok(())
}

fn validate_avatar_url(url: Option<&str>) -> Result<Option<String>, RecordError> {
    let url = optional_line("avatar_url", url)?;
    if let Some(value) = url.as_deref() {
        if !(value.starts_with("https://") || value.starts_with("http://")) {
            return Err(RecordError::Invalid("avatar_url must be an http(s) URL".to_owned()));
        }
    }
    Ok(url)
}

/// Reject edits that would lock an admin out of their own account.
pub(crate) fn check_self_update(actor: &Profile, target_id: Uuid, role: Option<Role>, active: Option<bool>) -> Result<(), RecordError> {
    if actor.id != target_id {
        return Ok(());
    }
    if role.is_some_and(|role| role != actor.role) {
        return Err(RecordError::Forbidden("change your own role"));
    }
    if active == Some(false) {
        return Err(RecordError::Forbidden("deactivate your own account"));
    }
    Ok(())
}

// =============================================================================
// READS
// =============================================================================

/// Load one profile of the organization.
///
/// # Errors
///
/// Returns `NotFound` if no such profile exists in the organization.
pub async fn get_profile(pool: &PgPool, organization_id: Uuid, profile_id: Uuid) -> Result<Profile, RecordError> {
    let query = format!("SELECT {PROFILE_COLUMNS} FROM profiles p WHERE p.id = $1 AND p.organization_id = $2");
    let row = sqlx::query(&query)
        .bind(profile_id)
        .bind(organization_id)
        .fetch_optional(pool)
        .await?
        .ok_or(RecordError::NotFound("user"))?;
    profile_from_row(&row)
}

/// List every profile of the organization, sorted by name.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_profiles(pool: &PgPool, organization_id: Uuid) -> Result<Vec<Profile>, RecordError> {
    let query = format!(
        "SELECT {PROFILE_COLUMNS} FROM profiles p WHERE p.organization_id = $1 ORDER BY lower(p.full_name), p.id"
    );
    let rows = sqlx::query(&query).bind(organization_id).fetch_all(pool).await?;
    rows.iter().map(profile_from_row).collect()
}

// =============================================================================
// PRIVILEGED WRITES
// =============================================================================

/// Create a user in the actor's organization. Admin only.
///
/// # Errors
///
/// Returns `Forbidden` for non-admins, `Invalid` for bad input, `Conflict`
/// if the email is taken, or a database error.
pub async fn create_user(pool: &PgPool, actor: &Profile, input: NewUser, hash_iterations: u32) -> Result<Profile, RecordError> {
    if !access::can_manage_users(actor.role) {
        return Err(RecordError::Forbidden("create users"));
    }

    let email = auth::normalize_email(&input.email)
        .ok_or_else(|| RecordError::Invalid("email is not a valid address".to_owned()))?;
    let full_name = required_line("full_name", &input.full_name)?;
    let role = match input.role.as_deref() {
        Some(raw) => parse_enum("role", raw, Role::from_str)?,
        None => Role::Member,
    };
    let team = optional_line("team", input.team.as_deref())?;
    validate_password(&input.password)?;
    let password_hash = auth::hash_password_blocking(&input.password, hash_iterations).await?;

    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO profiles (id, organization_id, email, full_name, role, team, password_hash)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(id)
    .bind(actor.organization_id)
    .bind(&email)
    .bind(&full_name)
    .bind(role.as_str())
    .bind(&team)
    .bind(&password_hash)
    .execute(pool)
    .await
    .map_err(|e| conflict_or_database(e, "a user with this email already exists"))?;

    info!(profile_id = %id, organization_id = %actor.organization_id, created_by = %actor.id, role = role.as_str(), "user created");
    get_profile(pool, actor.organization_id, id).await
}

/// Update a user of the actor's organization. Admin only.
///
/// # Errors
///
/// Returns `Forbidden` for non-admins or self-lockout edits, `NotFound` if
/// the user is not in the organization, `Invalid` for bad input, or a
/// database error.
pub async fn update_user(
    pool: &PgPool,
    actor: &Profile,
    target_id: Uuid,
    patch: UserPatch,
    hash_iterations: u32,
) -> Result<Profile, RecordError> {
    if !access::can_manage_users(actor.role) {
        return Err(RecordError::Forbidden("update users"));
    }

    let role = patch
        .role
        .as_deref()
        .map(|raw| parse_enum("role", raw, Role::from_str))
        .transpose()?;
    check_self_update(actor, target_id, role, patch.active)?;

    let current = get_profile(pool, actor.organization_id, target_id).await?;

    let full_name = match patch.full_name.as_deref() {
        Some(name) => required_line("full_name", name)?,
        None => current.full_name.clone(),
    };
    let team = match patch.team {
        Some(team) => optional_line("team", team.as_deref())?,
        None => current.team.clone(),
    };
    let password_hash = match patch.password.as_deref() {
        Some(password) => {
            validate_password(password)?;
            Some(auth::hash_password_blocking(password, hash_iterations).await?)
        }
        None => None,
    };

    sqlx::query(
        "UPDATE profiles
         SET full_name = $3, role = $4, team = $5, active = $6,
             password_hash = COALESCE($7, password_hash), updated_at = now()
         WHERE id = $1 AND organization_id = $2",
    )
    .bind(target_id)
    .bind(actor.organization_id)
    .bind(&full_name)
    .bind(role.unwrap_or(current.role).as_str())
    .bind(&team)
    .bind(patch.active.unwrap_or(current.active))
    .bind(&password_hash)
    .execute(pool)
    .await?;

    if patch.active == Some(false) || password_hash.is_some() {
        let revoked = session::delete_profile_sessions(pool, target_id, None).await?;
        info!(profile_id = %target_id, revoked, "revoked sessions after account change");
    }

    info!(profile_id = %target_id, updated_by = %actor.id, "user updated");
    get_profile(pool, actor.organization_id, target_id).await
}

// =============================================================================
// SELF SERVICE
// =============================================================================

/// Update the caller's own display fields.
///
/// # Errors
///
/// Returns `Invalid` for bad input or a database error.
pub async fn update_own_profile(pool: &PgPool, actor: &Profile, patch: ProfilePatch) -> Result<Profile, RecordError> {
    let full_name = match patch.full_name.as_deref() {
        Some(name) => required_line("full_name", name)?,
        None => actor.full_name.clone(),
    };
    let avatar_url = match patch.avatar_url {
        Some(url) => validate_avatar_url(url.as_deref())?,
        None => actor.avatar_url.clone(),
    };

    sqlx::query("UPDATE profiles SET full_name = $2, avatar_url = $3, updated_at = now() WHERE id = $1")
        .bind(actor.id)
        .bind(&full_name)
        .bind(&avatar_url)
        .execute(pool)
        .await?;

    get_profile(pool, actor.organization_id, actor.id).await
}

/// Change the caller's password after re-checking the current one. Other
/// sessions of the caller are revoked; `keep_token` stays valid.
///
/// # Errors
///
/// Returns `Forbidden` if the current password is wrong, `Invalid` if the
/// new password is too short, or a database error.
pub async fn change_password(
    pool: &PgPool,
    actor: &Profile,
    current_password: &str,
    new_password: &str,
    keep_token: &str,
    hash_iterations: u32,
) -> Result<(), RecordError> {
    let stored: String = sqlx::query_scalar("SELECT password_hash FROM profiles WHERE id = $1")
        .bind(actor.id)
        .fetch_optional(pool)
        .await?
        .ok_or(RecordError::NotFound("user"))?;

    if !auth::verify_password_blocking(current_password, &stored).await? {
        return Err(RecordError::Forbidden("change the password without the current password"));
    }
    validate_password(new_password)?;
    let password_hash = auth::hash_password_blocking(new_password, hash_iterations).await?;

    sqlx::query("UPDATE profiles SET password_hash = $2, updated_at = now() WHERE id = $1")
        .bind(actor.id)
        .bind(&password_hash)
        .execute(pool)
        .await?;

    let revoked = session::delete_profile_sessions(pool, actor.id, Some(keep_token)).await?;
    info!(profile_id = %actor.id, revoked, "password changed");
    Ok(())
}

// =============================================================================
// BOOTSTRAP
// =============================================================================

/// Create the first organization and admin when no profile exists yet.
/// Returns the new admin id, or `None` if the database was already seeded.
///
/// # Errors
///
/// Returns `Invalid` for a bad bootstrap email/password or a database error.
pub async fn bootstrap_admin(pool: &PgPool, bootstrap: &BootstrapAdmin, hash_iterations: u32) -> Result<Option<Uuid>, RecordError> {
    let seeded: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM profiles)")
        .fetch_one(pool)
        .await?;
    if seeded {
        return Ok(None);
    }

    let email = auth::normalize_email(&bootstrap.email)
        .ok_or_else(|| RecordError::Invalid("BOOTSTRAP_ADMIN_EMAIL is not a valid address".to_owned()))?;
    validate_password(&bootstrap.password)?;
    let org_name = required_line("organization name", &bootstrap.org_name)?;

    let organization_id = Uuid::new_v4();
    let profile_id = Uuid::new_v4();
    let full_name = auth::name_from_email(&email);
    let password_hash = auth::hash_password_blocking(&bootstrap.password, hash_iterations).await?;

    let mut tx = pool.begin().await?;
    sqlx::query("INSERT INTO organizations (id, name) VALUES ($1, $2)")
        .bind(organization_id)
        .bind(&org_name)
        .execute(&mut *tx)
        .await?;
    sqlx::query(
        "INSERT INTO organization_modules (organization_id, module_id, enabled)
         SELECT $1, id, TRUE FROM modules",
    )
    .bind(organization_id)
    .execute(&mut *tx)
    .await?;
    sqlx::query(
        "INSERT INTO profiles (id, organization_id, email, full_name, role, password_hash)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(profile_id)
    .bind(organization_id)
    .bind(&email)
    .bind(&full_name)
    .bind(Role::Admin.as_str())
    .bind(&password_hash)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    info!(%organization_id, %profile_id, modules = ModuleKey::ALL.len(), "bootstrapped organization and admin");
    Ok(Some(profile_id))
}

#[cfg(test)]
#[path = "profile_test.rs"]
mod tests;
