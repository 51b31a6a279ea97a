//! Settings panel routes: organization, own profile, module grants.

use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::routes::extract::{Json, Path};
use crate::routes::auth::{AuthUser, require_module};
use crate::services::access::{self, ModuleKey};
use crate::services::module::{self, GrantUpdate, ModuleSetting};
use crate::services::organization::{self, Organization, OrganizationPatch};
use crate::services::profile::{self, Profile, ProfilePatch};
use crate::state::AppState;

// =============================================================================
// ORGANIZATION
// =============================================================================

/// `GET /api/settings/organization`: any member may read.
pub async fn get_organization(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Organization>, ApiError> {
    Ok(Json(organization::get_organization(&state.pool, auth.profile.organization_id).await?))
}

/// `PATCH /api/settings/organization`: admin only.
pub async fn update_organization(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<OrganizationPatch>,
) -> Result<Json<Organization>, ApiError> {
    require_module(&state, &auth, ModuleKey::Settings).await?;
    Ok(Json(organization::update_organization(&state.pool, &auth.profile, body).await?))
}

// =============================================================================
// OWN PROFILE
// =============================================================================

/// `GET /api/settings/profile`
pub async fn get_own_profile(auth: AuthUser) -> Json<Profile> {
    Json(auth.profile)
}

/// `PATCH /api/settings/profile`
pub async fn update_own_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<ProfilePatch>,
) -> Result<Json<Profile>, ApiError> {
    Ok(Json(profile::update_own_profile(&state.pool, &auth.profile, body).await?))
}

#[derive(Deserialize)]
pub struct PasswordChangeBody {
    pub current_password: String,
    pub new_password: String,
}

/// `POST /api/settings/profile/password`: other sessions are signed out.
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<PasswordChangeBody>,
) -> Result<StatusCode, ApiError> {
    profile::change_password(
        &state.pool,
        &auth.profile,
        &body.current_password,
        &body.new_password,
        &auth.token,
        state.config.password_hash_iterations,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// MODULES
// =============================================================================

#[derive(Serialize)]
pub struct VisibleModule {
    pub key: ModuleKey,
    pub name: String,
    pub description: String,
}

/// `GET /api/modules`: modules the caller can open, in display order.
pub async fn visible_modules(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<VisibleModule>>, ApiError> {
    let settings = module::list_module_settings(&state.pool, auth.profile.organization_id).await?;
    let grants: Vec<_> = settings.iter().map(access::ModuleGrant::from).collect();
    let visible = settings
        .into_iter()
        .filter(|setting| access::can_access_module(&auth.profile, setting.key, &grants))
        .map(|setting| VisibleModule { key: setting.key, name: setting.name, description: setting.description })
        .collect();
    Ok(Json(visible))
}

/// `GET /api/settings/modules`: every module with its grant state.
pub async fn list_module_settings(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<ModuleSetting>>, ApiError> {
    require_module(&state, &auth, ModuleKey::Settings).await?;
    Ok(Json(module::list_module_settings(&state.pool, auth.profile.organization_id).await?))
}

/// `PUT /api/settings/modules/{key}`: enable, disable or team-restrict.
pub async fn set_module_grant(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(key): Path<String>,
    Json(body): Json<GrantUpdate>,
) -> Result<Json<ModuleSetting>, ApiError> {
    require_module(&state, &auth, ModuleKey::Settings).await?;
    let Some(key) = ModuleKey::from_str(&key) else {
        return Err(ApiError::new(StatusCode::NOT_FOUND, "E_NOT_FOUND", format!("unknown module: {key:?}")));
    };
    Ok(Json(module::set_module_grant(&state.pool, &auth.profile, key, body).await?))
}
