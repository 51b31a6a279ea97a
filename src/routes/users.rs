//! User administration routes.
//!
//! Reads are open to admins and managers through the `users` module gate.
//! Writes are admin-only and enforced again in the profile service.

use axum::extract::State;
use axum::http::StatusCode;
use uuid::Uuid;

use crate::error::ApiError;
use crate::routes::extract::{Json, Path};
use crate::routes::auth::{AuthUser, require_module};
use crate::services::access::{self, ModuleKey};
use crate::services::profile::{self, NewUser, Profile, UserPatch};
use crate::state::AppState;

async fn require_user_viewer(state: &AppState, auth: &AuthUser) -> Result<(), ApiError> {
    require_module(state, auth, ModuleKey::Users).await?;
    if !access::can_view_users(auth.profile.role) {
        return Err(ApiError::forbidden("you do not have permission to view users"));
    }
    Ok(())
}

/// `GET /api/users`
pub async fn list_users(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<Profile>>, ApiError> {
    require_user_viewer(&state, &auth).await?;
    Ok(Json(profile::list_profiles(&state.pool, auth.profile.organization_id).await?))
}

/// `GET /api/users/{id}`
pub async fn get_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Profile>, ApiError> {
    require_user_viewer(&state, &auth).await?;
    Ok(Json(profile::get_profile(&state.pool, auth.profile.organization_id, user_id).await?))
}

/// `POST /api/users`: admin creates a user with an initial password.
pub async fn create_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<NewUser>,
) -> Result<(StatusCode, Json<Profile>), ApiError> {
    require_module(&state, &auth, ModuleKey::Users).await?;
    let created = profile::create_user(&state.pool, &auth.profile, body, state.config.password_hash_iterations).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PATCH /api/users/{id}`: admin edits role, team, status or password.
pub async fn update_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<Uuid>,
    Json(body): Json<UserPatch>,
) -> Result<Json<Profile>, ApiError> {
    require_module(&state, &auth, ModuleKey::Users).await?;
    let updated =
        profile::update_user(&state.pool, &auth.profile, user_id, body, state.config.password_hash_iterations).await?;
    Ok(Json(updated))
}
