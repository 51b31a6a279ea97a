//! Call log routes.

use axum::extract::State;
use axum::http::StatusCode;
use uuid::Uuid;

use crate::error::ApiError;
use crate::routes::extract::{Json, Path, Query};
use crate::routes::auth::{AuthUser, require_module};
use crate::services::access::ModuleKey;
use crate::services::call::{self, Call, CallInput, CallPatch};
use crate::services::filter::ListParams;
use crate::state::AppState;

/// `GET /api/calls`: accepts `direction` on top of the shared filters.
pub async fn list_calls(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Call>>, ApiError> {
    require_module(&state, &auth, ModuleKey::Calls).await?;
    let calls = call::list_calls(&state.pool, auth.profile.organization_id, &params).await?;
    Ok(Json(calls))
}

/// `POST /api/calls`
pub async fn create_call(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CallInput>,
) -> Result<(StatusCode, Json<Call>), ApiError> {
    require_module(&state, &auth, ModuleKey::Calls).await?;
    let created = call::create_call(&state.pool, &auth.profile, body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_call(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(call_id): Path<Uuid>,
) -> Result<Json<Call>, ApiError> {
    require_module(&state, &auth, ModuleKey::Calls).await?;
    Ok(Json(call::get_call(&state.pool, auth.profile.organization_id, call_id).await?))
}

pub async fn update_call(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(call_id): Path<Uuid>,
    Json(body): Json<CallPatch>,
) -> Result<Json<Call>, ApiError> {
    require_module(&state, &auth, ModuleKey::Calls).await?;
    Ok(Json(call::update_call(&state.pool, &auth.profile, call_id, body).await?))
}

pub async fn delete_call(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(call_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    require_module(&state, &auth, ModuleKey::Calls).await?;
    call::delete_call(&state.pool, &auth.profile, call_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
