//! Direct message routes.

use axum::extract::State;
use axum::http::StatusCode;
use uuid::Uuid;

use crate::error::ApiError;
use crate::routes::extract::{Json, Path, Query};
use crate::routes::auth::{AuthUser, require_module};
use crate::services::access::ModuleKey;
use crate::services::filter::ListParams;
use crate::services::message::{self, Message, NewMessage, StatusUpdate};
use crate::state::AppState;

/// `GET /api/messages?folder=inbox|sent|all`
pub async fn list_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Message>>, ApiError> {
    require_module(&state, &auth, ModuleKey::Messages).await?;
    Ok(Json(message::list_messages(&state.pool, &auth.profile, &params).await?))
}

/// `POST /api/messages`: send to another member.
pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<NewMessage>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    require_module(&state, &auth, ModuleKey::Messages).await?;
    let sent = message::send_message(&state.pool, &auth.profile, body).await?;
    Ok((StatusCode::CREATED, Json(sent)))
}

/// `GET /api/messages/{id}`
pub async fn get_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(message_id): Path<Uuid>,
) -> Result<Json<Message>, ApiError> {
    require_module(&state, &auth, ModuleKey::Messages).await?;
    Ok(Json(message::get_message(&state.pool, &auth.profile, message_id).await?))
}

/// `PATCH /api/messages/{id}/status`: recipient marks read, unread or archived.
pub async fn set_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(message_id): Path<Uuid>,
    Json(body): Json<StatusUpdate>,
) -> Result<Json<Message>, ApiError> {
    require_module(&state, &auth, ModuleKey::Messages).await?;
    Ok(Json(message::set_message_status(&state.pool, &auth.profile, message_id, body).await?))
}

/// `DELETE /api/messages/{id}`
pub async fn delete_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(message_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    require_module(&state, &auth, ModuleKey::Messages).await?;
    message::delete_message(&state.pool, &auth.profile, message_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
