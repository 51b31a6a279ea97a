//! Ticket routes.

use axum::extract::State;
use axum::http::StatusCode;
use uuid::Uuid;

use crate::error::ApiError;
use crate::routes::extract::{Json, Path, Query};
use crate::routes::auth::{AuthUser, require_module};
use crate::services::access::ModuleKey;
use crate::services::filter::ListParams;
use crate::services::ticket::{self, Ticket, TicketInput, TicketPatch};
use crate::state::AppState;

/// `GET /api/tickets`
pub async fn list_tickets(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Ticket>>, ApiError> {
    require_module(&state, &auth, ModuleKey::Tickets).await?;
    let tickets = ticket::list_tickets(&state.pool, auth.profile.organization_id, &params).await?;
    Ok(Json(tickets))
}

/// `POST /api/tickets`
pub async fn create_ticket(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<TicketInput>,
) -> Result<(StatusCode, Json<Ticket>), ApiError> {
    require_module(&state, &auth, ModuleKey::Tickets).await?;
    let created = ticket::create_ticket(&state.pool, &auth.profile, body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `GET /api/tickets/{id}`
pub async fn get_ticket(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(ticket_id): Path<Uuid>,
) -> Result<Json<Ticket>, ApiError> {
    require_module(&state, &auth, ModuleKey::Tickets).await?;
    Ok(Json(ticket::get_ticket(&state.pool, auth.profile.organization_id, ticket_id).await?))
}

/// `PATCH /api/tickets/{id}`
pub async fn update_ticket(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(ticket_id): Path<Uuid>,
    Json(body): Json<TicketPatch>,
) -> Result<Json<Ticket>, ApiError> {
    require_module(&state, &auth, ModuleKey::Tickets).await?;
    Ok(Json(ticket::update_ticket(&state.pool, &auth.profile, ticket_id, body).await?))
}

/// `DELETE /api/tickets/{id}`
pub async fn delete_ticket(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(ticket_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    require_module(&state, &auth, ModuleKey::Tickets).await?;
    ticket::delete_ticket(&state.pool, &auth.profile, ticket_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
