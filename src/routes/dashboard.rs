//! Dashboard route.

use axum::extract::State;

use crate::error::ApiError;
use crate::routes::extract::Json;
use crate::routes::auth::{AuthUser, require_module};
use crate::services::access::ModuleKey;
use crate::services::dashboard::{self, DashboardSummary};
use crate::state::AppState;

/// `GET /api/dashboard`: counts for the modules the caller can open.
pub async fn summary(State(state): State<AppState>, auth: AuthUser) -> Result<Json<DashboardSummary>, ApiError> {
    let grants = require_module(&state, &auth, ModuleKey::Dashboard).await?;
    Ok(Json(dashboard::summary(&state.pool, &auth.profile, &grants).await?))
}
