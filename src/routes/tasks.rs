//! Task routes.

use axum::extract::State;
use axum::http::StatusCode;
use uuid::Uuid;

use crate::error::ApiError;
use crate::routes::extract::{Json, Path, Query};
use crate::routes::auth::{AuthUser, require_module};
use crate::services::access::ModuleKey;
use crate::services::filter::ListParams;
use crate::services::task::{self, Task, TaskInput, TaskPatch};
use crate::state::AppState;

/// `GET /api/tasks`: list tasks with filters.
pub async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Task>>, ApiError> {
    require_module(&state, &auth, ModuleKey::Tasks).await?;
    let tasks = task::list_tasks(&state.pool, auth.profile.organization_id, &params).await?;
    Ok(Json(tasks))
}

/// `POST /api/tasks`: create a task reported by the caller.
pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<TaskInput>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    require_module(&state, &auth, ModuleKey::Tasks).await?;
    let created = task::create_task(&state.pool, &auth.profile, body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `GET /api/tasks/{id}`
pub async fn get_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(task_id): Path<Uuid>,
) -> Result<Json<Task>, ApiError> {
    require_module(&state, &auth, ModuleKey::Tasks).await?;
    Ok(Json(task::get_task(&state.pool, auth.profile.organization_id, task_id).await?))
}

/// `PATCH /api/tasks/{id}`: partial update.
pub async fn update_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(task_id): Path<Uuid>,
    Json(body): Json<TaskPatch>,
) -> Result<Json<Task>, ApiError> {
    require_module(&state, &auth, ModuleKey::Tasks).await?;
    Ok(Json(task::update_task(&state.pool, &auth.profile, task_id, body).await?))
}

/// `DELETE /api/tasks/{id}`
pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(task_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    require_module(&state, &auth, ModuleKey::Tasks).await?;
    task::delete_task(&state.pool, &auth.profile, task_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
