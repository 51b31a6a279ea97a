//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! One Axum router serves the JSON API consumed by the single-page UI. Every
//! `/api` route except login requires a session, and entity routes
//! additionally check module access for their module key.

pub mod auth;
pub mod calls;
pub mod dashboard;
pub mod extract;
pub mod messages;
pub mod settings;
pub mod tasks;
pub mod tickets;
pub mod users;

use axum::Router;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::routing::{get, patch, post, put};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

fn cors_layer(allow_origin: Option<&str>) -> CorsLayer {
    let origin = allow_origin.and_then(|origin| match HeaderValue::from_str(origin) {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(origin, "ignoring invalid CORS_ALLOW_ORIGIN");
            None
        }
    });

    match origin {
        // Credentialed requests need an explicit origin.
        Some(origin) => CorsLayer::new()
            .allow_origin(AllowOrigin::exact(origin))
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        None => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    }
}

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(state.config.cors_allow_origin.as_deref());

    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/modules", get(settings::visible_modules))
        .route("/api/dashboard", get(dashboard::summary))
        .route("/api/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/api/tasks/{id}",
            get(tasks::get_task).patch(tasks::update_task).delete(tasks::delete_task),
        )
        .route("/api/tickets", get(tickets::list_tickets).post(tickets::create_ticket))
        .route(
            "/api/tickets/{id}",
            get(tickets::get_ticket)
                .patch(tickets::update_ticket)
                .delete(tickets::delete_ticket),
        )
        .route("/api/calls", get(calls::list_calls).post(calls::create_call))
        .route(
            "/api/calls/{id}",
            get(calls::get_call).patch(calls::update_call).delete(calls::delete_call),
        )
        .route("/api/messages", get(messages::list_messages).post(messages::send_message))
        .route(
            "/api/messages/{id}",
            get(messages::get_message).delete(messages::delete_message),
        )
        .route("/api/messages/{id}/status", patch(messages::set_status))
        .route("/api/users", get(users::list_users).post(users::create_user))
        .route("/api/users/{id}", get(users::get_user).patch(users::update_user))
        .route(
            "/api/settings/organization",
            get(settings::get_organization).patch(settings::update_organization),
        )
        .route(
            "/api/settings/profile",
            get(settings::get_own_profile).patch(settings::update_own_profile),
        )
        .route("/api/settings/profile/password", post(settings::change_password))
        .route("/api/settings/modules", get(settings::list_module_settings))
        .route("/api/settings/modules/{key}", put(settings::set_module_grant))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
