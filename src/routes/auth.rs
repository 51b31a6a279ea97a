//! Auth routes: password login, session cookie, current profile.

use axum::extract::{FromRef, State};
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::response::IntoResponse;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::error::ApiError;
use crate::routes::extract::Json;
use crate::services::access::{self, ModuleGrant, ModuleKey};
use crate::services::organization::{self, Organization};
use crate::services::profile::Profile;
use crate::services::record::RecordError;
use crate::services::{auth as auth_svc, module, session};
use crate::state::AppState;

pub(crate) const COOKIE_NAME: &str = "session_token";

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Authenticated profile extracted from the session cookie or a bearer token.
/// Use as a handler parameter to require authentication.
pub struct AuthUser {
    pub profile: Profile,
    pub token: String,
}

/// Session token from the `session_token` cookie, else `Authorization: Bearer`.
pub(crate) fn token_from_parts(parts: &Parts) -> Option<String> {
    let jar = CookieJar::from_headers(&parts.headers);
    if let Some(token) = jar.get(COOKIE_NAME).map(Cookie::value).filter(|v| !v.is_empty()) {
        return Some(token.to_owned());
    }

    let header = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_owned())
}

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = token_from_parts(parts).ok_or_else(ApiError::unauthorized)?;

        let app_state = AppState::from_ref(state);
        let profile = session::validate_session(&app_state.pool, &token)
            .await?
            .ok_or_else(ApiError::unauthorized)?;

        Ok(Self { profile, token })
    }
}

/// Load the caller's grants and require access to `key`.
///
/// # Errors
///
/// Returns 403 when the module is disabled, team-restricted, or above the
/// caller's role.
pub(crate) async fn require_module(state: &AppState, auth: &AuthUser, key: ModuleKey) -> Result<Vec<ModuleGrant>, ApiError> {
    let grants = module::load_grants(&state.pool, auth.profile.organization_id).await?;
    if !access::can_access_module(&auth.profile, key, &grants) {
        return Err(ApiError::forbidden(format!("you do not have access to the {} module", key.as_str())));
    }
    Ok(grants)
}

fn session_cookie(value: String, secure: bool, max_age: Duration) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(max_age)
        .build()
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub profile: Profile,
}

/// `POST /api/auth/login`: verify credentials, create a session, set cookie.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginBody>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    let profile = auth_svc::authenticate(&state.pool, &body.email, &body.password, state.config.password_hash_iterations).await?;
    let token = session::create_session(&state.pool, profile.id, state.config.session_ttl)
        .await
        .map_err(RecordError::from)?;

    let max_age = Duration::seconds(i64::try_from(state.config.session_ttl.as_secs()).unwrap_or(i64::MAX));
    let jar = jar.add(session_cookie(token.clone(), state.config.cookie_secure, max_age));
    tracing::info!(profile_id = %profile.id, "login succeeded");
    Ok((jar, Json(LoginResponse { token, profile })))
}

/// `POST /api/auth/logout`: delete session, clear cookie.
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    if let Err(e) = session::delete_session(&state.pool, &auth.token).await {
        tracing::warn!(error = %e, profile_id = %auth.profile.id, "session delete failed");
    }

    let jar = CookieJar::new().add(session_cookie(String::new(), state.config.cookie_secure, Duration::ZERO));
    (jar, StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct MeResponse {
    pub profile: Profile,
    pub organization: Organization,
    pub modules: Vec<ModuleKey>,
}

/// `GET /api/auth/me`: current profile, organization and visible modules.
pub async fn me(State(state): State<AppState>, auth: AuthUser) -> Result<Json<MeResponse>, ApiError> {
    let organization = organization::get_organization(&state.pool, auth.profile.organization_id).await?;
    let grants = module::load_grants(&state.pool, auth.profile.organization_id).await?;
    let modules = access::accessible_modules(&auth.profile, &grants);
    Ok(Json(MeResponse { profile: auth.profile, organization, modules }))
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
