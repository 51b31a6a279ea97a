//! Process configuration loaded from the environment.
//!
//! SYSTEM CONTEXT
//! ==============
//! `main` loads `.env` (if present) through `dotenvy`, then builds one
//! `AppConfig` that is shared read-only through `AppState`. Only
//! `DATABASE_URL` is mandatory; everything else has a default.

use std::time::Duration;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_SESSION_TTL_HOURS: u64 = 168;
/// Ten years; longer intervals overflow the database's interval arithmetic.
pub const MAX_SESSION_TTL_HOURS: u64 = 87_600;
pub const MAX_SESSION_TTL: Duration = Duration::from_secs(MAX_SESSION_TTL_HOURS * 3600);
const DEFAULT_PASSWORD_HASH_ITERATIONS: u32 = 100_000;
const DEFAULT_BOOTSTRAP_ORG_NAME: &str = "My Organization";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// First-run admin account created when the database has no profiles.
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
    pub org_name: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub session_ttl: Duration,
    pub cookie_secure: bool,
    /// `None` allows any origin.
    pub cors_allow_origin: Option<String>,
    pub password_hash_iterations: u32,
    pub bootstrap: Option<BootstrapAdmin>,
}

impl AppConfig {
    /// Build the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is missing, a numeric/boolean
    /// variable cannot be parsed, or `SESSION_TTL_HOURS` is outside
    /// `1..=MAX_SESSION_TTL_HOURS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let session_ttl = session_ttl(env_parse("SESSION_TTL_HOURS", DEFAULT_SESSION_TTL_HOURS)?)?;

        let cookie_secure = match std::env::var("COOKIE_SECURE") {
            Ok(raw) => {
                parse_bool(&raw).ok_or(ConfigError::Invalid { key: "COOKIE_SECURE", value: raw })?
            }
            Err(_) => false,
        };

        let cors_allow_origin = std::env::var("CORS_ALLOW_ORIGIN")
            .ok()
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty() && v != "*");

        Ok(Self {
            database_url,
            port: env_parse("PORT", DEFAULT_PORT)?,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?,
            session_ttl,
            cookie_secure,
            cors_allow_origin,
            password_hash_iterations: env_parse("PASSWORD_HASH_ITERATIONS", DEFAULT_PASSWORD_HASH_ITERATIONS)?,
            bootstrap: bootstrap_from_env(),
        })
    }

    /// Configuration for tests and tools that never open a real connection.
    #[must_use]
    pub fn for_database(database_url: &str) -> Self {
        Self {
            database_url: database_url.to_owned(),
            port: DEFAULT_PORT,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_HOURS * 3600),
            cookie_secure: false,
            cors_allow_origin: None,
            password_hash_iterations: DEFAULT_PASSWORD_HASH_ITERATIONS,
            bootstrap: None,
        }
    }
}

fn bootstrap_from_env() -> Option<BootstrapAdmin> {
    let email = std::env::var("BOOTSTRAP_ADMIN_EMAIL").ok()?;
    let password = std::env::var("BOOTSTRAP_ADMIN_PASSWORD").ok()?;
    if email.trim().is_empty() || password.is_empty() {
        return None;
    }
    let org_name = std::env::var("BOOTSTRAP_ORG_NAME")
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_BOOTSTRAP_ORG_NAME.to_owned());
    Some(BootstrapAdmin { email, password, org_name })
}

fn session_ttl(hours: u64) -> Result<Duration, ConfigError> {
    if !(1..=MAX_SESSION_TTL_HOURS).contains(&hours) {
        return Err(ConfigError::Invalid { key: "SESSION_TTL_HOURS", value: hours.to_string() });
    }
    Ok(Duration::from_secs(hours * 3600))
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_parse<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match std::env::var(key) {
        Ok(raw) if raw.trim().is_empty() => Ok(default),
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
