mod config;
mod db;
mod error;
mod routes;
mod services;
mod state;

use std::process::ExitCode;

use config::AppConfig;

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine; the environment may already be set.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "opsdesk stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;

    let pool = db::init_pool(&config.database_url, config.db_max_connections).await?;

    if let Some(bootstrap) = &config.bootstrap {
        match services::profile::bootstrap_admin(&pool, bootstrap, config.password_hash_iterations).await? {
            Some(admin_id) => tracing::info!(%admin_id, email = %bootstrap.email, "bootstrap admin created"),
            None => tracing::debug!("bootstrap skipped: profiles already exist"),
        }
    }

    let port = config.port;
    let state = state::AppState::new(pool, config);
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;

    tracing::info!(%port, "opsdesk listening");
    axum::serve(listener, app).await?;
    Ok(())
}
