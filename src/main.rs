mod app;
mod auth;
mod clock;
mod config;
mod db;
mod error;
mod forms;
mod session;
mod snippets;
mod state;

use std::time::Duration;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "snippetbox=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = AppState::init().await?;

    let sweep_secs = app_state.config.session.sweep_secs;
    if sweep_secs > 0 {
        app_state.sessions.spawn_sweeper(Duration::from_secs(sweep_secs));
    }

    let config = app_state.config.clone();
    let app = app::build_app(app_state);
    app::serve(&config, app).await
}
