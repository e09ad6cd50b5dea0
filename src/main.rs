mod app;
mod config;
mod contributions;
mod db;
mod error;
mod images;
mod state;
mod stats;
mod storage;
mod users;

use anyhow::Context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "eelgrass=debug,axum=info,tower_http=info".to_string());
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

    let app_state = state::AppState::init().await?;

    db::migrate(&app_state.db).await?;
    images::services::seed_from_dir(&app_state.db, &app_state.config.image_dir)
        .await
        .context("seed image catalog")?;
    tracing::info!(
        policy = ?app_state.config.resubmit_policy,
        "resubmission policy"
    );

    let (host, port) = (app_state.config.host.clone(), app_state.config.port);
    app::serve(app::build_app(app_state), &host, port).await
}
