use std::{net::SocketAddr, sync::Arc};
use task_dashboard::{
    refresh::spawn_refresh_loop, router, views, AppState, JsonFileStore, Settings, TaskApiClient,
};
use tokio::fs;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let settings = Settings::from_env();
    if let Some(parent) = settings.data_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let store = Arc::new(JsonFileStore::open(settings.data_path.clone()).await);
    let client = TaskApiClient::new(&settings.api_url, settings.client_options())?;
    info!("task API at {}", settings.api_url);

    let port = settings.port;
    let refresh_period = settings.refresh_period();
    let state = AppState::new(settings, Arc::new(client), store).await;

    let _refresh = refresh_period.map(|period| {
        let refresh_state = state.clone();
        spawn_refresh_loop(period, state.in_flight.clone(), move || {
            let state = refresh_state.clone();
            async move {
                if let Err(err) = views::refresh_latest(&state).await {
                    error!("auto-refresh failed: {err}");
                }
            }
        })
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {err}");
    }
    info!("shutting down");
}
