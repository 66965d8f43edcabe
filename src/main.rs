use music_survey::{
    AppState, Config,
    remote::{HttpRecordStore, RecordStore, UnconfiguredStore},
    router,
};
use std::{net::SocketAddr, sync::Arc};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env()?;
    let store: Arc<dyn RecordStore> = match &config.endpoint {
        Some(endpoint) => {
            info!(%endpoint, timeout = ?config.timeout, encoding = ?config.write_encoding, "using survey endpoint");
            Arc::new(HttpRecordStore::new(
                endpoint.clone(),
                config.timeout,
                config.write_encoding,
            )?)
        }
        None => {
            warn!("SURVEY_ENDPOINT not set, results will stay empty and submissions will fail");
            Arc::new(UnconfiguredStore)
        }
    };

    let state = AppState::new(store);
    state.load().await;

    let app = router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
    }
    info!("shutting down");
}
