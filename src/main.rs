use coffee_to_code::{
    AppState, Config, LocalStore, RemoteBackup, Tracker, router, spawn_startup_merge,
};
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env();
    let store = LocalStore::open(&config.data_dir)?;
    info!("local store at {}", store.dir().display());

    let tracker = Tracker::load(store)?;
    let remote = RemoteBackup::initialize(&config.remote);
    let state = AppState::new(tracker, remote, config.merge_mode);

    spawn_startup_merge(state.clone());

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
        tracing::error!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
