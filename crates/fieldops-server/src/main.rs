//! fieldops server entry point.

use std::sync::Arc;
use std::time::Duration;

use fieldops_db::DbManager;
use fieldops_server::config::ServerConfig;
use fieldops_server::state::State;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let directive: Directive = "fieldops=info".parse()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .json()
        .init();

    let config = ServerConfig::from_env()?;
    tracing::info!(port = config.port, db = %config.db.url, "starting fieldops server");

    let db = DbManager::connect(&config.db).await?;
    let port = config.port;
    let state = Arc::new(State::new(db.client().clone(), config));

    tokio::spawn(fieldops_server::sweep_exports(state.clone(), SWEEP_INTERVAL));

    let app = fieldops_server::construct_router(state);
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    tracing::info!("fieldops server stopped");
    Ok(())
}
