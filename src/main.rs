use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use roam_server::config::ServerConfig;
use roam_server::game::world::World;
use roam_server::metrics::{self, Metrics};
use roam_server::net::server::WebSocketServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Roam Server v{}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::load_or_default();
    config.validate()?;
    info!(
        "Configuration loaded: {}:{}, tick={:?}, world={}x{}, max_sessions_per_ip={}, sprites={}",
        config.bind_address,
        config.port,
        config.tick_interval,
        config.world.width,
        config.world.height,
        config.admission.max_sessions_per_ip,
        config.sprites.len()
    );

    let metrics = Arc::new(Metrics::new());

    if let Some(metrics_port) = config.metrics_port {
        let metrics_clone = metrics.clone();
        let bind_address = config.bind_address;
        tokio::spawn(async move {
            if let Err(e) = metrics::start_metrics_server(metrics_clone, bind_address, metrics_port).await {
                error!("Metrics server error: {}", e);
            }
        });
    }

    let world = World::from_config(&config).into_shared();
    let server = WebSocketServer::bind(config, world, metrics).await?;
    info!("Server ready on ws://{}", server.local_addr()?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut server_task = tokio::spawn(server.run(shutdown_rx));

    tokio::select! {
        result = &mut server_task => {
            match result {
                Ok(Err(e)) => error!("Server error: {}", e),
                Err(e) => error!("Server task failed: {}", e),
                Ok(Ok(())) => {}
            }
            return Ok(());
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                error!("Failed to listen for Ctrl+C: {}", e);
            }
            info!("Shutdown signal received");
        }
    }

    let _ = shutdown_tx.send(true);
    if let Err(e) = server_task.await {
        error!("Server task failed during shutdown: {}", e);
    }
    info!("Server stopped");

    Ok(())
}
