//! `rally-server`: runs the Pong server until Ctrl-C.

use rally::prelude::*;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), RallyError> {
    let config = ServerConfig::from_env()?;
    init_tracing(&config.log_level);

    tracing::info!(
        addr = %config.bind_addr,
        tick_rate_hz = config.tick_rate_hz,
        win_score = config.win_score,
        "starting rally server"
    );

    let server = RallyServer::builder().config(&config).build().await?;
    server.run_until(shutdown_signal()).await?;

    tracing::info!("server shutdown complete");
    Ok(())
}

/// `RUST_LOG` wins; otherwise the configured level applies.
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl-C, running until killed");
        std::future::pending::<()>().await;
    }
}
