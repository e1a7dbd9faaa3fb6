use anyhow::Context;
use async_transform::app::server::{build_state, create_router};
use async_transform::config::{ServerArgs, ServerConfig};
use async_transform::utils::logger;
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();

    let config = match ServerConfig::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {}", e);
            eprintln!("💡 Check the --config file and command line overrides");
            std::process::exit(1);
        }
    };

    // 初始化日誌
    logger::init_logger(config.verbose, config.json_logs);

    tracing::info!("🚀 Starting async-transform service");
    tracing::debug!("Server config: {:?}", config);

    let state = build_state(&config).context("failed to initialize transform engine")?;
    let app = create_router(state).layer(TraceLayer::new_for_http());

    let bind_address = config.bind_address();
    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {}", bind_address))?;

    tracing::info!("📡 Listening on http://{}", bind_address);
    if config.request_scoped {
        tracing::info!("🔍 Request-scoped transformer resolution enabled");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("✅ Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("❌ Failed to install Ctrl-C handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
