use anyhow::Result;
use axum::serve;
use rustls::crypto::{ring::default_provider, CryptoProvider};
use tokio::signal;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use umbra_core::{config::AppConfig, runtime::UmbraRuntime};

const CRATES: [&str; 3] = ["umbra_core", "server", "cli"];

fn filter_for(level: &str) -> EnvFilter {
    let directives: Vec<String> = CRATES.iter().map(|c| format!("{c}={level}")).collect();
    EnvFilter::new(format!("warn,{}", directives.join(",")))
}

/// `RUST_LOG=debug|trace` widens logging for the workspace crates only; any other value is
/// used as a full filter.
fn init_logging(config: &AppConfig) {
    let filter = match std::env::var("RUST_LOG") {
        Ok(level) if level == "debug" || level == "trace" => filter_for(&level),
        Ok(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| filter_for("debug")),
        Err(_) => filter_for(&config.logging.level),
    };

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_file(true)
                    .with_line_number(true)
                    .with_target(false),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    CryptoProvider::install_default(default_provider())
        .map_err(|e| anyhow::anyhow!("failed to install crypto provider: {e:?}"))?;

    let config = AppConfig::load().map_err(|e| anyhow::anyhow!("failed to load config: {e}"))?;

    init_logging(&config);
    info!(environment = %config.environment, "starting umbra server");
    debug!(
        chains = config.chains.len(),
        relay = %config.broadcaster.relay_base_url,
        bind_port = config.server.bind_port,
        "configuration loaded"
    );

    let addr = config.socket_addr().map_err(|e| anyhow::anyhow!(e))?;
    let runtime = UmbraRuntime::builder()
        .with_config(config.clone())
        .enable_discovery_warmup()
        .build()?;

    let app = server::create_app(runtime.components().clone(), &config.server)
        .layer(tower_http::timeout::TimeoutLayer::new(config.request_timeout()));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, "umbra server listening");

    if let Err(e) = serve(listener, app).with_graceful_shutdown(shutdown_signal()).await {
        error!(error = %e, "server error occurred");
    }

    runtime.shutdown().await;
    info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install ctrl-c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install signal handler");
                () = std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, draining connections");
}
