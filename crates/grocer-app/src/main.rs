use std::sync::Arc;

use grocer_hex::application::payment::SimulatedGateway;
use grocer_hex::config::Config;
use grocer_hex::inbound::http::{AppState, HttpServer, HttpServerConfig};
use grocer_repo::{build_guest_store, build_repo, Repo};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for DATABASE_URL / SERVER_PORT and friends when present.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok()))
        .init();

    let config = Config::from_env()?;
    let repo: Repo = build_repo(config.database_url.as_deref()).await?;
    let guest_store = build_guest_store(config.guest_cart_dir.as_deref());
    let payments = Arc::new(SimulatedGateway::new(config.payment_delay));
    tracing::info!(
        timeout_ms = config.persistence_timeout.as_millis() as u64,
        guest_merge = ?config.guest_merge,
        cart_idle_ttl_ms = config.cart_idle_ttl.as_millis() as u64,
        "storefront configured"
    );

    let state = AppState::new(
        Arc::new(repo),
        guest_store,
        payments,
        config.persistence_timeout,
        config.guest_merge,
        config.cart_idle_ttl,
    );
    let server_cfg = HttpServerConfig {
        port: config.server_port.clone(),
    };

    let http = HttpServer::new(state, server_cfg).await?;
    http.run().await
}

/// `RUST_LOG` when set, else `info`.
fn log_filter(rust_log: Option<String>) -> String {
    rust_log
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| "info".to_string())
}
