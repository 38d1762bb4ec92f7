use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use partnerdesk_agent::relay_for;
use partnerdesk_core::{AgentBackend, AppConfig};
use partnerdesk_service::{build_router, AppState};
use partnerdesk_storage::{load_sdk_config, S3Store};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    init_tracing();
    let config = Arc::new(AppConfig::load().context("failed to load configuration")?);
    let sdk = load_sdk_config(&config.aws).await;
    let store = Arc::new(S3Store::new(&sdk, &config.aws, config.bucket.clone()));
    let relay = relay_for(&config.agent, Some(&sdk));
    if config.agent.backend == AgentBackend::Local {
        warn!("agent backend is local; replies are generated offline");
    }
    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .with_context(|| format!("invalid BIND_ADDR {}", config.bind_addr))?;
    let state = Arc::new(AppState::new(config.clone(), store, relay));
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, bucket = %config.bucket, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
