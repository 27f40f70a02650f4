mod config;
mod policy;
mod store;
mod web;

use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use config::HubConfig;
use store::RoomStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // ── Env config ──────────────────────────────────────────────────
    let cfg = HubConfig::from_env()?;
    tracing::info!(
        addr = %cfg.bind_addr,
        light_threshold_pct = cfg.light_threshold_pct,
        panel_light_threshold_pct = cfg.panel_light_threshold_pct,
        "hub starting"
    );

    // ── Shared state ────────────────────────────────────────────────
    let store = Arc::new(RoomStore::new(
        cfg.light_threshold_pct,
        cfg.panel_light_threshold_pct,
    ));
    store.record_system("hub started".to_string()).await;

    // ── Web server ──────────────────────────────────────────────────
    web::serve(store, cfg.bind_addr).await
}
