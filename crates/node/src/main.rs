mod api;
mod board;
mod config;
mod debounce;
#[cfg(feature = "sim")]
mod sim;
mod sync;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use api::HubClient;
use config::NodeConfig;
use sync::SyncLoop;

#[cfg(not(any(feature = "sim", feature = "gpio")))]
compile_error!("enable either the `sim` or the `gpio` feature");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // ── Env config ──────────────────────────────────────────────────
    let cfg = NodeConfig::from_env()?;
    tracing::info!(
        hub = %cfg.hub_url,
        poll_ms = cfg.poll_interval.as_millis() as u64,
        debounce_ms = cfg.debounce.as_millis() as u64,
        "node starting"
    );

    let board = make_board()?;
    let hub = HubClient::new(&cfg).context("failed to build hub client")?;

    // ── Startup ping ────────────────────────────────────────────────
    // A node with no hub has nothing to sync with; fail here rather
    // than spin a loop that can never push.
    hub.ping()
        .await
        .with_context(|| format!("hub unreachable at {}", cfg.hub_url))?;
    tracing::info!("hub reachable");

    // ── Sync loop ───────────────────────────────────────────────────
    SyncLoop::new(board, hub, &cfg).run().await
}

#[cfg(feature = "sim")]
fn make_board() -> Result<sim::SimBoard> {
    let scenario =
        sim::Scenario::from_str_lossy(&std::env::var("SIM_SCENARIO").unwrap_or_default());
    tracing::info!(%scenario, "using simulated board");
    Ok(sim::SimBoard::new(scenario))
}

#[cfg(all(feature = "gpio", not(feature = "sim")))]
fn make_board() -> Result<board::GpioBoard> {
    board::GpioBoard::new()
}
