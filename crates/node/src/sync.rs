//! The node's sync cycle: read the sensors, evaluate the button, push the
//! readings to the hub, pull the authoritative actuator record, drive the
//! outputs.
//!
//! Every step is fault-tolerant on its own. A failed sensor read makes that
//! reading unknown for the cycle, a failed hub call is logged and retried
//! implicitly next cycle; nothing after startup stops the loop.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::api::{HubClient, SensorUpdate};
use crate::board::Board;
use crate::config::NodeConfig;
use crate::debounce::Debouncer;

/// Temperature reported while the fan runs. The room has no temperature
/// sensor; the fixed value marks the reading as synthetic.
const FAN_SYNTHETIC_TEMP: f64 = 30.0;

// ---------------------------------------------------------------------------
// Sync loop
// ---------------------------------------------------------------------------

pub struct SyncLoop<B: Board> {
    board: B,
    hub: HubClient,
    button: Debouncer,
    poll_interval: Duration,
    /// Fan level last chosen by the local button. Strictly button-owned:
    /// pulls re-drive the physical fan but never touch this, so the
    /// synthetic temperature stays tied to the button alone.
    fan_intent: bool,
}

impl<B: Board> SyncLoop<B> {
    pub fn new(board: B, hub: HubClient, cfg: &NodeConfig) -> Self {
        Self {
            board,
            hub,
            button: Debouncer::new(cfg.debounce),
            poll_interval: cfg.poll_interval,
            fan_intent: false,
        }
    }

    /// Drive the outputs to their defaults, then cycle forever.
    pub async fn run(mut self) -> ! {
        if let Err(e) = self.board.set_led(false) {
            warn!("initial led drive failed: {e}");
        }
        if let Err(e) = self.board.set_fan(false) {
            warn!("initial fan drive failed: {e}");
        }

        info!(
            poll_ms = self.poll_interval.as_millis() as u64,
            "sync loop started"
        );

        loop {
            self.cycle().await;
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// One full cycle: sensors, button, push, pull, drive.
    async fn cycle(&mut self) {
        let light_intensity = self.read_light();
        let presence = self.read_presence();
        self.poll_button().await;

        // No real temperature sensor: report the synthetic value while the
        // fan runs, omit the field otherwise.
        let temperature = self.fan_intent.then_some(FAN_SYNTHETIC_TEMP);

        self.push(SensorUpdate {
            temperature,
            light_intensity,
            presence,
        })
        .await;

        self.pull_and_drive().await;
    }

    fn read_light(&mut self) -> Option<f64> {
        match self.board.read_light_raw() {
            Ok(raw) => Some(light_percent(raw, self.board.light_full_scale())),
            Err(e) => {
                warn!("light read failed: {e}");
                None
            }
        }
    }

    fn read_presence(&mut self) -> Option<bool> {
        match self.board.read_presence() {
            Ok(seen) => Some(seen),
            Err(e) => {
                warn!("presence read failed: {e}");
                None
            }
        }
    }

    /// Poll the button. A toggle flips the fan locally and tells the hub
    /// before this cycle's authoritative pull, so the pulled record already
    /// carries the new level instead of undoing it.
    async fn poll_button(&mut self) {
        let level = match self.board.read_button() {
            Ok(level) => level,
            Err(e) => {
                warn!("button read failed: {e}");
                return;
            }
        };

        let Some(on) = self.button.poll(level, Instant::now()) else {
            return;
        };

        self.fan_intent = on;
        info!(on, "button toggled fan");

        if let Err(e) = self.board.set_fan(on) {
            warn!("fan drive failed: {e}");
        }
        // If this push fails the hub still holds the old level, and the pull
        // below undoes the local override until a later push lands.
        if let Err(e) = self.hub.set_fan(on).await {
            warn!("fan intent push failed: {e}");
        }
    }

    async fn push(&mut self, update: SensorUpdate) {
        // A push overwrites the hub record wholesale. With both light and
        // presence unknown there is nothing worth overwriting known state
        // with, so skip the round trip entirely.
        if update.light_intensity.is_none() && update.presence.is_none() {
            debug!("light and presence both unknown, skipping push");
            return;
        }

        match self.hub.update_sensors(&update).await {
            Ok(()) => debug!(
                temp = ?update.temperature,
                light = ?update.light_intensity,
                presence = ?update.presence,
                "pushed readings"
            ),
            Err(e) => warn!("sensor push failed: {e}"),
        }
    }

    async fn pull_and_drive(&mut self) {
        let devices = match self.hub.devices().await {
            Ok(devices) => devices,
            Err(e) => {
                warn!("actuator pull failed: {e}");
                return;
            }
        };

        if let Err(e) = self.board.set_led(devices.led) {
            warn!("led drive failed: {e}");
        }
        if let Err(e) = self.board.set_fan(devices.fan) {
            warn!("fan drive failed: {e}");
        }
    }
}

/// Raw reading as a whole-number percentage of full scale, floored. Raw
/// values above full scale are clamped rather than reported over 100.
fn light_percent(raw: u16, full_scale: u16) -> f64 {
    let full = u32::from(full_scale.max(1));
    let clamped = u32::from(raw).min(full);
    f64::from(clamped * 100 / full)
}

// ===========================================================================
// Tests
// ===========================================================================
