use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use time::OffsetDateTime;
use tokio::sync::{Mutex, RwLock};

use crate::policy;

/// Cap on retained events; older entries fall off the ring.
const MAX_EVENTS: usize = 200;

// ---------------------------------------------------------------------------
// Public type alias
// ---------------------------------------------------------------------------

pub type SharedStore = Arc<RoomStore>;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// The latest sensor push, replaced wholesale on every update. A field the
/// node did not send is unknown, not stale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorReadings {
    pub temperature: Option<f64>,
    /// Percent of the sensor's full scale, 0 to 100 when known.
    pub light_intensity: Option<f64>,
    pub presence: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActuatorState {
    pub led: bool,
    pub fan: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actuator {
    Led,
    Fan,
}

impl Actuator {
    pub fn name(self) -> &'static str {
        match self {
            Actuator::Led => "led",
            Actuator::Fan => "fan",
        }
    }
}

// ---------------------------------------------------------------------------
// Event log
// ---------------------------------------------------------------------------

#[derive(Clone, Serialize)]
pub struct RoomEvent {
    #[serde(with = "time::serde::rfc3339")]
    pub ts: OffsetDateTime,
    pub kind: EventKind,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Reading,
    Actuator,
    Error,
    System,
}

// ---------------------------------------------------------------------------
// JSON response (what /api/status returns)
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct StatusResponse {
    pub uptime_secs: u64,
    pub readings: SensorReadings,
    pub devices: ActuatorState,
    pub light_threshold_pct: f64,
    pub panel_light_threshold_pct: f64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_push: Option<OffsetDateTime>,
    pub events: Vec<RoomEvent>,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Shared room state. The sensor record and the actuator record sit behind
/// separate locks so pushes and commands never block each other; no method
/// holds both locks at once.
pub struct RoomStore {
    readings: RwLock<SensorReadings>,
    actuators: RwLock<ActuatorState>,
    events: Mutex<VecDeque<RoomEvent>>,
    last_push: RwLock<Option<OffsetDateTime>>,
    started_at: Instant,
    light_threshold_pct: f64,
    panel_light_threshold_pct: f64,
}

impl RoomStore {
    /// All sensors unknown, LED and fan off.
    pub fn new(light_threshold_pct: f64, panel_light_threshold_pct: f64) -> Self {
        Self {
            readings: RwLock::new(SensorReadings::default()),
            actuators: RwLock::new(ActuatorState::default()),
            events: Mutex::new(VecDeque::with_capacity(MAX_EVENTS)),
            last_push: RwLock::new(None),
            started_at: Instant::now(),
            light_threshold_pct,
            panel_light_threshold_pct,
        }
    }

    /// Snapshot of the latest sensor record.
    pub async fn readings(&self) -> SensorReadings {
        *self.readings.read().await
    }

    /// Snapshot of the actuator record.
    pub async fn actuators(&self) -> ActuatorState {
        *self.actuators.read().await
    }

    /// Replace the sensor record and run the light policy before returning,
    /// so the caller acknowledges a push only after its consequences are in
    /// place. Returns the LED level the policy applied, or `None` when the
    /// light level was unknown and the LED was left alone.
    pub async fn apply_update(&self, update: SensorReadings) -> Option<bool> {
        {
            let mut readings = self.readings.write().await;
            *readings = update;
        }
        {
            let mut last_push = self.last_push.write().await;
            *last_push = Some(OffsetDateTime::now_utc());
        }

        let decided = policy::led_for_light(update.light_intensity, self.light_threshold_pct);
        if let Some(on) = decided {
            let mut actuators = self.actuators.write().await;
            actuators.led = on;
        }

        let mut detail = format!(
            "temp={} light={} presence={}",
            fmt_opt(update.temperature),
            fmt_opt(update.light_intensity),
            fmt_opt(update.presence),
        );
        if let Some(on) = decided {
            detail.push_str(if on { ", led auto ON" } else { ", led auto OFF" });
        }
        self.push_event(EventKind::Reading, detail).await;

        decided
    }

    /// Write one actuator field and return the updated record.
    pub async fn set_actuator(&self, which: Actuator, on: bool) -> ActuatorState {
        let updated = {
            let mut actuators = self.actuators.write().await;
            match which {
                Actuator::Led => actuators.led = on,
                Actuator::Fan => actuators.fan = on,
            }
            *actuators
        };

        self.push_event(
            EventKind::Actuator,
            format!("{} set {}", which.name(), if on { "ON" } else { "OFF" }),
        )
        .await;

        updated
    }

    /// Record an error event.
    pub async fn record_error(&self, detail: String) {
        self.push_event(EventKind::Error, detail).await;
    }

    /// Record a generic system event.
    pub async fn record_system(&self, detail: String) {
        self.push_event(EventKind::System, detail).await;
    }

    /// Build the JSON-serialisable status snapshot, events newest first.
    pub async fn status(&self) -> StatusResponse {
        let events = {
            let events = self.events.lock().await;
            events.iter().rev().cloned().collect()
        };

        StatusResponse {
            uptime_secs: self.started_at.elapsed().as_secs(),
            readings: self.readings().await,
            devices: self.actuators().await,
            light_threshold_pct: self.light_threshold_pct,
            panel_light_threshold_pct: self.panel_light_threshold_pct,
            last_push: *self.last_push.read().await,
            events,
        }
    }

    async fn push_event(&self, kind: EventKind, detail: String) {
        let mut events = self.events.lock().await;
        if events.len() >= MAX_EVENTS {
            events.pop_front();
        }
        events.push_back(RoomEvent {
            ts: OffsetDateTime::now_utc(),
            kind,
            detail,
        });
    }
}

fn fmt_opt<T: std::fmt::Display>(value: Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "unknown".to_string(),
    }
}

// ===========================================================================
// Tests
// ===========================================================================
