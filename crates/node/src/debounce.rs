//! Edge detection with a hold-off window for the fan button.
//!
//! A mechanical button bounces: one physical press shows up as a burst of
//! edges spread over a few milliseconds. The debouncer turns such a burst
//! into at most one toggle per guard window:
//!
//! ```text
//! Idle ──[inactive→active edge]──▶ Guard (toggle emitted)
//!  ▲                                  │
//!  └────[guard interval elapsed]──────┘
//! ```
//!
//! While in `Guard` every edge is ignored and nothing is queued. The expiry
//! check runs before edge detection on each poll, so a press arriving
//! exactly at the window boundary still counts. Time is passed in by the
//! caller, which keeps the machine deterministic under test.

use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Armed; the next inactive→active edge toggles.
    Idle,
    /// Hold-off after an accepted edge; further edges are ignored.
    Guard { since: Instant },
}

// ---------------------------------------------------------------------------
// Debouncer
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Debouncer {
    guard: Duration,
    phase: Phase,
    last_level: bool,
    value: bool,
}

impl Debouncer {
    /// A fresh debouncer with the toggle value off. The level seen before
    /// the first poll is treated as inactive.
    pub fn new(guard: Duration) -> Self {
        Self {
            guard,
            phase: Phase::Idle,
            last_level: false,
            value: false,
        }
    }

    /// Feed one sampled button level (`true` = pressed). Returns the new
    /// toggle value when this sample was accepted as a press, `None`
    /// otherwise. The observed level is remembered on every poll, accepted
    /// or not.
    pub fn poll(&mut self, active: bool, now: Instant) -> Option<bool> {
        if let Phase::Guard { since } = self.phase {
            if now.duration_since(since) >= self.guard {
                self.phase = Phase::Idle;
            }
        }

        let mut toggled = None;
        if self.phase == Phase::Idle && active && !self.last_level {
            self.value = !self.value;
            self.phase = Phase::Guard { since: now };
            toggled = Some(self.value);
        }

        self.last_level = active;
        toggled
    }

    /// Current toggle value.
    pub fn value(&self) -> bool {
        self.value
    }
}

// ===========================================================================
// Tests
// ===========================================================================
