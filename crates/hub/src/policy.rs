//! Automatic LED control from ambient light.
//!
//! The hub drives the LED from the most recent light reading: below the
//! threshold the room counts as dark and the LED goes on, at or above it
//! the LED goes off. An unknown light level leaves the LED exactly where
//! it is. The fan has no automatic rule and only changes on explicit
//! commands.

/// Light level (percent of full scale) below which the hub turns the
/// LED on.
pub const LIGHT_THRESHOLD_PCT: f64 = 20.0;

/// Light level (percent) below which control panels render the room as
/// dark. Deliberately stricter than [`LIGHT_THRESHOLD_PCT`]: panels only
/// flag near-total darkness while the hub reacts much earlier. Kept as a
/// separate knob so neither side silently changes the other.
pub const PANEL_LIGHT_THRESHOLD_PCT: f64 = 5.0;

/// Decide the LED level for a light reading. `None` means the reading is
/// unknown and the LED must keep its current level.
pub fn led_for_light(light_pct: Option<f64>, threshold_pct: f64) -> Option<bool> {
    light_pct.map(|pct| pct < threshold_pct)
}

// ===========================================================================
// Tests
// ===========================================================================
