//! Simulated room board for development without hardware.
//!
//! Models the feel of a real room rather than white noise:
//! - Ambient light follows a random walk with mean reversion, so
//!   consecutive readings stay coherent
//! - Presence arrives in multi-second bursts, the way a PIR sees people
//! - The fan button gets pressed now and then, held for a few polls, with
//!   contact bounce so the debouncer has something to chew on
//! - The flaky profile injects I/O faults to exercise the sync loop's
//!   per-step error handling

use std::fmt;

use crate::board::{Board, BoardError};

/// Full scale of the simulated light sensor, matching a 12-bit ADC.
const SIM_FULL_SCALE: u16 = 4095;

// ---------------------------------------------------------------------------
// Gaussian approximation (no extra dependency)
// ---------------------------------------------------------------------------

/// Approximate a sample from N(0,1) using the Irwin-Hall method:
/// sum of 12 uniform [0,1) values minus 6.
fn approx_std_normal() -> f64 {
    let mut sum: f64 = 0.0;
    for _ in 0..12 {
        sum += fastrand::f64();
    }
    sum - 6.0
}

/// Sample from N(mean, sigma).
fn gaussian(mean: f64, sigma: f64) -> f64 {
    mean + sigma * approx_std_normal()
}

// ---------------------------------------------------------------------------
// Scenario presets
// ---------------------------------------------------------------------------

/// Pre-configured simulation profiles selectable via `SIM_SCENARIO` env var.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Dim room, people around, the odd button press. The hub should keep
    /// the LED on most of the time.
    Evening,
    /// Bright and mostly empty. The LED should stay off.
    Daylight,
    /// Daylight light levels plus injected I/O faults.
    Flaky,
}

impl Scenario {
    pub fn from_str_lossy(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "daylight" => Self::Daylight,
            "flaky" => Self::Flaky,
            _ => Self::Evening, // default
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Evening => write!(f, "evening"),
            Self::Daylight => write!(f, "daylight"),
            Self::Flaky => write!(f, "flaky"),
        }
    }
}

// ---------------------------------------------------------------------------
// Simulated board
// ---------------------------------------------------------------------------

pub struct SimBoard {
    scenario: Scenario,
    /// Current "true" ambient light in raw ADC units. Evolves per read.
    light: f64,
    /// Level the random walk reverts toward.
    light_center: f64,
    walk_sigma: f64,
    /// Probability that any single I/O call fails.
    fault_prob: f32,
    presence: bool,
    /// Polls until the presence state flips again.
    presence_ticks: u32,
    /// Polls the current button press has left; 0 = released.
    button_held: u32,
    /// Probability that a new button press starts on an idle poll.
    press_prob: f32,
    led: bool,
    fan: bool,
}

impl SimBoard {
    pub fn new(scenario: Scenario) -> Self {
        let (center_frac, walk_sigma, press_prob, fault_prob) = match scenario {
            Scenario::Evening => (0.08, 60.0, 0.01, 0.0_f32),
            Scenario::Daylight => (0.70, 80.0, 0.005, 0.0),
            Scenario::Flaky => (0.70, 80.0, 0.01, 0.08),
        };

        let light_center = center_frac * f64::from(SIM_FULL_SCALE);

        Self {
            scenario,
            light: light_center,
            light_center,
            walk_sigma,
            fault_prob,
            presence: false,
            presence_ticks: 0,
            button_held: 0,
            press_prob,
            led: false,
            fan: false,
        }
    }

    fn faulty(&self) -> bool {
        self.scenario == Scenario::Flaky && fastrand::f32() < self.fault_prob
    }
}

impl Board for SimBoard {
    fn read_light_raw(&mut self) -> Result<u16, BoardError> {
        if self.faulty() {
            return Err(BoardError::read("light", "injected fault"));
        }

        let pull = 0.03 * (self.light_center - self.light);
        self.light = (self.light + pull + gaussian(0.0, self.walk_sigma))
            .clamp(0.0, f64::from(SIM_FULL_SCALE));

        Ok(self.light.round() as u16)
    }

    fn light_full_scale(&self) -> u16 {
        SIM_FULL_SCALE
    }

    fn read_presence(&mut self) -> Result<bool, BoardError> {
        if self.faulty() {
            return Err(BoardError::read("presence", "injected fault"));
        }

        // Presence flips in bursts: tens of polls occupied, longer gaps empty.
        if self.presence_ticks == 0 {
            self.presence = !self.presence;
            self.presence_ticks = if self.presence {
                fastrand::u32(20..80)
            } else {
                fastrand::u32(50..300)
            };
        }
        self.presence_ticks -= 1;

        Ok(self.presence)
    }

    fn read_button(&mut self) -> Result<bool, BoardError> {
        if self.faulty() {
            return Err(BoardError::read("button", "injected fault"));
        }

        if self.button_held == 0 {
            if fastrand::f32() < self.press_prob {
                self.button_held = fastrand::u32(2..5);
            }
            return Ok(false);
        }

        self.button_held -= 1;
        // Samples inside a press occasionally read released: contact bounce.
        Ok(fastrand::f32() >= 0.25)
    }

    fn set_led(&mut self, on: bool) -> Result<(), BoardError> {
        if self.faulty() {
            return Err(BoardError::drive("led", "injected fault"));
        }
        if self.led != on {
            tracing::info!(on, "[sim] led");
        }
        self.led = on;
        Ok(())
    }

    fn set_fan(&mut self, on: bool) -> Result<(), BoardError> {
        if self.faulty() {
            return Err(BoardError::drive("fan", "injected fault"));
        }
        if self.fan != on {
            tracing::info!(on, "[sim] fan");
        }
        self.fan = on;
        Ok(())
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Collect n successful light readings, skipping injected faults.
    fn light_samples(board: &mut SimBoard, n: usize) -> Vec<u16> {
        let mut samples = Vec::with_capacity(n);
        while samples.len() < n {
            if let Ok(v) = board.read_light_raw() {
                samples.push(v);
            }
        }
        samples
    }

    // -- Light ---------------------------------------------------------------

    #[test]
    fn light_stays_within_full_scale() {
        let mut board = SimBoard::new(Scenario::Evening);
        for v in light_samples(&mut board, 500) {
            assert!(v <= SIM_FULL_SCALE, "out of range: {v}");
        }
    }

    #[test]
    fn light_is_temporally_coherent() {
        // Consecutive readings should move far less than the full range.
        let mut board = SimBoard::new(Scenario::Evening);
        let samples = light_samples(&mut board, 200);
        let max_jump = samples
            .windows(2)
            .map(|w| (i32::from(w[1]) - i32::from(w[0])).abs())
            .max()
            .unwrap();
        assert!(max_jump < 1500, "max consecutive jump too large: {max_jump}");
    }

    #[test]
    fn evening_reads_dark() {
        let mut board = SimBoard::new(Scenario::Evening);
        let samples = light_samples(&mut board, 200);
        let avg = samples.iter().map(|&v| f64::from(v)).sum::<f64>() / 200.0;
        // ~8% of full scale, well below a 20% threshold.
        assert!(
            avg < 0.2 * f64::from(SIM_FULL_SCALE),
            "evening should be dark: avg={avg:.0}"
        );
    }

    #[test]
    fn daylight_reads_bright() {
        let mut board = SimBoard::new(Scenario::Daylight);
        let samples = light_samples(&mut board, 200);
        let avg = samples.iter().map(|&v| f64::from(v)).sum::<f64>() / 200.0;
        assert!(
            avg > 0.4 * f64::from(SIM_FULL_SCALE),
            "daylight should be bright: avg={avg:.0}"
        );
    }

    // -- Faults ---------------------------------------------------------------

    #[test]
    fn evening_never_faults() {
        let mut board = SimBoard::new(Scenario::Evening);
        for _ in 0..500 {
            board.read_light_raw().unwrap();
            board.read_presence().unwrap();
            board.read_button().unwrap();
        }
    }

    #[test]
    fn flaky_injects_faults() {
        let mut board = SimBoard::new(Scenario::Flaky);
        let mut faults = 0;
        for _ in 0..500 {
            if board.read_light_raw().is_err() {
                faults += 1;
            }
        }
        // With 8% fault probability, 500 reads without a fault is absurd.
        assert!(faults > 0, "flaky scenario never faulted");
    }

    // -- Presence -------------------------------------------------------------

    #[test]
    fn presence_comes_in_bursts() {
        let mut board = SimBoard::new(Scenario::Evening);
        let mut transitions = 0;
        let mut last = board.read_presence().unwrap();
        for _ in 0..1000 {
            let p = board.read_presence().unwrap();
            if p != last {
                transitions += 1;
            }
            last = p;
        }
        // Burst lengths of 20..300 polls mean a handful of flips, nothing
        // like per-poll noise.
        assert!(transitions > 0, "presence never changed");
        assert!(transitions < 120, "presence flaps: {transitions} transitions");
    }

    // -- Button ---------------------------------------------------------------

    #[test]
    fn button_is_eventually_pressed() {
        let mut board = SimBoard::new(Scenario::Evening);
        let pressed = (0..10_000).any(|_| board.read_button().unwrap());
        assert!(pressed, "button never pressed in 10k polls");
    }

    #[test]
    fn button_is_mostly_released() {
        let mut board = SimBoard::new(Scenario::Evening);
        let held = (0..1000).filter(|_| board.read_button().unwrap()).count();
        assert!(held < 200, "button held too often: {held}/1000");
    }

    // -- Outputs --------------------------------------------------------------

    #[test]
    fn outputs_are_tracked() {
        let mut board = SimBoard::new(Scenario::Evening);
        board.set_led(true).unwrap();
        board.set_fan(true).unwrap();
        assert!(board.led);
        assert!(board.fan);

        board.set_led(false).unwrap();
        assert!(!board.led);
        assert!(board.fan);
    }

    // -- Scenario parsing ------------------------------------------------------

    #[test]
    fn scenario_from_str_lossy() {
        assert_eq!(Scenario::from_str_lossy("evening"), Scenario::Evening);
        assert_eq!(Scenario::from_str_lossy("DAYLIGHT"), Scenario::Daylight);
        assert_eq!(Scenario::from_str_lossy("Flaky"), Scenario::Flaky);
        assert_eq!(Scenario::from_str_lossy("unknown"), Scenario::Evening);
        assert_eq!(Scenario::from_str_lossy(""), Scenario::Evening);
    }

    #[test]
    fn scenario_display() {
        assert_eq!(Scenario::Evening.to_string(), "evening");
        assert_eq!(Scenario::Daylight.to_string(), "daylight");
        assert_eq!(Scenario::Flaky.to_string(), "flaky");
    }
}
