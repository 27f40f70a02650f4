//! Sensor and actuator access behind one trait, so the sync loop runs the
//! same against real wiring and the simulator.
//!
//! The real board (`gpio` feature) wires up:
//! - LDR on ADS1115 channel AIN0 over I2C (ambient light)
//! - PIR motion sensor on GPIO 17 (presence)
//! - push button on GPIO 27, pull-up, pressed = low
//! - LED on GPIO 22, active-high
//! - fan relay on GPIO 23, active-low

use thiserror::Error;

#[cfg(feature = "gpio")]
use anyhow::Context;
#[cfg(feature = "gpio")]
use rppal::gpio::{Gpio, InputPin, OutputPin};
#[cfg(feature = "gpio")]
use rppal::i2c::I2c;
#[cfg(feature = "gpio")]
use std::{thread, time::Duration};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("{channel} read failed: {detail}")]
    Read {
        channel: &'static str,
        detail: String,
    },
    #[error("{channel} drive failed: {detail}")]
    Drive {
        channel: &'static str,
        detail: String,
    },
}

impl BoardError {
    pub fn read(channel: &'static str, detail: impl ToString) -> Self {
        Self::Read {
            channel,
            detail: detail.to_string(),
        }
    }

    pub fn drive(channel: &'static str, detail: impl ToString) -> Self {
        Self::Drive {
            channel,
            detail: detail.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// One room's worth of I/O. Readings may fail per call; the sync loop
/// treats a failed reading as unknown and keeps going.
pub trait Board {
    /// Raw light level from the LDR, 0 (dark) to [`Board::light_full_scale`].
    fn read_light_raw(&mut self) -> Result<u16, BoardError>;

    /// Largest raw value `read_light_raw` can return.
    fn light_full_scale(&self) -> u16;

    /// Motion detector level, true while motion is seen.
    fn read_presence(&mut self) -> Result<bool, BoardError>;

    /// Button level, true while pressed. Polarity is the board's business.
    fn read_button(&mut self) -> Result<bool, BoardError>;

    fn set_led(&mut self, on: bool) -> Result<(), BoardError>;

    fn set_fan(&mut self, on: bool) -> Result<(), BoardError>;
}

// ---------------------------------------------------------------------------
// Real board (gpio feature, Raspberry Pi)
// ---------------------------------------------------------------------------

#[cfg(feature = "gpio")]
const ADS1115_ADDR: u16 = 0x48;

/// BCM pin assignments.
#[cfg(feature = "gpio")]
const PIR_PIN: u8 = 17;
#[cfg(feature = "gpio")]
const BUTTON_PIN: u8 = 27;
#[cfg(feature = "gpio")]
const LED_PIN: u8 = 22;
#[cfg(feature = "gpio")]
const FAN_PIN: u8 = 23;

// ── ADS1115 registers ───────────────────────────────────────────────────────

#[cfg(feature = "gpio")]
const REG_CONVERSION: u8 = 0x00;
#[cfg(feature = "gpio")]
const REG_CONFIG: u8 = 0x01;

/// Single-shot read of AIN0 vs GND:
///   OS=1 (start), MUX=100 (AIN0), PGA=001 (±4.096 V), MODE=1 (single-shot),
///   DR=100 (128 SPS), COMP_QUE=11 (comparator off).
#[cfg(feature = "gpio")]
const CONFIG_AIN0: u16 = 0b1_100_001_1_100_0_0_0_11;

/// Bit 15 of the config register: conversion-ready flag when read back.
#[cfg(feature = "gpio")]
const OS_READY_BIT: u16 = 1 << 15;

/// Conversion time at 128 SPS is ~7.8 ms. Wait 9 ms for margin.
#[cfg(feature = "gpio")]
const CONVERSION_WAIT: Duration = Duration::from_millis(9);

/// Single-ended ADS1115 full scale (15-bit).
#[cfg(feature = "gpio")]
const ADS1115_FULL_SCALE: u16 = 32767;

#[cfg(feature = "gpio")]
pub struct GpioBoard {
    i2c: I2c,
    pir: InputPin,
    button: InputPin,
    led: OutputPin,
    fan: OutputPin,
}

#[cfg(feature = "gpio")]
impl GpioBoard {
    /// Open I2C bus 1 for the ADS1115 and claim the four GPIO lines.
    /// Both outputs start at their OFF level.
    pub fn new() -> anyhow::Result<Self> {
        let mut i2c = I2c::new().context("i2c bus")?;
        i2c.set_slave_address(ADS1115_ADDR).context("ads1115 address")?;

        let gpio = Gpio::new().context("gpio chip")?;
        let pir = gpio.get(PIR_PIN).context("pir pin")?.into_input();
        let button = gpio
            .get(BUTTON_PIN)
            .context("button pin")?
            .into_input_pullup();
        let led = gpio.get(LED_PIN).context("led pin")?.into_output_low();
        // Active-low relay: high = OFF.
        let fan = gpio.get(FAN_PIN).context("fan pin")?.into_output_high();

        tracing::info!(
            adc = format_args!("0x{ADS1115_ADDR:02x}"),
            pir = PIR_PIN,
            button = BUTTON_PIN,
            led = LED_PIN,
            fan = FAN_PIN,
            "gpio board initialised"
        );

        Ok(Self {
            i2c,
            pir,
            button,
            led,
            fan,
        })
    }
}

#[cfg(feature = "gpio")]
impl Board for GpioBoard {
    fn read_light_raw(&mut self) -> Result<u16, BoardError> {
        // Write config register to start a single-shot conversion.
        self.i2c
            .block_write(REG_CONFIG, &CONFIG_AIN0.to_be_bytes())
            .map_err(|e| BoardError::read("light", e))?;

        thread::sleep(CONVERSION_WAIT);

        // Poll the OS bit to confirm conversion is done. Normally one wait
        // is enough at 128 SPS; retry briefly to be safe.
        for _ in 0..3 {
            let mut buf = [0u8; 2];
            self.i2c
                .block_read(REG_CONFIG, &mut buf)
                .map_err(|e| BoardError::read("light", e))?;
            if u16::from_be_bytes(buf) & OS_READY_BIT != 0 {
                break;
            }
            thread::sleep(Duration::from_millis(2));
        }

        let mut buf = [0u8; 2];
        self.i2c
            .block_read(REG_CONVERSION, &mut buf)
            .map_err(|e| BoardError::read("light", e))?;

        // Single-ended reads are non-negative; clamp against bus corruption.
        let raw = i16::from_be_bytes(buf);
        Ok(raw.clamp(0, ADS1115_FULL_SCALE as i16) as u16)
    }

    fn light_full_scale(&self) -> u16 {
        ADS1115_FULL_SCALE
    }

    fn read_presence(&mut self) -> Result<bool, BoardError> {
        Ok(self.pir.is_high())
    }

    fn read_button(&mut self) -> Result<bool, BoardError> {
        // Pull-up wiring: pressed pulls the line low.
        Ok(self.button.is_low())
    }

    fn set_led(&mut self, on: bool) -> Result<(), BoardError> {
        if on {
            self.led.set_high();
        } else {
            self.led.set_low();
        }
        Ok(())
    }

    fn set_fan(&mut self, on: bool) -> Result<(), BoardError> {
        // Active-low relay: LOW = ON, HIGH = OFF.
        if on {
            self.fan.set_low();
        } else {
            self.fan.set_high();
        }
        Ok(())
    }
}

// ===========================================================================
// Tests
// ===========================================================================
