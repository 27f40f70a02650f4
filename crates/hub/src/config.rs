//! Environment-driven hub configuration with validation.

use anyhow::{anyhow, bail, Context, Result};
use std::net::SocketAddr;
use std::str::FromStr;

use crate::policy;

const DEFAULT_ADDR: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Address the web server binds, `WEB_ADDR`:`WEB_PORT`.
    pub bind_addr: SocketAddr,
    /// LED policy threshold, `LIGHT_THRESHOLD_PCT`.
    pub light_threshold_pct: f64,
    /// Darkness threshold surfaced to panels, `PANEL_LIGHT_THRESHOLD_PCT`.
    pub panel_light_threshold_pct: f64,
}

impl HubConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = get("WEB_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let port: u16 = parse_var("WEB_PORT", get("WEB_PORT"), DEFAULT_PORT)?;

        let light_threshold_pct = parse_var(
            "LIGHT_THRESHOLD_PCT",
            get("LIGHT_THRESHOLD_PCT"),
            policy::LIGHT_THRESHOLD_PCT,
        )?;
        let panel_light_threshold_pct = parse_var(
            "PANEL_LIGHT_THRESHOLD_PCT",
            get("PANEL_LIGHT_THRESHOLD_PCT"),
            policy::PANEL_LIGHT_THRESHOLD_PCT,
        )?;

        let bind_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .with_context(|| format!("invalid WEB_ADDR {host:?}"))?;

        let cfg = Self {
            bind_addr,
            light_threshold_pct,
            panel_light_threshold_pct,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Returns `Ok(())` or an error describing every violation found.
    fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if !(0.0..=100.0).contains(&self.light_threshold_pct) {
            errors.push(format!(
                "LIGHT_THRESHOLD_PCT {} out of range [0, 100]",
                self.light_threshold_pct
            ));
        }
        if !(0.0..=100.0).contains(&self.panel_light_threshold_pct) {
            errors.push(format!(
                "PANEL_LIGHT_THRESHOLD_PCT {} out of range [0, 100]",
                self.panel_light_threshold_pct
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            bail!("config validation failed:\n  - {}", errors.join("\n  - "));
        }
    }
}

/// Parse an optional env value, falling back to `default` when unset.
fn parse_var<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow!("invalid {key}: {raw:?}")),
        None => Ok(default),
    }
}

// ===========================================================================
// Tests
// ===========================================================================
