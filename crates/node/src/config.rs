//! Environment-driven node configuration with validation.

use anyhow::{anyhow, bail, Result};
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_HUB_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_POLL_MS: u64 = 100;
const DEFAULT_DEBOUNCE_MS: u64 = 300;
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 3_000;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Hub base URL, `HUB_URL`. Stored without a trailing slash.
    pub hub_url: String,
    /// Length of one sync cycle, `POLL_MS`.
    pub poll_interval: Duration,
    /// Button hold-off window, `DEBOUNCE_MS`.
    pub debounce: Duration,
    /// TCP connect budget for hub calls, `CONNECT_TIMEOUT_MS`.
    pub connect_timeout: Duration,
    /// Whole-request budget for hub calls, `REQUEST_TIMEOUT_MS`.
    pub request_timeout: Duration,
}

impl NodeConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let hub_url = get("HUB_URL")
            .unwrap_or_else(|| DEFAULT_HUB_URL.to_string())
            .trim()
            .trim_end_matches('/')
            .to_string();

        let poll_ms: u64 = parse_var("POLL_MS", get("POLL_MS"), DEFAULT_POLL_MS)?;
        let debounce_ms: u64 = parse_var("DEBOUNCE_MS", get("DEBOUNCE_MS"), DEFAULT_DEBOUNCE_MS)?;
        let connect_ms: u64 = parse_var(
            "CONNECT_TIMEOUT_MS",
            get("CONNECT_TIMEOUT_MS"),
            DEFAULT_CONNECT_TIMEOUT_MS,
        )?;
        let request_ms: u64 = parse_var(
            "REQUEST_TIMEOUT_MS",
            get("REQUEST_TIMEOUT_MS"),
            DEFAULT_REQUEST_TIMEOUT_MS,
        )?;

        let cfg = Self {
            hub_url,
            poll_interval: Duration::from_millis(poll_ms),
            debounce: Duration::from_millis(debounce_ms),
            connect_timeout: Duration::from_millis(connect_ms),
            request_timeout: Duration::from_millis(request_ms),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Returns `Ok(())` or an error describing every violation found.
    fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if !self.hub_url.starts_with("http://") && !self.hub_url.starts_with("https://") {
            errors.push(format!(
                "HUB_URL {:?} must start with http:// or https://",
                self.hub_url
            ));
        }
        if self.poll_interval.is_zero() {
            errors.push("POLL_MS must be positive".to_string());
        }
        if self.connect_timeout.is_zero() {
            errors.push("CONNECT_TIMEOUT_MS must be positive".to_string());
        }
        if self.request_timeout.is_zero() {
            errors.push("REQUEST_TIMEOUT_MS must be positive".to_string());
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
