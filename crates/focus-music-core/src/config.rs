use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum retries after an HTTP 429.
    pub max_rate_limited_retries: u32,
    /// Fixed wait in seconds after an HTTP 429.
    pub rate_limited_delay_secs: f64,
    /// Maximum retries after a server or network failure.
    pub max_transient_retries: u32,
    /// First backoff delay in seconds for server failures (e.g. 0.5 = 500ms); doubles per retry.
    pub transient_base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub transient_max_delay_secs: f64,
    /// Maximum retries after an explicit or malformed track.
    pub max_filtered_retries: u32,
    /// Fixed wait in seconds before asking for another track after a filtered one.
    pub filtered_delay_secs: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let p = RetryPolicy::default();
        Self {
            max_rate_limited_retries: p.max_rate_limited_retries,
            rate_limited_delay_secs: p.rate_limited_delay.as_secs_f64(),
            max_transient_retries: p.max_transient_retries,
            transient_base_delay_secs: p.transient_base_delay.as_secs_f64(),
            transient_max_delay_secs: p.transient_max_delay.as_secs_f64(),
            max_filtered_retries: p.max_filtered_retries,
            filtered_delay_secs: p.filtered_delay.as_secs_f64(),
        }
    }
}

/// Negative or non-finite values fall back to zero.
fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_rate_limited_retries: cfg.max_rate_limited_retries,
            rate_limited_delay: secs(cfg.rate_limited_delay_secs),
            max_transient_retries: cfg.max_transient_retries,
            transient_base_delay: secs(cfg.transient_base_delay_secs),
            transient_max_delay: secs(cfg.transient_max_delay_secs),
            max_filtered_retries: cfg.max_filtered_retries,
            filtered_delay: secs(cfg.filtered_delay_secs),
        }
    }
}

/// Global configuration loaded from `~/.config/focus-music/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusMusicConfig {
    /// Skip tracks the service marks as explicit.
    pub filter_explicit: bool,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for FocusMusicConfig {
    fn default() -> Self {
        Self {
            filter_explicit: true,
            retry: None,
        }
    }
}

impl FocusMusicConfig {
    /// Effective retry policy: the `[retry]` section, or defaults.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
            .as_ref()
            .map(RetryPolicy::from)
            .unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("focus-music")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FocusMusicConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = FocusMusicConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: FocusMusicConfig = toml::from_str(&data)?;
    Ok(cfg)
}
