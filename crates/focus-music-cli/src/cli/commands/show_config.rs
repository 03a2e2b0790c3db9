//! `focus-music config` – show config path and effective retry policy.

use anyhow::Result;
use focus_music_core::config::{self, FocusMusicConfig};

pub fn run_show_config(cfg: &FocusMusicConfig) -> Result<()> {
    let path = config::config_path()?;
    let p = cfg.retry_policy();
    println!("config: {}", path.display());
    println!("filter_explicit: {}", cfg.filter_explicit);
    println!(
        "{:<14} {:<8} {}",
        "CLASS", "RETRIES", "DELAY"
    );
    println!(
        "{:<14} {:<8} {:?} fixed",
        "rate-limited", p.max_rate_limited_retries, p.rate_limited_delay
    );
    println!(
        "{:<14} {:<8} {:?} doubling, max {:?}",
        "transient", p.max_transient_retries, p.transient_base_delay, p.transient_max_delay
    );
    println!(
        "{:<14} {:<8} {:?} fixed",
        "filtered", p.max_filtered_retries, p.filtered_delay
    );
    println!("{:<14} {:<8} -", "forbidden", 0);
    Ok(())
}
