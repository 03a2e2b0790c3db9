//! CLI for replaying scripted focus music sessions.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use focus_music_core::config;
use std::path::PathBuf;

use commands::{run_show_config, run_simulate, SimulateOptions};

/// Top-level CLI for the focus music next-track client.
#[derive(Debug, Parser)]
#[command(name = "focus-music")]
#[command(about = "Replay scripted music service sessions through the next-track controller", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run the requests of a scenario file against its scripted responses.
    Simulate {
        /// Path to the scenario TOML file.
        scenario: PathBuf,
        /// Deliver explicit tracks even if the config or scenario filters them.
        #[arg(long)]
        no_filter_explicit: bool,
        /// Actually wait out retry delays instead of advancing a virtual clock.
        #[arg(long)]
        real_time: bool,
    },

    /// Show the config file path and the effective retry policy.
    Config,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Simulate {
                scenario,
                no_filter_explicit,
                real_time,
            } => {
                let opts = SimulateOptions {
                    no_filter_explicit,
                    real_time,
                };
                run_simulate(&cfg, &scenario, opts).await?
            }
            CliCommand::Config => run_show_config(&cfg)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
