use focus_music_core::logging;

mod cli;

use crate::cli::CliCommand;

// Single-threaded: `simulate` pauses the Tokio clock, which needs a current-thread runtime.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize logging as early as possible.
    if let Err(err) = logging::init_logging() {
        logging::init_logging_stderr();
        tracing::warn!("file logging unavailable, using stderr: {:#}", err);
    }

    // Parse CLI and dispatch.
    if let Err(err) = CliCommand::run_from_args().await {
        eprintln!("focus-music error: {:#}", err);
        std::process::exit(1);
    }
}
