//! `focus-music simulate` – replay a scenario through the track controller.

use anyhow::{Context, Result};
use focus_music_core::client::{ClientCall, MusicClient, Scenario, ScriptedClient};
use focus_music_core::config::FocusMusicConfig;
use focus_music_core::TrackController;
use std::path::Path;
use std::sync::Arc;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, Default)]
pub struct SimulateOptions {
    pub no_filter_explicit: bool,
    pub real_time: bool,
}

pub async fn run_simulate(
    cfg: &FocusMusicConfig,
    path: &Path,
    opts: SimulateOptions,
) -> Result<()> {
    let scenario = Scenario::from_path(path)
        .with_context(|| format!("loading scenario {}", path.display()))?;

    if !opts.real_time {
        tokio::time::pause();
    }

    let client = Arc::new(scenario.client());
    let controller = TrackController::new(Arc::clone(&client) as Arc<dyn MusicClient>, cfg);
    let filter_explicit = !opts.no_filter_explicit
        && scenario.filter_explicit.unwrap_or(cfg.filter_explicit);
    controller.set_filter_explicit(filter_explicit);
    let mut events = controller.subscribe();

    let start = Instant::now();
    let mut printed = 0;
    for (i, request) in scenario.requests.iter().enumerate() {
        println!("request #{} playlist={}", i + 1, request.playlist_id);
        let outcome = controller.request_next_track(&request.playlist_id).await;

        if let Some(track) = &outcome {
            for state in &request.report {
                controller.report_playback(&track.stream_url, *state).await;
            }
        }

        printed = print_calls(&client, start, printed);
        while let Ok(event) = events.try_recv() {
            println!("  event: {:?}", event);
        }
        match outcome {
            Some(track) => println!(
                "  => {} - {}{}",
                track.artist,
                track.title,
                if track.explicit { " [explicit]" } else { "" }
            ),
            None => println!("  => no track"),
        }
    }

    let cursor = controller.cursor();
    println!(
        "cursor: playlist={} queue={}",
        or_dash(cursor.last_playlist_id()),
        or_dash(cursor.last_queue_id())
    );
    Ok(())
}

/// Print calls made since the last print; returns the new count.
fn print_calls(client: &ScriptedClient, start: Instant, already_printed: usize) -> usize {
    let calls = client.calls();
    for recorded in calls.iter().skip(already_printed) {
        let offset = recorded.at.duration_since(start).as_secs_f64();
        let line = match &recorded.call {
            ClientCall::Prepare { playlist_id } => format!("prepare {playlist_id}"),
            ClientCall::Next { queue_id } => format!("next {queue_id}"),
            ClientCall::Report(r) => format!("report {:?} -> {:?}", r.previous, r.current),
        };
        println!("  {:>9.3}s {}", offset, line);
    }
    calls.len()
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() {
        "-"
    } else {
        s
    }
}
