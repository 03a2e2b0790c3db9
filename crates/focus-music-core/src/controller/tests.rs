//! Controller tests. Time is paused so retry delays elapse instantly and
//! can be measured on the recorded call timestamps.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::TryRecvError;
use tokio::time::Instant;

use super::{ControllerEvent, TrackController};
use crate::client::{ClientCall, ClientError, ScriptedClient, Track};
use crate::reporting::PlaybackState;
use crate::retry::RetryPolicy;

fn track(title: &str) -> Track {
    Track {
        title: title.to_string(),
        artist: "Miles Davis".to_string(),
        stream_url: format!("https://music.example.com/stream/{title}"),
        explicit: false,
        playback_reporting_token: None,
    }
}

fn reportable(title: &str, token: &str) -> Track {
    Track {
        playback_reporting_token: Some(token.to_string()),
        ..track(title)
    }
}

fn explicit(title: &str) -> Track {
    Track {
        explicit: true,
        ..track(title)
    }
}

fn controller(client: &Arc<ScriptedClient>) -> TrackController {
    TrackController::with_policy(
        Arc::clone(client) as Arc<dyn crate::client::MusicClient>,
        RetryPolicy::default(),
        true,
    )
}

fn prepare(playlist_id: &str) -> ClientCall {
    ClientCall::Prepare {
        playlist_id: playlist_id.to_string(),
    }
}

fn next(queue_id: &str) -> ClientCall {
    ClientCall::Next {
        queue_id: queue_id.to_string(),
    }
}

#[tokio::test(start_paused = true)]
async fn transient_failures_back_off_then_deliver() {
    let client = Arc::new(
        ScriptedClient::new()
            .push_error(ClientError::Http { status: 503 })
            .push_error(ClientError::Http { status: 500 })
            .push_track("q42", track("So What")),
    );
    let c = controller(&client);

    let got = c.request_next_track("jazz").await;
    assert_eq!(got, Some(track("So What")));

    let calls = client.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls.iter().all(|c| c.call == prepare("jazz")));
    let first_wait = calls[1].at - calls[0].at;
    let second_wait = calls[2].at - calls[1].at;
    assert!(first_wait >= c.policy().transient_base_delay);
    assert!(second_wait > first_wait, "backoff should grow");

    let cursor = c.cursor();
    assert_eq!(cursor.last_playlist_id(), "jazz");
    assert_eq!(cursor.last_queue_id(), "q42");
    assert_eq!(c.retry_index(), 0);
    assert!(!c.has_pending_request());
}

#[tokio::test(start_paused = true)]
async fn same_playlist_uses_next_other_playlist_prepares() {
    let client = Arc::new(
        ScriptedClient::new()
            .push_track("q1", track("one"))
            .push_track("q2", track("two"))
            .push_track("q9", track("nine")),
    );
    let c = controller(&client);

    assert_eq!(c.request_next_track("A").await, Some(track("one")));
    assert_eq!(c.request_next_track("A").await, Some(track("two")));
    assert_eq!(c.request_next_track("B").await, Some(track("nine")));

    let calls: Vec<_> = client.calls().into_iter().map(|c| c.call).collect();
    assert_eq!(calls, vec![prepare("A"), next("q1"), prepare("B")]);
    assert_eq!(c.cursor().last_queue_id(), "q9");
}

#[tokio::test(start_paused = true)]
async fn retries_are_bounded_per_class() {
    let policy = RetryPolicy::default();
    let cases = [
        (ClientError::Http { status: 503 }, policy.max_transient_retries),
        (ClientError::Network("reset".into()), policy.max_transient_retries),
        (ClientError::Http { status: 429 }, policy.max_rate_limited_retries),
        (ClientError::Malformed("no url".into()), policy.max_filtered_retries),
    ];

    for (error, ceiling) in cases {
        let client = Arc::new(ScriptedClient::always(Err(error.clone())));
        let c = controller(&client);

        assert_eq!(c.request_next_track("jazz").await, None, "{error}");
        assert_eq!(client.fetch_count(), ceiling as usize + 1, "{error}");
        assert_eq!(c.retry_index(), 0);
    }
}

#[tokio::test(start_paused = true)]
async fn rate_limited_waits_fixed_delay() {
    let client = Arc::new(
        ScriptedClient::new()
            .push_error(ClientError::Http { status: 429 })
            .push_error(ClientError::Http { status: 429 })
            .push_track("q1", track("one")),
    );
    let c = controller(&client);

    assert_eq!(c.request_next_track("jazz").await, Some(track("one")));
    let calls = client.calls();
    let delay = c.policy().rate_limited_delay;
    for pair in calls.windows(2) {
        let waited = pair[1].at - pair[0].at;
        assert!(waited >= delay && waited < delay * 2, "waited {waited:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn explicit_tracks_are_skipped_until_clean_one() {
    let client = Arc::new(
        ScriptedClient::new()
            .push_track("q1", explicit("bad"))
            .push_track("q2", track("good")),
    );
    let c = controller(&client);

    assert_eq!(c.request_next_track("jazz").await, Some(track("good")));
    let calls: Vec<_> = client.calls().into_iter().map(|c| c.call).collect();
    assert_eq!(calls, vec![prepare("jazz"), next("q1")]);
    assert_eq!(c.cursor().last_queue_id(), "q2");
}

#[tokio::test(start_paused = true)]
async fn explicit_filter_gives_up_after_ceiling() {
    let client = Arc::new(ScriptedClient::always(Ok(crate::client::QueueTrack {
        queue_id: "q1".into(),
        track: explicit("bad"),
    })));
    let c = controller(&client);

    assert_eq!(c.request_next_track("jazz").await, None);
    assert_eq!(
        client.fetch_count(),
        c.policy().max_filtered_retries as usize + 1
    );
}

#[tokio::test(start_paused = true)]
async fn explicit_track_delivered_when_filter_off() {
    let client = Arc::new(ScriptedClient::new().push_track("q1", explicit("bad")));
    let c = controller(&client);
    c.set_filter_explicit(false);

    assert_eq!(c.request_next_track("jazz").await, Some(explicit("bad")));
    assert_eq!(client.fetch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn forbidden_is_terminal_and_notifies_once() {
    let client = Arc::new(ScriptedClient::always(Err(ClientError::Http { status: 403 })));
    let c = controller(&client);
    let mut events = c.subscribe();

    assert_eq!(c.request_next_track("jazz").await, None);
    assert_eq!(client.fetch_count(), 1);
    assert_eq!(events.try_recv(), Ok(ControllerEvent::NoPremiumSubscription));
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_do_not_notify() {
    let client = Arc::new(ScriptedClient::always(Err(ClientError::Http { status: 500 })));
    let c = controller(&client);
    let mut events = c.subscribe();

    assert_eq!(c.request_next_track("jazz").await, None);
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test(start_paused = true)]
async fn new_request_resolves_pending_one_immediately() {
    let client = Arc::new(
        ScriptedClient::always(Ok(crate::client::QueueTrack {
            queue_id: "q1".into(),
            track: track("one"),
        }))
        .with_latency(Duration::from_secs(10)),
    );
    let c = controller(&client);

    let first = c.request_next_track("A");
    // Let the first fetch start.
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert!(c.has_pending_request());

    let second = c.request_next_track("B");
    let before = Instant::now();
    assert_eq!(first.await, None);
    assert_eq!(Instant::now(), before, "superseded request resolves without waiting");

    assert_eq!(second.await, Some(track("one")));
    let calls: Vec<_> = client.calls().into_iter().map(|c| c.call).collect();
    assert_eq!(calls, vec![prepare("A"), prepare("B")]);
    assert_eq!(c.cursor().last_playlist_id(), "B");
}

#[tokio::test(start_paused = true)]
async fn new_request_cancels_pending_retry_timer() {
    let client = Arc::new(
        ScriptedClient::new()
            .push_error(ClientError::Http { status: 429 })
            .push_track("q1", track("one")),
    );
    let c = controller(&client);

    let first = c.request_next_track("A");
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(c.retry_index(), 1, "first request should be waiting to retry");

    let second = c.request_next_track("A");
    assert_eq!(c.retry_index(), 0);
    assert_eq!(first.await, None);
    assert_eq!(second.await, Some(track("one")));

    // The old timer never fired: one failed prepare, one prepare by the new request.
    tokio::time::sleep(c.policy().rate_limited_delay * 2).await;
    assert_eq!(client.fetch_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn cancel_resolves_and_stops_fetching() {
    let client = Arc::new(
        ScriptedClient::always(Err(ClientError::Http { status: 503 }))
            .with_latency(Duration::from_secs(1)),
    );
    let c = controller(&client);

    let req = c.request_next_track("jazz");
    tokio::time::sleep(Duration::from_millis(1)).await;
    req.cancel();
    assert!(!c.has_pending_request());
    assert_eq!(req.await, None);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(client.fetch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancel_after_completion_is_a_no_op() {
    let client = Arc::new(
        ScriptedClient::new()
            .push_track("q1", track("one"))
            .with_latency(Duration::from_secs(1)),
    );
    let c = controller(&client);

    let done = c.request_next_track("A");
    tokio::time::sleep(Duration::from_secs(2)).await;
    let pending = c.request_next_track("A");
    done.cancel();
    assert!(c.has_pending_request(), "cancel must not touch a newer request");
    assert_eq!(done.await, Some(track("one")));
    pending.cancel();
    assert_eq!(pending.await, None);
}

#[tokio::test(start_paused = true)]
async fn dropping_controller_resolves_pending_request() {
    let client = Arc::new(
        ScriptedClient::new()
            .push_track("q1", track("one"))
            .with_latency(Duration::from_secs(5)),
    );
    let c = controller(&client);

    let req = c.request_next_track("A");
    tokio::time::sleep(Duration::from_millis(1)).await;
    drop(c);
    assert_eq!(req.await, None);
}

#[tokio::test(start_paused = true)]
async fn delivered_track_registers_reporting_token() {
    let t = reportable("one", "tok-1");
    let client = Arc::new(ScriptedClient::new().push_track("q1", t.clone()));
    let c = controller(&client);

    assert_eq!(c.request_next_track("A").await, Some(t.clone()));
    assert!(c.can_report(&t.stream_url));
    assert!(!c.can_report("https://music.example.com/stream/other"));
}

#[tokio::test(start_paused = true)]
async fn playback_reports_rotate_token_and_clean_up_on_end() {
    let t = reportable("one", "tok-1");
    let client = Arc::new(
        ScriptedClient::new()
            .push_track("q1", t.clone())
            .push_report(Ok(Some("tok-2".into())))
            .push_report(Ok(None)),
    );
    let c = controller(&client);
    c.request_next_track("A").await;

    c.report_playback(&t.stream_url, PlaybackState::Playing).await;
    // Repeated state: nothing sent.
    c.report_playback(&t.stream_url, PlaybackState::Playing).await;
    c.report_playback(&t.stream_url, PlaybackState::Ended).await;

    let reports: Vec<_> = client
        .calls()
        .into_iter()
        .filter_map(|c| match c.call {
            ClientCall::Report(r) => Some(r),
            _ => None,
        })
        .collect();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].token, "tok-1");
    assert_eq!(reports[0].previous, PlaybackState::None);
    assert_eq!(reports[0].current, PlaybackState::Playing);
    assert_eq!(reports[1].token, "tok-2");
    assert_eq!(reports[1].previous, PlaybackState::Playing);
    assert_eq!(reports[1].current, PlaybackState::Ended);
    assert!(!c.can_report(&t.stream_url));
}

#[tokio::test(start_paused = true)]
async fn failed_reports_are_dropped() {
    let t = reportable("one", "tok-1");
    let client = Arc::new(
        ScriptedClient::new()
            .push_track("q1", t.clone())
            .push_report(Err(ClientError::Http { status: 500 }))
            .push_report(Err(ClientError::Network("reset".into()))),
    );
    let c = controller(&client);
    c.request_next_track("A").await;

    c.report_playback(&t.stream_url, PlaybackState::Paused).await;
    assert!(c.can_report(&t.stream_url), "non-terminal failure keeps the entry");

    c.report_playback(&t.stream_url, PlaybackState::SwitchedToNext).await;
    assert!(!c.can_report(&t.stream_url), "terminal failure still removes the entry");
}

#[tokio::test(start_paused = true)]
async fn report_without_token_sends_nothing() {
    let client = Arc::new(ScriptedClient::new().push_track("q1", track("one")));
    let c = controller(&client);
    c.request_next_track("A").await;

    c.report_playback(&track("one").stream_url, PlaybackState::Playing)
        .await;
    assert_eq!(client.calls().len(), 1);
}
