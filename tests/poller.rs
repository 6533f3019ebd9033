mod common;

use std::sync::Arc;
use std::time::Duration;

use batchpipe::{ApiClient, JobSession, PollOutcome, Poller};
use common::{ok, requests_to, status_body, test_config, RecordingView};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STATUS_PATH: &str = "/api/status/abc";

async fn mount_status_sequence(server: &MockServer, bodies: Vec<ResponseTemplate>) {
    for response in bodies {
        Mock::given(method("GET"))
            .and(path(STATUS_PATH))
            .respond_with(response)
            .up_to_n_times(1)
            .mount(server)
            .await;
    }
}

fn poller_for(server: &MockServer, view: Arc<RecordingView>) -> Poller {
    let config = test_config(server);
    let client = Arc::new(ApiClient::new(&config).unwrap());
    Poller::new(client, view, config.poll_interval)
}

#[tokio::test]
async fn stops_exactly_at_100_and_reveals_download() {
    let server = MockServer::start().await;
    mount_status_sequence(
        &server,
        vec![
            ok(status_body(50.0, &["a"])),
            ok(status_body(100.0, &["a", "b"])),
        ],
    )
    .await;

    let view = RecordingView::new();
    let outcome = poller_for(&server, view.clone())
        .run(JobSession::new("abc"))
        .await;

    assert_eq!(outcome, PollOutcome::Completed);
    let state = view.snapshot();
    assert_eq!(state.log, vec!["a", "b"]);
    assert_eq!(state.progress, Some(100.0));
    assert_eq!(state.percentage, "100%");
    assert!(state.download_visible);
    assert!(!state.busy);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(requests_to(&server, STATUS_PATH).await, 2);
}

#[tokio::test]
async fn near_complete_progress_keeps_polling() {
    // Completion is an exact match on 100; 99.9 and 99.999 are still running.
    let server = MockServer::start().await;
    mount_status_sequence(
        &server,
        vec![
            ok(status_body(99.9, &[])),
            ok(status_body(99.999, &[])),
            ok(status_body(100.0, &[])),
        ],
    )
    .await;

    let view = RecordingView::new();
    let outcome = poller_for(&server, view.clone())
        .run(JobSession::new("abc"))
        .await;

    assert_eq!(outcome, PollOutcome::Completed);
    assert_eq!(requests_to(&server, STATUS_PATH).await, 3);
    let progress_events: Vec<_> = view
        .snapshot()
        .events
        .into_iter()
        .filter(|e| e.starts_with("progress:"))
        .collect();
    assert_eq!(
        progress_events,
        vec!["progress:99.9", "progress:99.999", "progress:100"]
    );
}

#[tokio::test]
async fn progress_past_100_is_not_completion() {
    // Flags the exact-equality check: 100.5 does not end the loop.
    let server = MockServer::start().await;
    mount_status_sequence(
        &server,
        vec![
            ok(status_body(100.5, &[])),
            ok(json!({"status": "error", "message": "stopped by test"})),
        ],
    )
    .await;

    let view = RecordingView::new();
    let outcome = poller_for(&server, view.clone())
        .run(JobSession::new("abc"))
        .await;

    assert_eq!(outcome, PollOutcome::Failed("stopped by test".to_string()));
    assert!(!view.snapshot().download_visible);
    assert_eq!(requests_to(&server, STATUS_PATH).await, 2);
}

#[tokio::test]
async fn duplicate_messages_logged_once_in_first_seen_order() {
    let server = MockServer::start().await;
    mount_status_sequence(
        &server,
        vec![
            ok(status_body(10.0, &["x", "y", "x"])),
            ok(status_body(60.0, &["y", "z", "x"])),
            ok(status_body(100.0, &["x", "y", "z", "z"])),
        ],
    )
    .await;

    let view = RecordingView::new();
    poller_for(&server, view.clone())
        .run(JobSession::new("abc"))
        .await;

    assert_eq!(view.snapshot().log, vec!["x", "y", "z"]);
}

#[tokio::test]
async fn error_status_halts_immediately() {
    let server = MockServer::start().await;
    mount_status_sequence(
        &server,
        vec![
            ok(status_body(20.0, &["started"])),
            ResponseTemplate::new(404)
                .set_body_json(json!({"status": "error", "message": "Process not found"})),
            ok(status_body(100.0, &[])),
        ],
    )
    .await;

    let view = RecordingView::new();
    let outcome = poller_for(&server, view.clone())
        .run(JobSession::new("abc"))
        .await;

    assert_eq!(outcome, PollOutcome::Failed("Process not found".to_string()));
    let state = view.snapshot();
    assert_eq!(state.log, vec!["started", "Error: Process not found"]);
    assert!(!state.busy);
    assert!(!state.download_visible);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(requests_to(&server, STATUS_PATH).await, 2);
}

#[tokio::test]
async fn transport_failure_halts_without_retry() {
    let server = MockServer::start().await;
    mount_status_sequence(
        &server,
        vec![ResponseTemplate::new(502).set_body_string("bad gateway")],
    )
    .await;

    let view = RecordingView::new();
    let outcome = poller_for(&server, view.clone())
        .run(JobSession::new("abc"))
        .await;

    assert!(matches!(outcome, PollOutcome::Failed(_)));
    let state = view.snapshot();
    assert_eq!(state.log.len(), 1);
    assert!(
        state.log[0].starts_with("Error: Request failed: HTTP 502"),
        "unexpected log line: {}",
        state.log[0]
    );
    assert!(state.progress.is_none());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(requests_to(&server, STATUS_PATH).await, 1);
}

#[tokio::test]
async fn unparseable_status_halts() {
    let server = MockServer::start().await;
    mount_status_sequence(
        &server,
        vec![ResponseTemplate::new(200).set_body_string("<html>oops</html>")],
    )
    .await;

    let view = RecordingView::new();
    let outcome = poller_for(&server, view.clone())
        .run(JobSession::new("abc"))
        .await;

    assert!(matches!(outcome, PollOutcome::Failed(_)));
    assert!(view.snapshot().log[0].starts_with("Error: Invalid response:"));
}

#[tokio::test]
async fn file_count_shown_only_with_both_counters() {
    let server = MockServer::start().await;
    mount_status_sequence(
        &server,
        vec![
            ok(json!({"status": "processing", "progress": 5, "current_file": null, "total_files": 10})),
            ok(json!({"status": "processing", "progress": 30, "current_file": 3, "total_files": 10})),
            ok(json!({"status": "completed", "progress": 100, "current_file": 10})),
        ],
    )
    .await;

    let view = RecordingView::new();
    poller_for(&server, view.clone())
        .run(JobSession::new("abc"))
        .await;

    let state = view.snapshot();
    let file_events: Vec<_> = state
        .events
        .iter()
        .filter(|e| e.starts_with("files:"))
        .collect();
    assert_eq!(file_events, vec!["files:Processed: 3 / 10 files"]);
    assert_eq!(state.file_count.as_deref(), Some("Processed: 3 / 10 files"));
}

#[tokio::test]
async fn cancelled_session_stops_polling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(ok(status_body(10.0, &["working"])))
        .mount(&server)
        .await;

    let view = RecordingView::new();
    let token = CancellationToken::new();
    let handle =
        poller_for(&server, view.clone()).spawn(JobSession::with_token("abc", token.clone()));

    tokio::time::sleep(Duration::from_millis(60)).await;
    token.cancel();
    let outcome = handle.await.unwrap();
    assert_eq!(outcome, PollOutcome::Cancelled);

    let polled = requests_to(&server, STATUS_PATH).await;
    assert!(polled >= 1);
    let events_after_cancel = view.snapshot().events.len();

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(requests_to(&server, STATUS_PATH).await, polled);
    assert_eq!(view.snapshot().events.len(), events_after_cancel);
    assert_eq!(view.snapshot().log, vec!["working"]);
}

#[tokio::test]
async fn already_cancelled_session_never_polls() {
    let server = MockServer::start().await;
    let view = RecordingView::new();
    let token = CancellationToken::new();
    token.cancel();

    let outcome = poller_for(&server, view.clone())
        .run(JobSession::with_token("abc", token))
        .await;

    assert_eq!(outcome, PollOutcome::Cancelled);
    assert_eq!(requests_to(&server, STATUS_PATH).await, 0);
    assert!(view.snapshot().events.is_empty());
}

#[tokio::test]
async fn float_counters_and_null_progress_keep_polling() {
    let server = MockServer::start().await;
    mount_status_sequence(
        &server,
        vec![
            ok(json!({"status": "processing", "progress": null, "messages": ["queued"]})),
            ok(json!({"status": "processing", "progress": 40.0, "current_file": 4.0, "total_files": 10.0})),
            ok(json!({"status": "completed", "progress": 100})),
        ],
    )
    .await;

    let view = RecordingView::new();
    let outcome = poller_for(&server, view.clone())
        .run(JobSession::new("abc"))
        .await;

    assert_eq!(outcome, PollOutcome::Completed);
    let state = view.snapshot();
    assert_eq!(state.log, vec!["queued"]);
    assert_eq!(state.file_count.as_deref(), Some("Processed: 4 / 10 files"));
    assert_eq!(requests_to(&server, STATUS_PATH).await, 3);
}
