// ABOUTME: Shared helpers for integration tests
// ABOUTME: Recording view, mock API responses and test configuration

#![allow(dead_code)]

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use batchpipe::remote::FileLabel;
use batchpipe::{ApiConfig, ProgressView};
use serde_json::{json, Value};
use wiremock::{MockServer, Request, ResponseTemplate};

#[derive(Debug, Default, Clone)]
pub struct ViewState {
    pub log: Vec<String>,
    pub alerts: Vec<String>,
    pub progress: Option<f64>,
    pub percentage: String,
    pub file_count: Option<String>,
    pub busy: bool,
    pub download_visible: bool,
    pub events: Vec<String>,
}

/// Records every call so tests can assert on final state and call order.
#[derive(Default)]
pub struct RecordingView {
    state: Mutex<ViewState>,
}

impl RecordingView {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn snapshot(&self) -> ViewState {
        self.state.lock().unwrap().clone()
    }

    fn with(&self, event: String, f: impl FnOnce(&mut ViewState)) {
        let mut state = self.state.lock().unwrap();
        state.events.push(event);
        f(&mut state);
    }
}

impl ProgressView for RecordingView {
    fn alert(&self, message: &str) {
        self.with(format!("alert:{}", message), |s| s.alerts.push(message.to_string()));
    }

    fn clear_log(&self) {
        self.with("clear".to_string(), |s| s.log.clear());
    }

    fn log(&self, line: &str) {
        self.with(format!("log:{}", line), |s| s.log.push(line.to_string()));
    }

    fn set_progress(&self, percent: f64) {
        self.with(format!("progress:{}", percent), |s| {
            s.progress = Some(percent);
            s.percentage = batchpipe::view::format_percentage(percent);
        });
    }

    fn set_file_count(&self, current: &FileLabel, total: f64) {
        let label = batchpipe::view::format_file_count(current, total);
        self.with(format!("files:{}", label), |s| s.file_count = Some(label));
    }

    fn set_busy(&self, busy: bool) {
        self.with(format!("busy:{}", busy), |s| s.busy = busy);
    }

    fn set_download_visible(&self, visible: bool) {
        self.with(format!("download:{}", visible), |s| s.download_visible = visible);
    }
}

pub fn test_config(server: &MockServer) -> ApiConfig {
    ApiConfig {
        base_url: server.uri(),
        poll_interval: Duration::from_millis(10),
        request_timeout: Duration::from_secs(5),
    }
}

pub fn status_body(progress: f64, messages: &[&str]) -> Value {
    json!({
        "status": "processing",
        "progress": progress,
        "messages": messages,
    })
}

pub fn ok(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

pub fn upload_file(contents: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".zip")
        .tempfile()
        .unwrap();
    file.write_all(contents).unwrap();
    file.flush().unwrap();
    file
}

pub async fn requests_to(server: &MockServer, path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r: &&Request| r.url.path() == path)
        .count()
}
