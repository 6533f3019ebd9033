// ABOUTME: Job status poll loop: fetch, reconcile messages, update the view
// ABOUTME: Stops on progress == 100, on any error, or when the session is cancelled

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::remote::{ApiClient, JobStatus};
use crate::session::JobSession;
use crate::view::{format_error, ProgressView};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Progress reached exactly 100; the download affordance is visible.
    Completed,
    /// Server-reported or transport failure. Holds the rendered error.
    Failed(String),
    /// The session's token fired; the view was left untouched.
    Cancelled,
}

impl PollOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, PollOutcome::Completed)
    }
}

#[derive(Clone)]
pub struct Poller {
    client: Arc<ApiClient>,
    view: Arc<dyn ProgressView>,
    interval: Duration,
}

impl Poller {
    pub fn new(client: Arc<ApiClient>, view: Arc<dyn ProgressView>, interval: Duration) -> Self {
        Self {
            client,
            view,
            interval,
        }
    }

    pub fn spawn(&self, session: JobSession) -> JoinHandle<PollOutcome> {
        let poller = self.clone();
        tokio::spawn(async move { poller.run(session).await })
    }

    /// Poll until a terminal condition. Requests are strictly sequential and
    /// the delay starts after each response has been handled.
    pub async fn run(&self, mut session: JobSession) -> PollOutcome {
        let cancel = session.cancel_token().clone();
        let job_id = session.job_id().to_string();
        let mut polls: u64 = 0;

        loop {
            if cancel.is_cancelled() {
                tracing::info!(job_id = %job_id, polls, "Polling cancelled");
                return PollOutcome::Cancelled;
            }

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(job_id = %job_id, polls, "Polling cancelled during request");
                    return PollOutcome::Cancelled;
                }
                result = self.client.get_job_status(&job_id) => result,
            };
            polls += 1;

            if cancel.is_cancelled() {
                tracing::info!(job_id = %job_id, polls, "Polling cancelled, discarding response");
                return PollOutcome::Cancelled;
            }

            let status = match result {
                Ok(status) => status,
                Err(err) => {
                    tracing::warn!(job_id = %job_id, polls, error = %format!("{:#}", err), "Polling failed");
                    self.view.log(&format_error(&err));
                    self.view.set_busy(false);
                    return PollOutcome::Failed(format!("{:#}", err));
                }
            };

            tracing::debug!(
                job_id = %job_id,
                progress = status.progress,
                messages = status.messages().len(),
                "Status received"
            );
            self.apply(&mut session, &status);

            if status.is_complete() {
                tracing::info!(job_id = %job_id, polls, "Job complete");
                self.view.set_busy(false);
                self.view.set_download_visible(true);
                return PollOutcome::Completed;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(job_id = %job_id, polls, "Polling cancelled while waiting");
                    return PollOutcome::Cancelled;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }

    fn apply(&self, session: &mut JobSession, status: &JobStatus) {
        self.view.set_progress(status.progress);
        if let Some((current, total)) = status.file_counts() {
            self.view.set_file_count(current, total);
        }
        for message in session.seen_mut().take_new(status.messages()) {
            self.view.log(message);
        }
    }
}
