// ABOUTME: Submission controller: validate, reset, upload, then hand off to the poller
// ABOUTME: Owns the current job id and cancels the previous poll chain on resubmission

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::ApiConfig;
use crate::poller::{PollOutcome, Poller};
use crate::remote::ApiClient;
use crate::session::JobSession;
use crate::view::{format_error, ProgressView};

pub const NO_FILE_PROMPT: &str = "Please select a file first";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Nothing was selected; the user was prompted and nothing else happened.
    NoFile,
    /// The server accepted the file and polling started for this job id.
    Started(String),
    /// Upload rejected or failed; the error was logged.
    Failed(String),
}

struct ActiveJob {
    job_id: String,
    cancel: CancellationToken,
    poll: Option<JoinHandle<PollOutcome>>,
}

pub struct Controller {
    client: Arc<ApiClient>,
    view: Arc<dyn ProgressView>,
    poller: Poller,
    active: Option<ActiveJob>,
}

impl Controller {
    pub fn new(config: &ApiConfig, view: Arc<dyn ProgressView>) -> Result<Self> {
        let client = Arc::new(ApiClient::new(config)?);
        let poller = Poller::new(client.clone(), view.clone(), config.poll_interval);
        Ok(Self {
            client,
            view,
            poller,
            active: None,
        })
    }

    pub fn current_job_id(&self) -> Option<&str> {
        self.active.as_ref().map(|job| job.job_id.as_str())
    }

    /// Upload `file` and start polling the resulting job.
    ///
    /// All per-job state is reset before the upload request goes out. A poll
    /// chain still running for an earlier job is cancelled first.
    pub async fn submit(&mut self, file: Option<&Path>) -> SubmitOutcome {
        let Some(path) = file else {
            self.view.alert(NO_FILE_PROMPT);
            return SubmitOutcome::NoFile;
        };

        self.cancel().await;
        self.reset_view();

        match self.client.submit_file(path).await {
            Ok(job_id) => {
                tracing::info!(job_id = %job_id, file = %path.display(), "Job submitted");
                self.start_polling(job_id.clone());
                SubmitOutcome::Started(job_id)
            }
            Err(err) => {
                tracing::warn!(file = %path.display(), error = %format!("{:#}", err), "Submission failed");
                self.view.log(&format_error(&err));
                self.view.set_busy(false);
                SubmitOutcome::Failed(format!("{:#}", err))
            }
        }
    }

    /// Follow a job submitted elsewhere, with the same reset as a submission.
    pub async fn attach(&mut self, job_id: impl Into<String>) {
        self.cancel().await;
        self.reset_view();
        self.start_polling(job_id.into());
    }

    fn reset_view(&self) {
        self.view.clear_log();
        self.view.set_progress(0.0);
        self.view.set_busy(true);
        self.view.set_download_visible(false);
    }

    fn start_polling(&mut self, job_id: String) {
        let cancel = CancellationToken::new();
        let session = JobSession::with_token(job_id.clone(), cancel.clone());
        let poll = self.poller.spawn(session);
        self.active = Some(ActiveJob {
            job_id,
            cancel,
            poll: Some(poll),
        });
    }

    /// Stop the active poll chain, if any, and forget its job id.
    ///
    /// Returns once the poll task has exited, so nothing from the old job
    /// reaches the view afterwards.
    pub async fn cancel(&mut self) {
        let Some(job) = self.active.take() else {
            return;
        };
        tracing::debug!(job_id = %job.job_id, "Cancelling active job");
        job.cancel.cancel();
        if let Some(poll) = job.poll {
            match poll.await {
                Ok(outcome) => {
                    tracing::debug!(job_id = %job.job_id, ?outcome, "Previous poll task stopped");
                }
                Err(err) => {
                    tracing::warn!(job_id = %job.job_id, error = %err, "Previous poll task panicked");
                }
            }
        }
    }

    /// Wait for the active poll chain to finish. The job id is kept so the
    /// result can still be downloaded. `None` when nothing is polling.
    pub async fn wait(&mut self) -> Result<Option<PollOutcome>> {
        let Some(handle) = self.active.as_mut().and_then(|job| job.poll.take()) else {
            return Ok(None);
        };
        let outcome = handle.await.context("Poll task panicked")?;
        Ok(Some(outcome))
    }

    pub fn download_url(&self) -> Option<String> {
        self.current_job_id().map(|id| self.client.download_url(id))
    }

    /// Fetch the current job's result into `dir`. A no-op without a job id.
    ///
    /// Completion is not re-checked here; the download affordance is only
    /// revealed once progress has reached 100.
    pub async fn download(
        &self,
        dir: &Path,
        overwrite: impl Fn(&Path) -> bool,
    ) -> Result<Option<PathBuf>> {
        let Some(job_id) = self.current_job_id() else {
            tracing::debug!("Download requested without an active job");
            return Ok(None);
        };
        self.client.download_to(job_id, dir, overwrite).await
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        if let Some(job) = self.active.take() {
            job.cancel.cancel();
        }
    }
}
