// ABOUTME: Per-submission job context handed to the poll loop
// ABOUTME: Holds the job id, the seen-message set and the cancellation token

use std::collections::HashSet;
use tokio_util::sync::CancellationToken;

/// Message strings already shown for one job. Matching is exact string
/// equality, so two events with identical text are shown once.
#[derive(Debug, Default)]
pub struct SeenMessages {
    seen: HashSet<String>,
}

impl SeenMessages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the messages not seen before, in the order given, and marks
    /// them seen. Duplicates inside `messages` are returned once.
    pub fn take_new<'a>(&mut self, messages: &'a [String]) -> Vec<&'a str> {
        let mut fresh = Vec::new();
        for message in messages {
            // The server resends its whole history; only unseen lines are cloned.
            if !self.seen.contains(message.as_str()) {
                self.seen.insert(message.clone());
                fresh.push(message.as_str());
            }
        }
        fresh
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Everything the poll loop needs for one job. Built fresh per submission.
#[derive(Debug)]
pub struct JobSession {
    job_id: String,
    seen: SeenMessages,
    cancel: CancellationToken,
}

impl JobSession {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self::with_token(job_id, CancellationToken::new())
    }

    pub fn with_token(job_id: impl Into<String>, cancel: CancellationToken) -> Self {
        Self {
            job_id: job_id.into(),
            seen: SeenMessages::new(),
            cancel,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn seen_mut(&mut self) -> &mut SeenMessages {
        &mut self.seen
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
