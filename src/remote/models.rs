// ABOUTME: Wire types for the processing API (submission, status polling)
// ABOUTME: Lenient on optional fields so partial server payloads still decode

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

pub const STATUS_ERROR: &str = "error";

const UNKNOWN_ERROR: &str = "unknown error";

/// Answer to `POST /api/process`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub status: String, // "processing" / "ok" or "error"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubmitResponse {
    pub fn is_error(&self) -> bool {
        self.status == STATUS_ERROR
    }

    pub fn error_message(&self) -> String {
        error_text(self.message.as_deref(), self.error.as_deref())
    }
}

/// Answer to `GET /api/status/{id}`. `messages` is the full history, not a delta.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub status: String, // "processing", "completed", "ok" or "error"
    #[serde(default, deserialize_with = "null_as_zero")]
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_file: Option<FileLabel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_files: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobStatus {
    pub fn is_error(&self) -> bool {
        self.status == STATUS_ERROR
    }

    pub fn error_message(&self) -> String {
        error_text(self.message.as_deref(), self.error.as_deref())
    }

    pub fn messages(&self) -> &[String] {
        self.messages.as_deref().unwrap_or_default()
    }

    /// Both counters, only when each carries a meaningful value.
    pub fn file_counts(&self) -> Option<(&FileLabel, f64)> {
        let current = self.current_file.as_ref().filter(|c| c.is_present())?;
        let total = self.total_files.filter(|&t| t > 0.0)?;
        Some((current, total))
    }

    /// Completion is signalled only by progress being exactly 100.
    pub fn is_complete(&self) -> bool {
        self.progress == 100.0
    }
}

/// The current-file counter; servers send it either as a number or as a label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileLabel {
    Number(f64),
    Name(String),
}

impl FileLabel {
    fn is_present(&self) -> bool {
        match self {
            FileLabel::Number(n) => *n != 0.0,
            FileLabel::Name(s) => !s.is_empty(),
        }
    }
}

impl fmt::Display for FileLabel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FileLabel::Number(n) => write!(f, "{}", format_count(*n)),
            FileLabel::Name(s) => write!(f, "{}", s),
        }
    }
}

/// Whole counts print as integers (`10`, not `10.0`); anything else as-is.
pub fn format_count(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_default())
}

fn error_text(message: Option<&str>, error: Option<&str>) -> String {
    message
        .or(error)
        .unwrap_or(UNKNOWN_ERROR)
        .to_string()
}
