// ABOUTME: HTTP client for the file processing API
// ABOUTME: Handles file submission, status polling, result download and error mapping

use anyhow::{Context, Result};
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use super::models::{JobStatus, SubmitResponse};
use crate::config::ApiConfig;
use crate::error::ApiError;

pub const UPLOAD_FIELD: &str = "file";

pub struct ApiClient {
    client: Client,
    api_base_url: String,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.api_base_url
    }

    /// Upload `path` as the single multipart `file` field and return the job id.
    pub async fn submit_file(&self, path: &Path) -> Result<String> {
        let url = format!("{}/api/process", self.api_base_url);

        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        tracing::debug!(file = %file_name, size = bytes.len(), "Uploading file");

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/octet-stream")?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))
            .context("Failed to submit file to the processing service")?;

        let submitted: SubmitResponse = read_envelope(response).await?;
        match submitted.process_id {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err(ApiError::Parse("submission response did not include a process_id".into()).into()),
        }
    }

    pub async fn get_job_status(&self, job_id: &str) -> Result<JobStatus> {
        let url = format!("{}/api/status/{}", self.api_base_url, job_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))
            .context("Failed to get job status from the processing service")?;

        read_envelope(response).await
    }

    pub fn download_url(&self, job_id: &str) -> String {
        format!("{}/api/download/{}", self.api_base_url, job_id)
    }

    /// Save the job's result into `dir`.
    ///
    /// The file name comes from `Content-Disposition` when the server sends
    /// one. Returns `None` when the target exists and `overwrite` declines it.
    pub async fn download_to(
        &self,
        job_id: &str,
        dir: &Path,
        overwrite: impl Fn(&Path) -> bool,
    ) -> Result<Option<PathBuf>> {
        let url = self.download_url(job_id);

        let mut response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))
            .context("Failed to download processed file")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<SubmitResponse>(&body) {
                Ok(parsed) if parsed.is_error() => ApiError::Server(parsed.error_message()),
                _ => ApiError::Transport(format!("HTTP {}: {}", status, body.trim())),
            };
            return Err(anyhow::Error::new(message).context("Download failed"));
        }

        let file_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(disposition_filename)
            .unwrap_or_else(|| default_download_name(job_id));
        let target = dir.join(file_name);

        if target.exists() && !overwrite(&target) {
            tracing::info!(path = %target.display(), "Keeping existing file, download skipped");
            return Ok(None);
        }

        let partial = partial_path(&target);
        let written = match stream_into(&mut response, &partial).await {
            Ok(written) => written,
            Err(err) => {
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(err);
            }
        };
        if let Err(err) = tokio::fs::rename(&partial, &target).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(err).with_context(|| format!("Failed to move download into {}", target.display()));
        }

        tracing::info!(path = %target.display(), bytes = written, "Download complete");
        Ok(Some(target))
    }
}

/// Body goes to a sibling `.part` file so an interrupted download never
/// replaces an earlier result.
fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    target.with_file_name(name)
}

async fn stream_into(response: &mut Response, path: &Path) -> Result<u64> {
    let mut file = tokio::fs::File::create(path)
        .await
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut written: u64 = 0;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| ApiError::Transport(e.to_string()))
        .context("Download interrupted")?
    {
        file.write_all(&chunk)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

/// Both endpoints answer with a `status` envelope; `"error"` means failure.
trait Envelope {
    fn is_error(&self) -> bool;
    fn error_message(&self) -> String;
}

impl Envelope for SubmitResponse {
    fn is_error(&self) -> bool {
        SubmitResponse::is_error(self)
    }
    fn error_message(&self) -> String {
        SubmitResponse::error_message(self)
    }
}

impl Envelope for JobStatus {
    fn is_error(&self) -> bool {
        JobStatus::is_error(self)
    }
    fn error_message(&self) -> String {
        JobStatus::error_message(self)
    }
}

/// Decode a JSON envelope regardless of HTTP status; the server reports its
/// own failures as `{"status": "error"}` bodies on 4xx/5xx responses.
async fn read_envelope<T: DeserializeOwned + Envelope>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ApiError::Transport(e.to_string()))
        .context("Failed to read response body")?;

    match serde_json::from_str::<T>(&body) {
        Ok(parsed) if parsed.is_error() => Err(ApiError::Server(parsed.error_message()).into()),
        Ok(parsed) if status.is_success() => Ok(parsed),
        Ok(_) => Err(ApiError::Transport(format!("HTTP {}", status)).into()),
        Err(e) if status.is_success() => Err(ApiError::Parse(e.to_string()).into()),
        Err(_) => Err(ApiError::Transport(format!("HTTP {}: {}", status, body.trim())).into()),
    }
}

fn disposition_filename(header: &str) -> Option<String> {
    let raw = header
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))?;
    let name = raw.trim_matches('"');
    // Never let the server pick a directory.
    let name = Path::new(name).file_name()?.to_str()?;
    (!name.is_empty()).then(|| name.to_string())
}

pub fn default_download_name(job_id: &str) -> String {
    format!("processed_data_{}.txt", job_id)
}
