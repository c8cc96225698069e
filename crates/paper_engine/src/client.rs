use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use paper_core::{JobId, JobSnapshot};
use paper_logging::{paper_debug, paper_info};
use reqwest::StatusCode;
use url::Url;

use crate::wire::{decode_snapshot, decode_upload, error_detail};
use crate::{FailureKind, FetchError};

/// Same-origin proxy path used when nothing overrides the service address.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api/";

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_body_bytes: u64,
    pub max_upload_bytes: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_body_bytes: 5 * 1024 * 1024,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

#[async_trait::async_trait]
pub trait PaperClient: Send + Sync {
    /// `GET {base}/paper/{job_id}`.
    async fn fetch_snapshot(&self, job_id: &JobId) -> Result<JobSnapshot, FetchError>;

    /// `POST {base}/upload` with the document as multipart field `file`.
    async fn upload(&self, path: &Path) -> Result<JobId, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestPaperClient {
    settings: ClientSettings,
    base_url: Url,
    client: reqwest::Client,
}

impl ReqwestPaperClient {
    pub fn new(settings: ClientSettings) -> Result<Self, FetchError> {
        let base_url = Url::parse(&settings.base_url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(FetchError::new(
                FailureKind::InvalidUrl,
                format!("{} cannot be used as a base url", settings.base_url),
            ));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            settings,
            base_url,
            client,
        })
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Appends percent-encoded path segments to the base url.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::new(FailureKind::InvalidUrl, "base url cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn read_body(&self, response: reqwest::Response) -> Result<Vec<u8>, FetchError> {
        let max_bytes = self.settings.max_body_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }
}

#[async_trait::async_trait]
impl PaperClient for ReqwestPaperClient {
    async fn fetch_snapshot(&self, job_id: &JobId) -> Result<JobSnapshot, FetchError> {
        let url = self.endpoint(&["paper", job_id.as_str()])?;
        paper_debug!(job: job_id; "GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::new(FailureKind::NotFound, status.to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let body = self.read_body(response).await?;
        decode_snapshot(&body, job_id)
    }

    async fn upload(&self, path: &Path) -> Result<JobId, FetchError> {
        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if !is_pdf {
            return Err(FetchError::new(
                FailureKind::UnsupportedFile,
                format!("{} is not a PDF document", path.display()),
            ));
        }

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|err| FetchError::new(FailureKind::Io, format!("{}: {err}", path.display())))?;
        let max_bytes = self.settings.max_upload_bytes;
        if metadata.len() > max_bytes {
            return Err(FetchError::new(
                FailureKind::TooLarge {
                    max_bytes,
                    actual: Some(metadata.len()),
                },
                "document exceeds upload limit",
            ));
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|err| FetchError::new(FailureKind::Io, format!("{}: {err}", path.display())))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.clone())
            .mime_str("application/pdf")
            .map_err(|err| FetchError::new(FailureKind::Malformed, err.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let url = self.endpoint(&["upload"])?;
        paper_info!("uploading {} ({} bytes) to {}", file_name, metadata.len(), url);
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let body = self.read_body(response).await?;
        if !status.is_success() {
            let detail = error_detail(&body).unwrap_or_else(|| status.to_string());
            return Err(FetchError::new(
                FailureKind::UploadRejected {
                    status: status.as_u16(),
                    detail: detail.clone(),
                },
                detail,
            ));
        }
        decode_upload(&body)
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() || err.is_body() {
        return FetchError::new(FailureKind::Malformed, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
