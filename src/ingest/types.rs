// src/ingest/types.rs
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentFormat {
    Markdown,
    Html,
}

/// Per-request options handed to the fetch service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    pub formats: Vec<ContentFormat>,
    pub only_main_content: bool,
    pub timeout: Duration,
    /// Extra time the service waits for client-side rendering before capture.
    pub wait_for: Option<Duration>,
    pub skip_tls_verification: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            formats: vec![ContentFormat::Markdown],
            only_main_content: true,
            timeout: Duration::from_secs(30),
            wait_for: None,
            skip_tls_verification: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedPage {
    pub url: String,
    pub markdown: Option<String>,
    pub html: Option<String>,
}

impl FetchedPage {
    pub fn markdown(url: &str, body: &str) -> Self {
        Self {
            url: url.to_string(),
            markdown: Some(body.to_string()),
            html: None,
        }
    }

    /// Usable text: markdown first, then HTML. `None` when both are blank.
    pub fn text(&self) -> Option<&str> {
        [self.markdown.as_deref(), self.html.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("fetch service rejected credentials (status {0})")]
    Auth(u16),

    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(String),

    #[error("fetch service error (status {status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("request rejected (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("fetch failed: {0}")]
    Failed(String),
}

impl FetchError {
    /// Classify a non-success HTTP status from the fetch service.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => FetchError::Auth(status),
            408 => FetchError::Timeout(Duration::ZERO),
            429 | 500..=599 => FetchError::Upstream { status, message },
            _ => FetchError::Rejected { status, message },
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, FetchError::Auth(_))
    }

    /// Transient failures are worth another attempt; definitive rejections are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::Timeout(_)
                | FetchError::Network(_)
                | FetchError::Upstream { .. }
                | FetchError::Failed(_)
        )
    }
}

/// Turns a URL into page content.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, url: &str, opts: &FetchOptions) -> Result<FetchedPage, FetchError>;
    fn name(&self) -> &'static str;
}
