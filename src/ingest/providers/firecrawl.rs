// src/ingest/providers/firecrawl.rs
//! Hosted rendering service: POST `{base}/v1/scrape` with a bearer key, get markdown back.

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::ingest::types::{ContentFetcher, ContentFormat, FetchError, FetchOptions, FetchedPage};

/// Slack on top of the service-side timeout before we give up locally.
const CLIENT_GRACE: Duration = Duration::from_secs(5);

pub struct FirecrawlClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScrapeRequest<'a> {
    url: &'a str,
    formats: &'a [ContentFormat],
    only_main_content: bool,
    timeout: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    wait_for: Option<u64>,
    skip_tls_verification: bool,
}

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    success: bool,
    data: Option<ScrapeData>,
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ScrapeData {
    markdown: Option<String>,
    html: Option<String>,
}

impl FirecrawlClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("grant-scout/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building fetch service http client")?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/scrape", self.base_url)
    }
}

#[async_trait]
impl ContentFetcher for FirecrawlClient {
    fn name(&self) -> &'static str {
        "firecrawl"
    }

    async fn fetch(&self, url: &str, opts: &FetchOptions) -> Result<FetchedPage, FetchError> {
        let t0 = Instant::now();
        let body = ScrapeRequest {
            url,
            formats: &opts.formats,
            only_main_content: opts.only_main_content,
            timeout: opts.timeout.as_millis() as u64,
            wait_for: opts.wait_for.map(|d| d.as_millis() as u64),
            skip_tls_verification: opts.skip_tls_verification,
        };
        let bound = opts.timeout + CLIENT_GRACE;

        let send = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .timeout(bound)
            .json(&body)
            .send();

        let resp = match tokio::time::timeout(bound, send).await {
            Err(_) => return Err(FetchError::Timeout(bound)),
            Ok(Err(e)) if e.is_timeout() => return Err(FetchError::Timeout(bound)),
            Ok(Err(e)) => return Err(FetchError::Network(e.to_string())),
            Ok(Ok(r)) => r,
        };

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(FetchError::from_status(status.as_u16(), message));
        }

        let envelope: ScrapeResponse = resp
            .json()
            .await
            .map_err(|e| FetchError::Failed(format!("decoding scrape response: {e}")))?;
        if !envelope.success {
            return Err(FetchError::Failed(
                envelope.error.unwrap_or_else(|| "service reported failure".into()),
            ));
        }

        let data = envelope.data.unwrap_or_default();
        histogram!("fetch_ms").record(t0.elapsed().as_millis() as f64);
        Ok(FetchedPage {
            url: url.to_string(),
            markdown: data.markdown,
            html: data.html,
        })
    }
}
