// src/ingest/providers/fixture.rs
//! Canned pages keyed by URL. Used by tests and offline runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::ingest::types::{ContentFetcher, FetchError, FetchOptions, FetchedPage};

#[derive(Default)]
pub struct FixtureFetcher {
    pages: HashMap<String, Result<FetchedPage, FetchError>>,
    calls: Mutex<Vec<String>>,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_markdown(mut self, url: &str, body: &str) -> Self {
        self.pages
            .insert(url.to_string(), Ok(FetchedPage::markdown(url, body)));
        self
    }

    pub fn with_error(mut self, url: &str, err: FetchError) -> Self {
        self.pages.insert(url.to_string(), Err(err));
        self
    }

    /// URLs requested so far, in order (retries included).
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ContentFetcher for FixtureFetcher {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn fetch(&self, url: &str, _opts: &FetchOptions) -> Result<FetchedPage, FetchError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(url.to_string());
        }
        match self.pages.get(url) {
            Some(r) => r.clone(),
            None => Err(FetchError::Rejected {
                status: 404,
                message: format!("no fixture for {url}"),
            }),
        }
    }
}
