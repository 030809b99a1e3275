// src/notify/slack.rs
use anyhow::{Context, Result};
use reqwest::Client;

use super::{NewProposalsEvent, Notifier, MAX_LISTED};

pub struct SlackNotifier {
    webhook_url: String,
    client: Client,
}

impl SlackNotifier {
    /// `None` when SLACK_WEBHOOK_URL is unset or blank.
    pub fn from_env() -> Option<Self> {
        std::env::var("SLACK_WEBHOOK_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .map(Self::new)
    }

    pub fn new(url: String) -> Self {
        Self {
            webhook_url: url,
            client: Client::new(),
        }
    }
}

pub(crate) fn render(ev: &NewProposalsEvent) -> String {
    let mut text = format!("*{}*", ev.headline());
    for line in ev.lines(MAX_LISTED) {
        text.push_str("\n• ");
        text.push_str(&line);
    }
    text
}

#[async_trait::async_trait]
impl Notifier for SlackNotifier {
    fn name(&self) -> &'static str {
        "slack"
    }

    async fn send(&self, ev: &NewProposalsEvent) -> Result<()> {
        let body = serde_json::json!({ "text": render(ev) });
        self.client
            .post(&self.webhook_url)
            .json(&body)
            .send()
            .await
            .context("slack post")?
            .error_for_status()
            .context("slack non-2xx")?;
        Ok(())
    }
}
