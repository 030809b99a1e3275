// src/notify/discord.rs
use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::{NewProposalsEvent, Notifier, MAX_LISTED};
use crate::ingest::retry::{Backoff, RetryPolicy};

#[derive(Clone)]
pub struct DiscordNotifier {
    webhook: String,
    client: Client,
    timeout: Duration,
    retry: RetryPolicy,
}

impl DiscordNotifier {
    pub fn new(webhook: String) -> Self {
        Self {
            webhook,
            client: Client::new(),
            timeout: Duration::from_secs(5),
            retry: RetryPolicy::new(
                3,
                Backoff::Exponential {
                    base: Duration::from_millis(500),
                    max: Duration::from_secs(4),
                },
            ),
        }
    }

    pub fn from_env() -> Option<Self> {
        std::env::var("DISCORD_WEBHOOK_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .map(Self::new)
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retry.max_attempts = retries.max(1);
        self
    }
}

#[async_trait::async_trait]
impl Notifier for DiscordNotifier {
    fn name(&self) -> &'static str {
        "discord"
    }

    async fn send(&self, ev: &NewProposalsEvent) -> Result<()> {
        let payload = DiscordWebhookPayload::embed(&ev.headline(), &ev.lines(MAX_LISTED).join("\n"));

        let this = self;
        let payload = &payload;
        self.retry
            .run(
                "discord webhook",
                move |_| async move {
                    let rsp = this
                        .client
                        .post(&this.webhook)
                        .timeout(this.timeout)
                        .json(payload)
                        .send()
                        .await
                        .map_err(|e| anyhow!("Discord webhook request failed: {e}"))?;
                    rsp.error_for_status()
                        .map(|_| ())
                        .map_err(|e| anyhow!("Discord webhook HTTP error: {e}"))
                },
                |_| true,
            )
            .await
    }
}

#[derive(Serialize)]
struct DiscordEmbed {
    title: String,
    description: String,
}

#[derive(Serialize)]
struct DiscordWebhookPayload {
    content: Option<String>,
    embeds: Vec<DiscordEmbed>,
}

impl DiscordWebhookPayload {
    fn embed(title: &str, description: &str) -> Self {
        Self {
            content: None,
            embeds: vec![DiscordEmbed {
                title: title.to_string(),
                // Discord rejects embed descriptions over 4096 chars.
                description: description.chars().take(4000).collect(),
            }],
        }
    }
}
