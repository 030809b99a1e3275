// src/notify/mod.rs
pub mod discord;
pub mod email;
pub mod slack;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::proposal::ProposalRecord;

/// How many proposals a single message lists before summarising the rest.
pub const MAX_LISTED: usize = 10;

/// Emitted after a run inserted proposals that were not stored before.
#[derive(Debug, Clone, Serialize)]
pub struct NewProposalsEvent {
    pub proposals: Vec<ProposalRecord>,
    pub ts: DateTime<Utc>,
}

impl NewProposalsEvent {
    pub fn new(proposals: Vec<ProposalRecord>) -> Self {
        Self {
            proposals,
            ts: Utc::now(),
        }
    }

    pub fn headline(&self) -> String {
        match self.proposals.len() {
            1 => "1 new funding call".to_string(),
            n => format!("{n} new funding calls"),
        }
    }

    /// One line per proposal (capped at `max`), plus an "and N more" tail.
    pub fn lines(&self, max: usize) -> Vec<String> {
        let mut out: Vec<String> = self
            .proposals
            .iter()
            .take(max)
            .map(|p| format!("[{}] {} (closes {}) {}", p.agency, p.title, p.end_date, p.link))
            .collect();
        if self.proposals.len() > max {
            out.push(format!("... and {} more", self.proposals.len() - max));
        }
        out
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;
    async fn send(&self, ev: &NewProposalsEvent) -> Result<()>;
}

/// Fans one event out to every configured channel. A failing channel is logged
/// and does not stop the others.
#[derive(Default)]
pub struct NotifierMux {
    channels: Vec<Box<dyn Notifier>>,
}

impl NotifierMux {
    pub fn new(channels: Vec<Box<dyn Notifier>>) -> Self {
        Self { channels }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    /// Channels whose env vars are present: SLACK_WEBHOOK_URL, DISCORD_WEBHOOK_URL, SMTP_HOST.
    pub fn from_env() -> Self {
        let mut channels: Vec<Box<dyn Notifier>> = Vec::new();
        if let Some(slack) = slack::SlackNotifier::from_env() {
            channels.push(Box::new(slack));
        }
        if let Some(discord) = discord::DiscordNotifier::from_env() {
            channels.push(Box::new(discord));
        }
        if std::env::var("SMTP_HOST").is_ok() {
            match email::EmailSender::from_env() {
                Ok(mail) => channels.push(Box::new(mail)),
                Err(e) => tracing::warn!(target: "notify", error = %e, "email channel disabled"),
            }
        }
        tracing::info!(
            target: "notify",
            channels = ?channels.iter().map(|c| c.name()).collect::<Vec<_>>(),
            "notifiers configured"
        );
        Self { channels }
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Returns how many channels accepted the event.
    pub async fn notify(&self, ev: &NewProposalsEvent) -> usize {
        let mut delivered = 0usize;
        for ch in &self.channels {
            match ch.send(ev).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(target: "notify", channel = ch.name(), error = %e, "notification failed")
                }
            }
        }
        delivered
    }
}
