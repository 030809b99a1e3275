// src/notify/email.rs
use anyhow::{Context, Result};
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::{NewProposalsEvent, Notifier};

pub struct EmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{key} missing"))
}

impl EmailSender {
    pub fn from_env() -> Result<Self> {
        let host = required("SMTP_HOST")?;
        let creds = Credentials::new(required("SMTP_USER")?, required("SMTP_PASS")?);
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
            .context("invalid SMTP_HOST")?
            .credentials(creds)
            .build();

        let from: Mailbox = required("NOTIFY_EMAIL_FROM")?
            .parse()
            .context("invalid NOTIFY_EMAIL_FROM")?;
        let to: Mailbox = required("NOTIFY_EMAIL_TO")?
            .parse()
            .context("invalid NOTIFY_EMAIL_TO")?;

        Ok(Self { mailer, from, to })
    }
}

pub(crate) fn render_body(ev: &NewProposalsEvent) -> String {
    let mut body = format!("{} found at {}\n\n", ev.headline(), ev.ts.to_rfc3339());
    for p in &ev.proposals {
        body.push_str(&format!(
            "{}\n  Agency: {}\n  Opens: {}  Closes: {}\n  {}\n\n",
            p.title, p.agency, p.start_date, p.end_date, p.link
        ));
    }
    body
}

#[async_trait::async_trait]
impl Notifier for EmailSender {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn send(&self, ev: &NewProposalsEvent) -> Result<()> {
        let msg = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(format!("Grant scout: {}", ev.headline()))
            .header(header::ContentType::TEXT_PLAIN)
            .body(render_body(ev))
            .context("build email")?;

        self.mailer.send(msg).await.context("send email")?;
        Ok(())
    }
}
