//! Outbound verification mail
//!
//! Handlers never talk to SMTP directly. They push an [`OutboundMail`] onto
//! the [`Outbox`] and return; a single worker task delivers queued mail in
//! order. Delivery failures are logged and the mail is dropped.

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Subject line of the verification mail.
pub const VERIFICATION_SUBJECT: &str = "Bitte bestätige deine E-Mail-Adresse";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP delivery failed: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// A plain-text mail waiting for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMail {
    pub to: String,
    pub name: String,
    pub subject: String,
    pub body: String,
}

impl OutboundMail {
    pub fn verification(to: &str, name: &str, link: &str) -> Self {
        let body = format!(
            "Hallo {name},\n\n\
             bitte bestätige deine E-Mail-Adresse über den folgenden Link:\n\n\
             {link}\n\n\
             Falls du dich nicht registriert hast, kannst du diese Nachricht ignorieren.\n"
        );
        Self {
            to: to.to_string(),
            name: name.to_string(),
            subject: VERIFICATION_SUBJECT.to_string(),
            body,
        }
    }
}

/// `{domain}/api/auth/verify?token=…`
pub fn verification_link(domain: &str, token: &str) -> String {
    format!("{}/api/auth/verify?token={}", domain.trim_end_matches('/'), token)
}

/// Mail delivery backend.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutboundMail) -> Result<(), MailError>;
}

/// SMTP connection settings.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    pub starttls: bool,
}

/// Delivers over SMTP, with STARTTLS unless turned off.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };
        let mut builder = builder.port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from: config.from.parse()?,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: &OutboundMail) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(Mailbox::new(Some(mail.name.clone()), mail.to.parse()?))
            .subject(mail.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body.clone())?;

        self.transport.send(message).await?;
        Ok(())
    }
}

/// Writes mail to the log instead of sending it. Used when no SMTP host is
/// configured.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: &OutboundMail) -> Result<(), MailError> {
        info!(
            "Mail to {} <{}>: {}\n{}",
            mail.name, mail.to, mail.subject, mail.body
        );
        Ok(())
    }
}

/// Sending half of the mail queue.
#[derive(Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<OutboundMail>,
}

impl Outbox {
    /// Queue a mail. Never blocks; a closed queue is logged.
    pub fn enqueue(&self, mail: OutboundMail) {
        if let Err(e) = self.tx.send(mail) {
            error!("Mail queue closed, dropping mail to {}", e.0.to);
        }
    }
}

/// Create the mail queue.
pub fn outbox() -> (Outbox, mpsc::UnboundedReceiver<OutboundMail>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Outbox { tx }, rx)
}

/// Deliver queued mail until every [`Outbox`] handle has been dropped.
pub async fn run_mail_worker(mut rx: mpsc::UnboundedReceiver<OutboundMail>, mailer: Arc<dyn Mailer>) {
    info!("Mail worker started");

    while let Some(mail) = rx.recv().await {
        match mailer.send(&mail).await {
            Ok(()) => info!("Delivered mail to {}", mail.to),
            Err(e) => warn!("Failed to deliver mail to {}: {}", mail.to, e),
        }
    }

    info!("Mail worker stopped");
}
