// SMTP Notifier (STARTTLS relay)

use async_trait::async_trait;
use kissan_core::error::{AppError, Result};
use kissan_core::port::{Notification, Notifier};
use lettre::message::{header::ContentType, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::{Deserialize, Serialize};
use tracing::info;

fn default_port() -> u16 {
    587
}

/// SMTP relay settings (`smtp.*` in the daemon config)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Sender, e.g. `Kissan Plus <noreply@kissan.in>`
    pub from: String,
}

pub struct SmtpNotifier {
    from: Mailbox,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpNotifier {
    /// Validate the sender and build the transport; no connection is opened yet
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid smtp.from '{}': {}", config.from, e)))?;

        let creds = Credentials::new(config.username.clone(), config.password.clone());

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| AppError::Config(format!("Invalid smtp.host '{}': {}", config.host, e)))?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self { from, mailer })
    }
}

/// Build a multipart (plain text + HTML) message
pub(crate) fn build_message(from: &Mailbox, notification: &Notification) -> Result<Message> {
    let address: Address = notification.to_email.parse().map_err(|e| {
        AppError::Notification(format!(
            "Invalid recipient '{}': {}",
            notification.to_email, e
        ))
    })?;
    let to = Mailbox::new(Some(notification.to_name.clone()), address);

    Message::builder()
        .from(from.clone())
        .to(to)
        .subject(notification.subject.clone())
        .multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(notification.text_body.clone()),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(notification.html_body.clone()),
                ),
        )
        .map_err(|e| AppError::Notification(format!("Failed to build email message: {}", e)))
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        let email = build_message(&self.from, notification)?;

        self.mailer
            .send(email)
            .await
            .map_err(|e| AppError::Notification(format!("Failed to send email via SMTP: {}", e)))?;

        info!(
            to = %notification.to_email,
            subject = %notification.subject,
            "Email sent successfully"
        );
        Ok(())
    }
}
