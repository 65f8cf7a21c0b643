// Log-only Notifier, used when SMTP is not configured

use async_trait::async_trait;
use kissan_core::error::Result;
use kissan_core::port::{Notification, Notifier};
use tracing::info;

#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        info!(
            to = %notification.to_email,
            subject = %notification.subject,
            body = %notification.text_body,
            "Email not sent (SMTP not configured)"
        );
        Ok(())
    }
}
