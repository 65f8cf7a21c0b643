// Notifier Port - outbound email

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A rendered message ready for delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub to_email: String,
    pub to_name: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one message
    ///
    /// # Errors
    /// - AppError::Notification if the transport rejects the message
    async fn send(&self, notification: &Notification) -> Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::sync::{Arc, Mutex};

    /// Records every message instead of sending it
    #[derive(Default, Clone)]
    pub struct RecordingNotifier {
        sent: Arc<Mutex<Vec<Notification>>>,
    }

    impl RecordingNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn sent(&self) -> Vec<Notification> {
            self.sent.lock().unwrap().clone()
        }

        pub fn sent_to(&self, email: &str) -> Vec<Notification> {
            self.sent()
                .into_iter()
                .filter(|n| n.to_email == email)
                .collect()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, notification: &Notification) -> Result<()> {
            self.sent.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    /// Always fails, for best-effort delivery tests
    pub struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn send(&self, _notification: &Notification) -> Result<()> {
            Err(AppError::Notification("SMTP relay unavailable".to_string()))
        }
    }
}
