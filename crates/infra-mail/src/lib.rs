// Kissan Plus Infrastructure - Mail Adapters
// Implements: Notifier (SMTP relay, log-only fallback)

mod log_notifier;
mod smtp;

pub use log_notifier::LogNotifier;
pub use smtp::{SmtpConfig, SmtpNotifier};
