//! Kissan Plus SDK - Rust Client Library
//!
//! Typed async client for the Kissan Plus back-office JSON-RPC API.
//!
//! # Example
//!
//! ```no_run
//! use kissan_sdk::{ApplicationFilter, KissanClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = KissanClient::connect("http://127.0.0.1:9530").await?;
//!     client.login("talati@example.in", "my-new-password1").await?;
//!
//!     let filter = ApplicationFilter {
//!         pending_for_me: true,
//!         ..Default::default()
//!     };
//!     for app in client.list_applications(&filter).await?.items {
//!         println!("{} {}", app.application.reference_no, app.status);
//!     }
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod types;

pub use client::KissanClient;
pub use error::{code, Result, SdkError};
pub use types::LoginResponse;

pub use kissan_core::application::{
    ApplicationFilter, ApplicationPage, ApplicationView, DashboardSummary, PaymentReceipt,
    RecordPayment, SubmitApplication,
};
pub use kissan_core::domain::{
    ApplicationKind, ApplicationStatus, Decision, Payment, PaymentMode, PaymentStatus,
    PaymentSummary, ReviewInput, Role, User,
};
