// Payment Repository Port (Interface)

use crate::domain::{ApplicationId, Payment};
use crate::error::Result;
use crate::port::application_repository::RecordScope;
use async_trait::async_trait;

/// Repository interface for Payment persistence
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Insert `payment` only if the application's total paid, including this
    /// payment, stays within `demand_paise`. Check and insert are atomic.
    ///
    /// Exceeding the demand yields `AppError::Conflict`.
    async fn insert_within_demand(&self, payment: &Payment, demand_paise: i64) -> Result<()>;

    /// Oldest first
    async fn list_by_application(&self, application_id: &ApplicationId) -> Result<Vec<Payment>>;

    async fn total_paid(&self, application_id: &ApplicationId) -> Result<i64>;

    /// Payments on applications in scope, oldest first
    async fn list(&self, scope: &RecordScope) -> Result<Vec<Payment>>;

    async fn total_collected(&self, scope: &RecordScope) -> Result<i64>;
}
