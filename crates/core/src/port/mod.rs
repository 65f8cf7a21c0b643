// Port Layer - Interfaces for external dependencies

pub mod application_repository;
pub mod id_provider; // For deterministic testing
pub mod location_repository;
pub mod maintenance;
pub mod notifier;
pub mod payment_repository;
pub mod sequence_repository;
pub mod session_repository;
pub mod time_provider;
pub mod user_repository;

// Re-exports
pub use application_repository::{
    ApplicationQuery, ApplicationRepository, ApplicationStats, RecordScope,
};
pub use id_provider::IdProvider;
pub use location_repository::{LocationRepository, LocationUsage};
pub use maintenance::{Maintenance, MaintenanceConfig, MaintenanceReport, MaintenanceStats};
pub use notifier::{Notification, Notifier};
pub use payment_repository::PaymentRepository;
pub use sequence_repository::SequenceRepository;
pub use session_repository::SessionRepository;
pub use time_provider::TimeProvider;
pub use user_repository::{UserFilter, UserRepository};
