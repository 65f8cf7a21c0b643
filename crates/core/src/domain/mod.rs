// Domain Layer - Pure business logic and entities

pub mod application;
pub mod credential;
pub mod error;
pub mod location;
pub mod payment;
pub mod role;
pub mod session;
pub mod user;

// Re-exports
pub use application::{
    Application, ApplicationId, ApplicationKind, ApplicationStatus, Decision, ReviewInput,
    ReviewStep,
};
pub use credential::PasswordHash;
pub use error::DomainError;
pub use location::{Location, LocationId, LocationLevel};
pub use payment::{Payment, PaymentId, PaymentMode, PaymentStatus, PaymentSummary};
pub use role::Role;
pub use session::Session;
pub use user::{NewUser, User, UserId, UserUpdate};
