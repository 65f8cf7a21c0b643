// Application Layer - Use Cases and Business Logic

pub mod access;
pub mod applications;
pub mod auth;
pub mod dashboard;
pub mod export;
pub mod locations;
pub mod maintenance;
pub mod notifications;
pub mod payments;
pub mod users;

use crate::port::{
    ApplicationRepository, IdProvider, LocationRepository, Notifier, PaymentRepository,
    SequenceRepository, SessionRepository, TimeProvider, UserRepository,
};
use std::sync::Arc;

// Re-exports
pub use access::Principal;
pub use applications::{
    ApplicationFilter, ApplicationPage, ApplicationService, ApplicationView, SubmitApplication,
};
pub use auth::{normalize_identifier, AuthConfig, AuthService, LoginOutcome};
pub use dashboard::{DashboardService, DashboardSummary};
pub use export::{ExportService, PaymentReportFilter, Report};
pub use locations::{LocationService, NewLocation};
pub use maintenance::MaintenanceScheduler;
pub use payments::{PaymentReceipt, PaymentService, RecordPayment};
pub use users::{BootstrapAdmin, IssuedCredentials, UserService};

/// Injected adapters shared by every use case
#[derive(Clone)]
pub struct ServiceContext {
    pub users: Arc<dyn UserRepository>,
    pub locations: Arc<dyn LocationRepository>,
    pub applications: Arc<dyn ApplicationRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub sequences: Arc<dyn SequenceRepository>,
    pub notifier: Arc<dyn Notifier>,
    pub id_provider: Arc<dyn IdProvider>,
    pub time_provider: Arc<dyn TimeProvider>,
}

/// All services, wired from one context
#[derive(Clone)]
pub struct Services {
    pub auth: Arc<AuthService>,
    pub users: Arc<UserService>,
    pub locations: Arc<LocationService>,
    pub applications: Arc<ApplicationService>,
    pub payments: Arc<PaymentService>,
    pub dashboard: Arc<DashboardService>,
    pub export: Arc<ExportService>,
}

impl Services {
    pub fn new(ctx: ServiceContext, auth_config: AuthConfig) -> Self {
        Self {
            auth: Arc::new(AuthService::new(ctx.clone(), auth_config)),
            users: Arc::new(UserService::new(ctx.clone())),
            locations: Arc::new(LocationService::new(ctx.clone())),
            applications: Arc::new(ApplicationService::new(ctx.clone())),
            payments: Arc::new(PaymentService::new(ctx.clone())),
            dashboard: Arc::new(DashboardService::new(ctx.clone())),
            export: Arc::new(ExportService::new(ctx)),
        }
    }
}
