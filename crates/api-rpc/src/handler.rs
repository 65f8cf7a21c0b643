//! RPC Method Handlers
//!
//! Resolves the caller from the session token, then delegates to the core
//! services. Authorization itself lives in the services.

use crate::error::{throttled, to_rpc_error};
use crate::rate_limiter::{LoginThrottle, RateLimiter};
use crate::server::RpcServerConfig;
use crate::types::{
    ApplicationPaymentsRequest, Authed, ChangePasswordRequest, IdRequest, ListLocationsRequest,
    ListUsersRequest, LoginRequest, LoginResponse, MaintenanceRequest, OkResponse,
    RenameLocationRequest, ReviewRequest, SetActiveRequest, StatsResponse, TokenRequest,
    UpdateUserRequest,
};
use jsonrpsee::types::ErrorObjectOwned;
use kissan_core::application::{
    ApplicationFilter, ApplicationPage, ApplicationView, DashboardSummary, IssuedCredentials,
    MaintenanceScheduler, NewLocation, PaymentReceipt, PaymentReportFilter, Principal,
    RecordPayment, Report, Services, SubmitApplication,
};
use kissan_core::domain::{Location, NewUser, Payment, PaymentSummary, User};
use kissan_core::error::AppError;
use kissan_core::port::MaintenanceReport;
use std::time::{Duration, Instant};
use tracing::warn;

type RpcResult<T> = Result<T, ErrorObjectOwned>;

/// RPC Handler with injected services
pub struct RpcHandler {
    services: Services,
    maintenance: MaintenanceScheduler,
    rate_limiter: RateLimiter,
    login_throttle: LoginThrottle,
    start_time: Instant,
}

impl RpcHandler {
    pub fn new(services: Services, maintenance: MaintenanceScheduler, config: &RpcServerConfig) -> Self {
        Self {
            services,
            maintenance,
            rate_limiter: RateLimiter::new(config.rate_limit_burst, config.rate_limit_per_second),
            login_throttle: LoginThrottle::new(
                config.login_max_attempts,
                Duration::from_secs(config.login_window_secs),
            ),
            start_time: Instant::now(),
        }
    }

    fn check_rate(&self) -> RpcResult<()> {
        if self.rate_limiter.check() {
            Ok(())
        } else {
            Err(throttled("Rate limit exceeded. Please slow down."))
        }
    }

    /// Any live session, including one that still has to change its password
    async fn session(&self, token: &str) -> RpcResult<Principal> {
        self.check_rate()?;
        self.services
            .auth
            .authenticate(token)
            .await
            .map_err(to_rpc_error)
    }

    /// A live session that is allowed to use the application
    async fn principal(&self, token: &str) -> RpcResult<Principal> {
        let principal = self.session(token).await?;
        principal.require_password_current().map_err(to_rpc_error)?;
        Ok(principal)
    }

    // ---- auth ----

    /// auth.login.v1
    pub async fn login(&self, req: LoginRequest) -> RpcResult<LoginResponse> {
        self.check_rate()?;
        if !self.login_throttle.allows(&req.identifier).await {
            warn!(identifier = %req.identifier, "Login throttled");
            return Err(throttled("Too many failed logins. Try again later."));
        }

        match self.services.auth.login(&req.identifier, &req.password).await {
            Ok(outcome) => {
                self.login_throttle.clear(&req.identifier).await;
                Ok(LoginResponse {
                    token: outcome.session.token,
                    expires_at: outcome.session.expires_at,
                    must_change_password: outcome.user.must_change_password,
                    user: outcome.user,
                })
            }
            Err(e) => {
                if matches!(e, AppError::Unauthorized(_)) {
                    self.login_throttle.record_failure(&req.identifier).await;
                }
                Err(to_rpc_error(e))
            }
        }
    }

    /// auth.logout.v1
    pub async fn logout(&self, req: TokenRequest) -> RpcResult<OkResponse> {
        self.session(&req.token).await?;
        self.services
            .auth
            .logout(&req.token)
            .await
            .map_err(to_rpc_error)?;
        Ok(OkResponse::ok())
    }

    /// auth.me.v1
    pub async fn me(&self, req: TokenRequest) -> RpcResult<User> {
        let principal = self.session(&req.token).await?;
        self.services.auth.me(&principal).await.map_err(to_rpc_error)
    }

    /// auth.change_password.v1
    pub async fn change_password(&self, req: Authed<ChangePasswordRequest>) -> RpcResult<OkResponse> {
        let principal = self.session(&req.token).await?;
        self.services
            .auth
            .change_password(
                &principal,
                &req.token,
                &req.params.current_password,
                &req.params.new_password,
            )
            .await
            .map_err(to_rpc_error)?;
        Ok(OkResponse::ok())
    }

    // ---- users ----

    /// users.create.v1
    pub async fn create_user(&self, req: Authed<NewUser>) -> RpcResult<IssuedCredentials> {
        let principal = self.principal(&req.token).await?;
        self.services
            .users
            .create(&principal, req.params)
            .await
            .map_err(to_rpc_error)
    }

    /// users.list.v1
    pub async fn list_users(&self, req: Authed<ListUsersRequest>) -> RpcResult<Vec<User>> {
        let principal = self.principal(&req.token).await?;
        self.services
            .users
            .list(&principal, req.params.into())
            .await
            .map_err(to_rpc_error)
    }

    /// users.get.v1
    pub async fn get_user(&self, req: Authed<IdRequest>) -> RpcResult<User> {
        let principal = self.principal(&req.token).await?;
        self.services
            .users
            .get(&principal, &req.params.id)
            .await
            .map_err(to_rpc_error)
    }

    /// users.update.v1
    pub async fn update_user(&self, req: Authed<UpdateUserRequest>) -> RpcResult<User> {
        let principal = self.principal(&req.token).await?;
        self.services
            .users
            .update(&principal, &req.params.id, req.params.update)
            .await
            .map_err(to_rpc_error)
    }

    /// users.set_active.v1
    pub async fn set_user_active(&self, req: Authed<SetActiveRequest>) -> RpcResult<User> {
        let principal = self.principal(&req.token).await?;
        self.services
            .users
            .set_active(&principal, &req.params.id, req.params.active)
            .await
            .map_err(to_rpc_error)
    }

    /// users.reset_password.v1
    pub async fn reset_password(&self, req: Authed<IdRequest>) -> RpcResult<IssuedCredentials> {
        let principal = self.principal(&req.token).await?;
        self.services
            .users
            .reset_password(&principal, &req.params.id)
            .await
            .map_err(to_rpc_error)
    }

    // ---- locations ----

    /// locations.create.v1
    pub async fn create_location(&self, req: Authed<NewLocation>) -> RpcResult<Location> {
        let principal = self.principal(&req.token).await?;
        self.services
            .locations
            .create(&principal, req.params)
            .await
            .map_err(to_rpc_error)
    }

    /// locations.list.v1
    pub async fn list_locations(&self, req: Authed<ListLocationsRequest>) -> RpcResult<Vec<Location>> {
        self.principal(&req.token).await?;
        self.services
            .locations
            .list(req.params.parent_id.as_ref(), req.params.level)
            .await
            .map_err(to_rpc_error)
    }

    /// locations.get.v1
    pub async fn get_location(&self, req: Authed<IdRequest>) -> RpcResult<Location> {
        self.principal(&req.token).await?;
        self.services
            .locations
            .get(&req.params.id)
            .await
            .map_err(to_rpc_error)
    }

    /// locations.path.v1
    pub async fn location_path(&self, req: Authed<IdRequest>) -> RpcResult<Vec<Location>> {
        self.principal(&req.token).await?;
        self.services
            .locations
            .path(&req.params.id)
            .await
            .map_err(to_rpc_error)
    }

    /// locations.rename.v1
    pub async fn rename_location(&self, req: Authed<RenameLocationRequest>) -> RpcResult<Location> {
        let principal = self.principal(&req.token).await?;
        self.services
            .locations
            .rename(&principal, &req.params.id, &req.params.name)
            .await
            .map_err(to_rpc_error)
    }

    /// locations.delete.v1
    pub async fn delete_location(&self, req: Authed<IdRequest>) -> RpcResult<OkResponse> {
        let principal = self.principal(&req.token).await?;
        self.services
            .locations
            .delete(&principal, &req.params.id)
            .await
            .map_err(to_rpc_error)?;
        Ok(OkResponse::ok())
    }

    // ---- applications ----

    /// applications.submit.v1
    pub async fn submit_application(&self, req: Authed<SubmitApplication>) -> RpcResult<ApplicationView> {
        let principal = self.principal(&req.token).await?;
        self.services
            .applications
            .submit(&principal, req.params)
            .await
            .map(ApplicationView::from)
            .map_err(to_rpc_error)
    }

    /// applications.get.v1
    pub async fn get_application(&self, req: Authed<IdRequest>) -> RpcResult<ApplicationView> {
        let principal = self.principal(&req.token).await?;
        self.services
            .applications
            .get(&principal, &req.params.id)
            .await
            .map(ApplicationView::from)
            .map_err(to_rpc_error)
    }

    /// applications.list.v1
    pub async fn list_applications(&self, req: Authed<ApplicationFilter>) -> RpcResult<ApplicationPage> {
        let principal = self.principal(&req.token).await?;
        self.services
            .applications
            .list(&principal, req.params)
            .await
            .map_err(to_rpc_error)
    }

    /// applications.review.v1
    pub async fn review_application(&self, req: Authed<ReviewRequest>) -> RpcResult<ApplicationView> {
        let principal = self.principal(&req.token).await?;
        self.services
            .applications
            .review(&principal, &req.params.id, req.params.input)
            .await
            .map(ApplicationView::from)
            .map_err(to_rpc_error)
    }

    /// applications.withdraw.v1
    pub async fn withdraw_application(&self, req: Authed<IdRequest>) -> RpcResult<ApplicationView> {
        let principal = self.principal(&req.token).await?;
        self.services
            .applications
            .withdraw(&principal, &req.params.id)
            .await
            .map(ApplicationView::from)
            .map_err(to_rpc_error)
    }

    // ---- payments ----

    /// payments.record.v1
    pub async fn record_payment(&self, req: Authed<RecordPayment>) -> RpcResult<PaymentReceipt> {
        let principal = self.principal(&req.token).await?;
        self.services
            .payments
            .record(&principal, req.params)
            .await
            .map_err(to_rpc_error)
    }

    /// payments.list.v1
    pub async fn list_payments(&self, req: Authed<ApplicationPaymentsRequest>) -> RpcResult<Vec<Payment>> {
        let principal = self.principal(&req.token).await?;
        self.services
            .payments
            .list(&principal, &req.params.application_id)
            .await
            .map_err(to_rpc_error)
    }

    /// payments.summary.v1
    pub async fn payment_summary(&self, req: Authed<ApplicationPaymentsRequest>) -> RpcResult<PaymentSummary> {
        let principal = self.principal(&req.token).await?;
        self.services
            .payments
            .summary(&principal, &req.params.application_id)
            .await
            .map_err(to_rpc_error)
    }

    // ---- dashboard & reports ----

    /// dashboard.summary.v1
    pub async fn dashboard(&self, req: TokenRequest) -> RpcResult<DashboardSummary> {
        let principal = self.principal(&req.token).await?;
        self.services
            .dashboard
            .summary(&principal)
            .await
            .map_err(to_rpc_error)
    }

    /// reports.applications.v1
    pub async fn export_applications(&self, req: Authed<ApplicationFilter>) -> RpcResult<Report> {
        let principal = self.principal(&req.token).await?;
        self.services
            .export
            .applications(&principal, req.params)
            .await
            .map_err(to_rpc_error)
    }

    /// reports.payments.v1
    pub async fn export_payments(&self, req: Authed<PaymentReportFilter>) -> RpcResult<Report> {
        let principal = self.principal(&req.token).await?;
        self.services
            .export
            .payments(&principal, req.params)
            .await
            .map_err(to_rpc_error)
    }

    // ---- admin ----

    /// admin.stats.v1
    pub async fn stats(&self, req: TokenRequest) -> RpcResult<StatsResponse> {
        let principal = self.principal(&req.token).await?;
        let stats = self
            .maintenance
            .stats(&principal)
            .await
            .map_err(to_rpc_error)?;

        Ok(StatsResponse {
            stats,
            uptime_seconds: self.start_time.elapsed().as_secs() as i64,
        })
    }

    /// admin.maintenance.v1
    pub async fn maintenance(&self, req: Authed<MaintenanceRequest>) -> RpcResult<MaintenanceReport> {
        let principal = self.principal(&req.token).await?;
        self.maintenance
            .run_now(&principal, req.params.force_vacuum)
            .await
            .map_err(to_rpc_error)
    }
}
