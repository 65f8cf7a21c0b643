//! JSON-RPC Server
//!
//! JSON-RPC 2.0 over HTTP. Binds to localhost by default; put a reverse
//! proxy in front when exposing it to the office network.

use crate::error::ServerError;
use crate::handler::RpcHandler;
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use kissan_core::application::{MaintenanceScheduler, Services};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9530;

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    pub port: u16,
    pub rate_limit_burst: u32,
    pub rate_limit_per_second: u32,
    pub login_max_attempts: u32,
    pub login_window_secs: u64,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
            rate_limit_burst: 200,
            rate_limit_per_second: 100,
            login_max_attempts: 5,
            login_window_secs: 300,
        }
    }
}

/// Registers one handler method under its wire name
macro_rules! method {
    ($module:expr, $handler:expr, $name:literal, $call:ident) => {{
        let handler = Arc::clone(&$handler);
        $module
            .register_async_method($name, move |params, _, _| {
                let handler = handler.clone();
                async move { handler.$call(params.parse()?).await }
            })
            .map_err(|e| ServerError::Register(e.to_string()))?;
    }};
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, services: Services, maintenance: MaintenanceScheduler) -> Self {
        let handler = Arc::new(RpcHandler::new(services, maintenance, &config));
        Self { config, handler }
    }

    /// Every method served, in registration order
    pub fn module(&self) -> Result<RpcModule<()>, ServerError> {
        let mut module = RpcModule::new(());

        method!(module, self.handler, "auth.login.v1", login);
        method!(module, self.handler, "auth.logout.v1", logout);
        method!(module, self.handler, "auth.me.v1", me);
        method!(module, self.handler, "auth.change_password.v1", change_password);

        method!(module, self.handler, "users.create.v1", create_user);
        method!(module, self.handler, "users.list.v1", list_users);
        method!(module, self.handler, "users.get.v1", get_user);
        method!(module, self.handler, "users.update.v1", update_user);
        method!(module, self.handler, "users.set_active.v1", set_user_active);
        method!(module, self.handler, "users.reset_password.v1", reset_password);

        method!(module, self.handler, "locations.create.v1", create_location);
        method!(module, self.handler, "locations.list.v1", list_locations);
        method!(module, self.handler, "locations.get.v1", get_location);
        method!(module, self.handler, "locations.path.v1", location_path);
        method!(module, self.handler, "locations.rename.v1", rename_location);
        method!(module, self.handler, "locations.delete.v1", delete_location);

        method!(module, self.handler, "applications.submit.v1", submit_application);
        method!(module, self.handler, "applications.get.v1", get_application);
        method!(module, self.handler, "applications.list.v1", list_applications);
        method!(module, self.handler, "applications.review.v1", review_application);
        method!(module, self.handler, "applications.withdraw.v1", withdraw_application);

        method!(module, self.handler, "payments.record.v1", record_payment);
        method!(module, self.handler, "payments.list.v1", list_payments);
        method!(module, self.handler, "payments.summary.v1", payment_summary);

        method!(module, self.handler, "dashboard.summary.v1", dashboard);
        method!(module, self.handler, "reports.applications.v1", export_applications);
        method!(module, self.handler, "reports.payments.v1", export_payments);

        method!(module, self.handler, "admin.stats.v1", stats);
        method!(module, self.handler, "admin.maintenance.v1", maintenance);

        Ok(module)
    }

    /// Start the JSON-RPC server; port 0 picks a free port
    pub async fn start(self) -> Result<(ServerHandle, SocketAddr), ServerError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        info!(
            host = %self.config.host,
            port = self.config.port,
            "Starting JSON-RPC server"
        );

        let module = self.module()?;
        let bind_error = |source| ServerError::Bind {
            addr: addr.clone(),
            source,
        };
        let server = Server::builder().build(&addr).await.map_err(bind_error)?;
        let local_addr = server.local_addr().map_err(bind_error)?;

        let handle = server.start(module);
        info!(addr = %local_addr, "JSON-RPC server started successfully");
        Ok((handle, local_addr))
    }
}
