//! Kissan Plus back-office server - Main Entry Point

mod logging;
mod settings;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use kissan_api_rpc::RpcServer;
use kissan_core::application::{MaintenanceScheduler, ServiceContext, Services};
use kissan_core::port::id_provider::UuidProvider;
use kissan_core::port::time_provider::SystemTimeProvider;
use kissan_core::port::{Notifier, TimeProvider};
use kissan_infra_mail::{LogNotifier, SmtpNotifier};
use kissan_infra_sqlite::{
    create_pool, database_url, run_migrations, SqliteApplicationRepository,
    SqliteLocationRepository, SqliteMaintenance, SqlitePaymentRepository,
    SqliteSequenceRepository, SqliteSessionRepository, SqliteUserRepository,
};
use settings::DaemonConfig;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Configuration and logging
    let config = DaemonConfig::load()?;
    let _log_guard = logging::init(&config.log, config.log_dir().as_deref())?;

    info!("Kissan Plus server v{} starting...", VERSION);

    // 2. Database
    let db_path = config.database_path();
    info!(db_path = %db_path.display(), "Initializing database...");

    let url = database_url(&db_path).context("Invalid database path")?;
    let pool = create_pool(&url).await.context("DB pool creation failed")?;
    run_migrations(&pool).await.context("Migration failed")?;

    // 3. Adapters (DI wiring)
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let notifier: Arc<dyn Notifier> = match &config.smtp {
        Some(smtp) => {
            info!(host = %smtp.host, port = smtp.port, "Email via SMTP relay");
            Arc::new(SmtpNotifier::new(smtp).context("Invalid SMTP configuration")?)
        }
        None => {
            warn!("smtp is not configured; emails will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let ctx = ServiceContext {
        users: Arc::new(SqliteUserRepository::new(pool.clone())),
        locations: Arc::new(SqliteLocationRepository::new(pool.clone())),
        applications: Arc::new(SqliteApplicationRepository::new(pool.clone())),
        payments: Arc::new(SqlitePaymentRepository::new(pool.clone())),
        sessions: Arc::new(SqliteSessionRepository::new(pool.clone())),
        sequences: Arc::new(SqliteSequenceRepository::new(pool.clone())),
        notifier,
        id_provider: Arc::new(UuidProvider),
        time_provider: time_provider.clone(),
    };
    let services = Services::new(ctx, config.auth());

    // 4. First administrator on an empty database
    match config.bootstrap_admin.clone() {
        Some(admin) => {
            let created = services
                .users
                .ensure_bootstrap_admin(admin)
                .await
                .context("Bootstrap administrator could not be created")?;
            if let Some(issued) = created {
                info!(
                    user_id = %issued.user.id,
                    email = %issued.user.email,
                    "Bootstrap administrator created; initial password is Admin@<date of birth as DDMMYYYY>"
                );
            }
        }
        None => info!("bootstrap_admin not configured; skipping"),
    }

    // 5. Maintenance + JSON-RPC server
    let maintenance = Arc::new(SqliteMaintenance::new(pool.clone(), time_provider));
    let maintenance_scheduler = MaintenanceScheduler::new(
        maintenance,
        config.maintenance(),
        config.maintenance.interval_hours,
    );

    info!("Starting JSON-RPC server...");
    let rpc_server = RpcServer::new(config.rpc_server(), services, maintenance_scheduler.clone());
    let (rpc_handle, rpc_addr) = rpc_server
        .start()
        .await
        .context("RPC server start failed")?;

    // 6. Periodic maintenance
    info!("Starting maintenance scheduler...");
    let maintenance_handle = tokio::spawn(maintenance_scheduler.run());

    info!(addr = %rpc_addr, "System ready. Press Ctrl+C to shutdown");

    // 7. Wait for shutdown signal
    shutdown_signal().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    // 8. Graceful shutdown
    maintenance_handle.abort();
    if rpc_handle.stop().is_ok() {
        rpc_handle.stopped().await;
    }
    pool.close().await;

    info!("Shutdown complete.");
    Ok(())
}

/// Ctrl+C everywhere, SIGTERM on Unix
async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate =
            signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res.context("Failed to listen for Ctrl+C")?,
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    Ok(())
}
