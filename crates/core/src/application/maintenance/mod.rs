// Maintenance Service
// Periodic session purge and VACUUM, plus manual runs for administrators

use crate::application::access::Principal;
use crate::domain::Role;
use crate::error::Result;
use crate::port::{Maintenance, MaintenanceConfig, MaintenanceReport, MaintenanceStats};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info};

/// Maintenance scheduler
///
/// Runs periodic maintenance operations in the background and serves the
/// Admin-only stats and manual-run requests.
#[derive(Clone)]
pub struct MaintenanceScheduler {
    maintenance: Arc<dyn Maintenance>,
    config: MaintenanceConfig,
    interval_hours: u64,
}

impl MaintenanceScheduler {
    /// Create a new maintenance scheduler
    ///
    /// # Arguments
    /// * `maintenance` - Maintenance implementation
    /// * `config` - Maintenance configuration
    /// * `interval_hours` - How often to run maintenance (hours, minimum 1)
    pub fn new(
        maintenance: Arc<dyn Maintenance>,
        config: MaintenanceConfig,
        interval_hours: u64,
    ) -> Self {
        Self {
            maintenance,
            config,
            interval_hours: interval_hours.max(1),
        }
    }

    /// Run maintenance loop (background task)
    ///
    /// Should be spawned in tokio::spawn. The first tick fires immediately.
    pub async fn run(self) {
        info!(
            interval_hours = self.interval_hours,
            max_db_size_mb = self.config.max_db_size_mb,
            "Maintenance scheduler started"
        );

        let mut tick = interval(Duration::from_secs(self.interval_hours * 3600));

        loop {
            tick.tick().await;

            info!("Running scheduled maintenance...");

            match self.maintenance.run_full_maintenance(&self.config, false).await {
                Ok(report) => {
                    info!(
                        sessions_purged = report.sessions_purged,
                        vacuum_run = report.vacuum_run,
                        db_size_mb = report.stats_after.db_size_mb,
                        "Scheduled maintenance completed successfully"
                    );
                }
                Err(e) => {
                    error!(error = ?e, "Scheduled maintenance failed");
                }
            }
        }
    }

    /// Admin: run maintenance immediately
    pub async fn run_now(&self, principal: &Principal, force_vacuum: bool) -> Result<MaintenanceReport> {
        principal.require_role(&[Role::Admin])?;
        info!(requested_by = %principal.user_id, force_vacuum, "Running manual maintenance...");

        let report = self
            .maintenance
            .run_full_maintenance(&self.config, force_vacuum)
            .await?;

        info!(
            sessions_purged = report.sessions_purged,
            reclaimed_mb = report.reclaimed_mb,
            "Manual maintenance completed"
        );
        Ok(report)
    }

    /// Admin: current database statistics
    pub async fn stats(&self, principal: &Principal) -> Result<MaintenanceStats> {
        principal.require_role(&[Role::Admin])?;
        self.maintenance.get_stats().await
    }
}
