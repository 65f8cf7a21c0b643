// DB Maintenance port
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Database maintenance statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceStats {
    pub db_size_mb: f64,
    pub db_size_bytes: i64,
    pub user_count: i64,
    pub application_count: i64,
    pub payment_count: i64,
    pub session_count: i64,
    pub fragmentation_percent: f64,
}

/// Maintenance configuration
#[derive(Debug, Clone)]
pub struct MaintenanceConfig {
    /// Maximum DB size before forcing VACUUM (MB)
    pub max_db_size_mb: f64,

    /// Free-page share above which VACUUM runs anyway (percent)
    pub max_fragmentation_percent: f64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            max_db_size_mb: 500.0,
            max_fragmentation_percent: 10.0,
        }
    }
}

/// Result of one maintenance pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceReport {
    pub sessions_purged: u64,
    pub vacuum_run: bool,
    pub reclaimed_mb: f64,
    pub stats_before: MaintenanceStats,
    pub stats_after: MaintenanceStats,
}

/// Database maintenance operations
#[async_trait]
pub trait Maintenance: Send + Sync {
    /// Run VACUUM to reclaim space and optimize DB
    ///
    /// # Returns
    /// Space reclaimed in MB
    async fn vacuum(&self) -> Result<f64>;

    /// Delete sessions that expired before now
    ///
    /// # Returns
    /// Number of sessions deleted
    async fn purge_expired_sessions(&self) -> Result<u64>;

    /// Get maintenance statistics
    async fn get_stats(&self) -> Result<MaintenanceStats>;

    /// Run full maintenance (session purge + VACUUM when needed)
    async fn run_full_maintenance(
        &self,
        config: &MaintenanceConfig,
        force_vacuum: bool,
    ) -> Result<MaintenanceReport> {
        let stats_before = self.get_stats().await?;

        let sessions_purged = self.purge_expired_sessions().await?;

        let vacuum_run = force_vacuum
            || stats_before.db_size_mb > config.max_db_size_mb
            || stats_before.fragmentation_percent > config.max_fragmentation_percent;
        let reclaimed_mb = if vacuum_run { self.vacuum().await? } else { 0.0 };

        let stats_after = self.get_stats().await?;

        tracing::info!(
            sessions_purged = sessions_purged,
            vacuum_run = vacuum_run,
            reclaimed_mb = reclaimed_mb,
            db_size_mb = stats_after.db_size_mb,
            "Maintenance completed"
        );

        Ok(MaintenanceReport {
            sessions_purged,
            vacuum_run,
            reclaimed_mb,
            stats_before,
            stats_after,
        })
    }
}
