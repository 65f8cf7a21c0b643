// SQLite Maintenance Implementation
use crate::error::map_sqlx_error;
use async_trait::async_trait;
use kissan_core::error::{AppError, Result};
use kissan_core::port::{Maintenance, MaintenanceStats, TimeProvider};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;

/// SQLite maintenance implementation
pub struct SqliteMaintenance {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteMaintenance {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }

    /// Get DB size in bytes and free-page share in percent
    async fn get_db_size(&self) -> Result<(i64, f64)> {
        // Query database page count and page size
        let page_count: i64 = sqlx::query_scalar("PRAGMA page_count")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to get page count: {}", e)))?;

        let page_size: i64 = sqlx::query_scalar("PRAGMA page_size")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to get page size: {}", e)))?;

        let free_pages: i64 = sqlx::query_scalar("PRAGMA freelist_count")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to get freelist count: {}", e)))?;

        let fragmentation = if page_count > 0 {
            free_pages as f64 / page_count as f64 * 100.0
        } else {
            0.0
        };

        Ok((page_count * page_size, fragmentation))
    }

    async fn count(&self, table: &str) -> Result<i64> {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }
}

fn to_mb(bytes: i64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

#[async_trait]
impl Maintenance for SqliteMaintenance {
    async fn vacuum(&self) -> Result<f64> {
        info!("Running VACUUM to optimize database...");

        // Get size before VACUUM
        let (size_before, _) = self.get_db_size().await?;

        // Run VACUUM (reclaims space and defragments)
        sqlx::query("VACUUM")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("VACUUM failed: {}", e)))?;

        // Get size after VACUUM
        let (size_after, _) = self.get_db_size().await?;
        let reclaimed = to_mb((size_before - size_after).max(0));

        info!(
            size_before_mb = to_mb(size_before),
            size_after_mb = to_mb(size_after),
            reclaimed_mb = reclaimed,
            "VACUUM completed"
        );

        Ok(reclaimed)
    }

    async fn purge_expired_sessions(&self) -> Result<u64> {
        let now = self.time_provider.now_millis();

        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let deleted = result.rows_affected();
        info!(deleted_sessions = deleted, "Expired session purge completed");

        Ok(deleted)
    }

    async fn get_stats(&self) -> Result<MaintenanceStats> {
        let (db_size_bytes, fragmentation_percent) = self.get_db_size().await?;

        Ok(MaintenanceStats {
            db_size_mb: to_mb(db_size_bytes),
            db_size_bytes,
            user_count: self.count("users").await?,
            application_count: self.count("applications").await?,
            payment_count: self.count("payments").await?,
            session_count: self.count("sessions").await?,
            fragmentation_percent,
        })
    }
}
