// Kissan Plus Infrastructure - SQLite Adapter
// Implements every repository port plus Maintenance

mod application_repository;
mod connection;
mod error;
mod location_repository;
mod maintenance_impl;
mod migration;
mod payment_repository;
mod scope;
mod sequence_repository;
mod session_repository;
mod user_repository;

pub use application_repository::SqliteApplicationRepository;
pub use connection::{create_pool, database_url};
pub use location_repository::SqliteLocationRepository;
pub use maintenance_impl::SqliteMaintenance;
pub use migration::run_migrations;
pub use payment_repository::SqlitePaymentRepository;
pub use sequence_repository::SqliteSequenceRepository;
pub use session_repository::SqliteSessionRepository;
pub use user_repository::SqliteUserRepository;

// Note: sqlx::Error conversion is handled by wrapping in helper functions
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)

#[cfg(test)]
mod test_support {
    use crate::{create_pool, run_migrations};
    use sqlx::SqlitePool;

    pub async fn setup_pool() -> SqlitePool {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    pub async fn seed_village(pool: &SqlitePool, id: &str) {
        sqlx::query(
            "INSERT INTO locations (id, name, level, parent_id, code, created_at) \
             VALUES (?, ?, 'VILLAGE', NULL, NULL, 0)",
        )
        .bind(id)
        .bind(id)
        .execute(pool)
        .await
        .unwrap();
    }

    pub async fn seed_farmer(pool: &SqlitePool, id: &str, village_id: &str) {
        sqlx::query(
            "INSERT INTO users (id, full_name, email, mobile, role, date_of_birth, location_id, \
             password_hash, must_change_password, active, created_at, updated_at) \
             VALUES (?, ?, ?, ?, 'FARMER', '1990-01-01', ?, 'x', 0, 1, 0, 0)",
        )
        .bind(id)
        .bind(format!("Farmer {}", id))
        .bind(format!("{}@example.in", id))
        .bind(id)
        .bind(village_id)
        .execute(pool)
        .await
        .unwrap();
    }

    /// Approved Form-12 with a 1000 paise demand
    pub async fn seed_application(pool: &SqlitePool, id: &str, applicant_id: &str, village_id: &str) {
        sqlx::query(
            "INSERT INTO applications (id, reference_no, kind, applicant_id, village_id, \
             survey_number, area_hectares, details, reviews, withdrawn, rate_per_hectare_paise, \
             demand_paise, status, pending_role, version, created_at, updated_at) \
             VALUES (?, ?, 'FORM12', ?, ?, '1', 1.0, '{}', '[]', 0, 1000, 1000, 'APPROVED', \
             NULL, 3, 0, 0)",
        )
        .bind(id)
        .bind(format!("F12/2025/{}", id))
        .bind(applicant_id)
        .bind(village_id)
        .execute(pool)
        .await
        .unwrap();
    }
}
