// SQLite SequenceRepository Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use kissan_core::error::Result;
use kissan_core::port::SequenceRepository;
use sqlx::SqlitePool;

pub struct SqliteSequenceRepository {
    pool: SqlitePool,
}

impl SqliteSequenceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SequenceRepository for SqliteSequenceRepository {
    async fn next_value(&self, name: &str) -> Result<i64> {
        // Increment and read back in one statement
        sqlx::query_scalar(
            r#"
            INSERT INTO sequences (name, value) VALUES (?, 1)
            ON CONFLICT(name) DO UPDATE SET value = value + 1
            RETURNING value
            "#,
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }
}
