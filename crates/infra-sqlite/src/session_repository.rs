// SQLite SessionRepository Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use kissan_core::domain::{Session, UserId};
use kissan_core::error::Result;
use kissan_core::port::SessionRepository;
use sqlx::SqlitePool;

pub struct SqliteSessionRepository {
    pool: SqlitePool,
}

impl SqliteSessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for SqliteSessionRepository {
    async fn insert(&self, session: &Session) -> Result<()> {
        sqlx::query(
            "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&session.token)
        .bind(&session.user_id)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find(&self, token: &str) -> Result<Option<Session>> {
        let row: Option<(String, String, i64, i64)> = sqlx::query_as(
            "SELECT token, user_id, created_at, expires_at FROM sessions WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(|(token, user_id, created_at, expires_at)| Session {
            token,
            user_id,
            created_at,
            expires_at,
        }))
    }

    async fn delete(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn delete_for_user(&self, user_id: &UserId, keep_token: Option<&str>) -> Result<u64> {
        // `token IS NOT NULL` holds for every row, so None revokes all sessions
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = ? AND token IS NOT ?")
            .bind(user_id)
            .bind(keep_token)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }

    async fn purge_expired(&self, now_millis: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now_millis)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_farmer, seed_village, setup_pool};

    #[tokio::test]
    async fn test_session_lifecycle() {
        let pool = setup_pool().await;
        seed_village(&pool, "v1").await;
        seed_farmer(&pool, "f1", "v1").await;
        let repo = SqliteSessionRepository::new(pool);

        for (token, expires) in [("t1", 5_000), ("t2", 50_000), ("t3", 50_000)] {
            repo.insert(&Session::new(token, "f1", 0, expires))
                .await
                .unwrap();
        }

        assert_eq!(repo.find("t1").await.unwrap().unwrap().expires_at, 5_000);
        assert_eq!(repo.purge_expired(10_000).await.unwrap(), 1);
        assert!(repo.find("t1").await.unwrap().is_none());

        assert_eq!(
            repo.delete_for_user(&"f1".to_string(), Some("t2"))
                .await
                .unwrap(),
            1
        );
        assert!(repo.find("t2").await.unwrap().is_some());
        assert!(repo.find("t3").await.unwrap().is_none());

        assert_eq!(repo.delete_for_user(&"f1".to_string(), None).await.unwrap(), 1);
    }
}
