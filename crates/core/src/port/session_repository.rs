// Session Repository Port (Interface)

use crate::domain::{Session, UserId};
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn insert(&self, session: &Session) -> Result<()>;

    async fn find(&self, token: &str) -> Result<Option<Session>>;

    async fn delete(&self, token: &str) -> Result<()>;

    /// Revoke all sessions of a user, optionally keeping one token
    async fn delete_for_user(&self, user_id: &UserId, keep_token: Option<&str>) -> Result<u64>;

    /// Delete sessions expired at `now_millis`
    async fn purge_expired(&self, now_millis: i64) -> Result<u64>;
}
