// User Repository Port (Interface)

use crate::domain::{LocationId, Role, User, UserId};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Filter for user listings
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub location_id: Option<LocationId>,
    pub active: Option<bool>,
}

/// Repository interface for User persistence
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user. Duplicate email or mobile is a Conflict.
    async fn insert(&self, user: &User) -> Result<()>;

    /// Overwrite mutable profile, password and status fields
    async fn update(&self, user: &User) -> Result<()>;

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>>;

    /// Find by login identifier (email or mobile)
    async fn find_by_login(&self, identifier: &str) -> Result<Option<User>>;

    /// List users ordered by full name
    async fn list(&self, filter: &UserFilter) -> Result<Vec<User>>;

    async fn count(&self) -> Result<i64>;

    async fn count_by_role(&self) -> Result<BTreeMap<Role, i64>>;
}
