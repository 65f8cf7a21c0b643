// Location Repository Port (Interface)

use crate::domain::{Location, LocationId, LocationLevel};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// References that block deletion of a location
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocationUsage {
    pub children: i64,
    pub users: i64,
    pub applications: i64,
}

impl LocationUsage {
    pub fn is_unused(&self) -> bool {
        self.children == 0 && self.users == 0 && self.applications == 0
    }
}

/// Repository interface for the location hierarchy
#[async_trait]
pub trait LocationRepository: Send + Sync {
    async fn insert(&self, location: &Location) -> Result<()>;

    async fn update(&self, location: &Location) -> Result<()>;

    async fn delete(&self, id: &LocationId) -> Result<()>;

    async fn find_by_id(&self, id: &LocationId) -> Result<Option<Location>>;

    /// Sibling lookup, case-insensitive on name
    async fn find_child_by_name(
        &self,
        parent_id: Option<&LocationId>,
        name: &str,
    ) -> Result<Option<Location>>;

    /// List ordered by name
    async fn list(
        &self,
        parent_id: Option<&LocationId>,
        level: Option<LocationLevel>,
    ) -> Result<Vec<Location>>;

    /// Ancestor chain from the root State down to `id` (inclusive)
    async fn path(&self, id: &LocationId) -> Result<Vec<Location>>;

    /// IDs of every village at or below `id`
    async fn village_ids_under(&self, id: &LocationId) -> Result<Vec<LocationId>>;

    async fn usage(&self, id: &LocationId) -> Result<LocationUsage>;

    async fn count_by_level(&self) -> Result<BTreeMap<LocationLevel, i64>>;
}
