// Location Hierarchy Use Cases

use crate::application::access::Principal;
use crate::application::ServiceContext;
use crate::domain::location::validate_parent;
use crate::domain::{Location, LocationId, LocationLevel, Role};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Request to add a node to the hierarchy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLocation {
    pub name: String,
    pub level: LocationLevel,
    #[serde(default)]
    pub parent_id: Option<LocationId>,
    #[serde(default)]
    pub code: Option<String>,
}

pub struct LocationService {
    ctx: ServiceContext,
}

impl LocationService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Admin: add a State, or a child under a parent of the level directly above
    pub async fn create(&self, principal: &Principal, new: NewLocation) -> Result<Location> {
        principal.require_role(&[Role::Admin])?;

        if let Some(parent_id) = &new.parent_id {
            let parent = self.load(parent_id).await?;
            validate_parent(new.level, &parent)?;
        }

        let location = Location::new(
            self.ctx.id_provider.generate_id(),
            self.ctx.time_provider.now_millis(),
            &new.name,
            new.level,
            new.parent_id,
            new.code,
        )?;
        self.ensure_name_free(&location).await?;
        self.ctx.locations.insert(&location).await?;

        info!(
            location_id = %location.id,
            level = %location.level,
            name = %location.name,
            "Location created"
        );
        Ok(location)
    }

    pub async fn list(
        &self,
        parent_id: Option<&LocationId>,
        level: Option<LocationLevel>,
    ) -> Result<Vec<Location>> {
        self.ctx.locations.list(parent_id, level).await
    }

    pub async fn get(&self, id: &LocationId) -> Result<Location> {
        self.load(id).await
    }

    /// Ancestors from the State down to `id`
    pub async fn path(&self, id: &LocationId) -> Result<Vec<Location>> {
        let path = self.ctx.locations.path(id).await?;
        if path.is_empty() {
            return Err(AppError::not_found("Location", id));
        }
        Ok(path)
    }

    pub async fn rename(&self, principal: &Principal, id: &LocationId, name: &str) -> Result<Location> {
        principal.require_role(&[Role::Admin])?;
        let mut location = self.load(id).await?;
        location.rename(name)?;
        self.ensure_name_free(&location).await?;
        self.ctx.locations.update(&location).await?;

        info!(location_id = %location.id, name = %location.name, "Location renamed");
        Ok(location)
    }

    /// Admin: remove a leaf nobody refers to
    pub async fn delete(&self, principal: &Principal, id: &LocationId) -> Result<()> {
        principal.require_role(&[Role::Admin])?;
        let location = self.load(id).await?;

        let usage = self.ctx.locations.usage(id).await?;
        if !usage.is_unused() {
            return Err(AppError::Conflict(format!(
                "{} is still in use ({} children, {} users, {} applications)",
                location.name, usage.children, usage.users, usage.applications
            )));
        }

        self.ctx.locations.delete(id).await?;
        info!(location_id = %id, name = %location.name, "Location deleted");
        Ok(())
    }

    async fn ensure_name_free(&self, location: &Location) -> Result<()> {
        let sibling = self
            .ctx
            .locations
            .find_child_by_name(location.parent_id.as_ref(), &location.name)
            .await?;
        match sibling {
            Some(existing) if existing.id != location.id => Err(AppError::Conflict(format!(
                "A location named '{}' already exists here",
                location.name
            ))),
            _ => Ok(()),
        }
    }

    async fn load(&self, id: &LocationId) -> Result<Location> {
        self.ctx
            .locations
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Location", id))
    }
}
