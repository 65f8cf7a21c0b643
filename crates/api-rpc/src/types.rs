//! RPC Request/Response Types
//!
//! Method parameters and results. Requests are JSON objects; every method
//! except `auth.login.v1` has a `token` field next to its own fields.

use kissan_core::domain::{
    LocationId, LocationLevel, ReviewInput, Role, User, UserId, UserUpdate,
};
use kissan_core::port::{MaintenanceStats, UserFilter};
use serde::{Deserialize, Serialize};

/// Session token plus method params, flattened into one object
#[derive(Debug, Deserialize)]
pub struct Authed<T> {
    pub token: String,
    #[serde(flatten)]
    pub params: T,
}

/// Methods whose only parameter is the token
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

/// Lookup by id (users, locations, applications)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdRequest {
    pub id: String,
}

/// auth.login.v1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Email or 10-digit mobile
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: i64,
    pub must_change_password: bool,
    pub user: User,
}

/// auth.change_password.v1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// users.list.v1
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListUsersRequest {
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub location_id: Option<LocationId>,
    #[serde(default)]
    pub active: Option<bool>,
}

impl From<ListUsersRequest> for UserFilter {
    fn from(req: ListUsersRequest) -> Self {
        UserFilter {
            role: req.role,
            location_id: req.location_id,
            active: req.active,
        }
    }
}

/// users.update.v1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub id: UserId,
    #[serde(flatten)]
    pub update: UserUpdate,
}

/// users.set_active.v1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetActiveRequest {
    pub id: UserId,
    pub active: bool,
}

/// locations.list.v1
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListLocationsRequest {
    #[serde(default)]
    pub parent_id: Option<LocationId>,
    #[serde(default)]
    pub level: Option<LocationLevel>,
}

/// locations.rename.v1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameLocationRequest {
    pub id: LocationId,
    pub name: String,
}

/// applications.review.v1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub id: String,
    #[serde(flatten)]
    pub input: ReviewInput,
}

/// payments.list.v1 / payments.summary.v1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationPaymentsRequest {
    pub application_id: String,
}

/// admin.stats.v1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: MaintenanceStats,
    pub uptime_seconds: i64,
}

/// admin.maintenance.v1 - Run manual maintenance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaintenanceRequest {
    #[serde(default)]
    pub force_vacuum: bool,
}
