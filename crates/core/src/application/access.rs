// Principal and authorization checks
//
// Every use case receives the authenticated Principal and enforces role and
// jurisdiction rules server-side.

use crate::application::ServiceContext;
use crate::domain::location::covers;
use crate::domain::{Application, LocationId, Role, User, UserId};
use crate::error::{AppError, Result};
use crate::port::RecordScope;
use serde::{Deserialize, Serialize};

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub full_name: String,
    pub role: Role,
    pub location_id: Option<LocationId>,
    pub must_change_password: bool,
}

impl Principal {
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
            location_id: user.location_id.clone(),
            must_change_password: user.must_change_password,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_role(&self, allowed: &[Role]) -> Result<()> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "{} accounts cannot perform this action",
                self.role.label()
            )))
        }
    }

    /// Accounts on a generated password may only change it
    pub fn require_password_current(&self) -> Result<()> {
        if self.must_change_password {
            Err(AppError::PasswordChangeRequired)
        } else {
            Ok(())
        }
    }
}

/// Records visible to `principal`: own applications for farmers, the
/// villages under a staff member's location, everything for Admin.
pub async fn record_scope(ctx: &ServiceContext, principal: &Principal) -> Result<RecordScope> {
    match (principal.role, &principal.location_id) {
        (Role::Admin, _) => Ok(RecordScope::All),
        (Role::Farmer, _) => Ok(RecordScope::Applicant(principal.user_id.clone())),
        (_, Some(location_id)) => Ok(RecordScope::Villages(
            ctx.locations.village_ids_under(location_id).await?,
        )),
        (_, None) => Ok(RecordScope::Villages(Vec::new())),
    }
}

/// Whether `principal` has jurisdiction over `village_id`
pub async fn covers_village(
    ctx: &ServiceContext,
    principal: &Principal,
    village_id: &LocationId,
) -> Result<bool> {
    if principal.is_admin() {
        return Ok(true);
    }
    if !principal.role.is_staff() {
        return Ok(false);
    }
    let path = ctx.locations.path(village_id).await?;
    Ok(covers(principal.location_id.as_deref(), &path))
}

/// Applicant, Admin, or staff with jurisdiction
pub async fn ensure_can_view(
    ctx: &ServiceContext,
    principal: &Principal,
    app: &Application,
) -> Result<()> {
    if app.applicant_id == principal.user_id || covers_village(ctx, principal, &app.village_id).await? {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Application {} is outside your jurisdiction",
            app.reference_no
        )))
    }
}
