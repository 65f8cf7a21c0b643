// User Management Use Cases

use crate::application::access::{covers_village, Principal};
use crate::application::notifications::{self, deliver};
use crate::application::ServiceContext;
use crate::domain::credential::{initial_password, PasswordHash};
use crate::domain::{Location, NewUser, Role, User, UserId, UserUpdate};
use crate::error::{AppError, Result};
use crate::port::UserFilter;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

/// A new or reset account together with its generated password
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedCredentials {
    pub user: User,
    pub initial_password: String,
}

/// First administrator, created on an empty database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapAdmin {
    pub full_name: String,
    pub email: String,
    pub mobile: String,
    pub date_of_birth: NaiveDate,
}

pub struct UserService {
    ctx: ServiceContext,
}

impl UserService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Create an account with a password derived from role and date of birth.
    ///
    /// Admin may create any role. A Talati may register Farmers of its own
    /// village (the village defaults to the Talati's).
    pub async fn create(&self, principal: &Principal, mut new: NewUser) -> Result<IssuedCredentials> {
        match principal.role {
            Role::Admin => {}
            Role::Talati if new.role == Role::Farmer => {
                let own_village = principal.location_id.clone();
                match &new.location_id {
                    None => new.location_id = own_village,
                    Some(id) if Some(id) == own_village.as_ref() => {}
                    Some(_) => {
                        return Err(AppError::Forbidden(
                            "Talati may only register farmers of their own village".to_string(),
                        ))
                    }
                }
            }
            _ => {
                return Err(AppError::Forbidden(format!(
                    "{} accounts cannot create {} accounts",
                    principal.role.label(),
                    new.role.label()
                )))
            }
        }

        let created = self.insert_new(new).await?;
        info!(
            user_id = %created.user.id,
            role = %created.user.role,
            created_by = %principal.user_id,
            "User created"
        );
        Ok(created)
    }

    /// Admin: every user matching `filter`. Talati: farmers of its village.
    pub async fn list(&self, principal: &Principal, mut filter: UserFilter) -> Result<Vec<User>> {
        match principal.role {
            Role::Admin => {}
            Role::Talati => {
                filter.role = Some(Role::Farmer);
                filter.location_id = principal.location_id.clone();
            }
            _ => {
                return Err(AppError::Forbidden(
                    "Only Admin and Talati accounts can list users".to_string(),
                ))
            }
        }
        self.ctx.users.list(&filter).await
    }

    /// Admin, the user themself, or staff covering a farmer's village
    pub async fn get(&self, principal: &Principal, id: &UserId) -> Result<User> {
        let user = self.load(id).await?;

        let allowed = principal.is_admin()
            || principal.user_id == user.id
            || match (&user.role, &user.location_id) {
                (Role::Farmer, Some(village)) => covers_village(&self.ctx, principal, village).await?,
                _ => false,
            };

        if !allowed {
            return Err(AppError::Forbidden(format!("Cannot view user {}", id)));
        }
        Ok(user)
    }

    /// Admin: update profile fields. Role is fixed at creation.
    pub async fn update(&self, principal: &Principal, id: &UserId, update: UserUpdate) -> Result<User> {
        principal.require_role(&[Role::Admin])?;
        let mut user = self.load(id).await?;

        let location = match &update.location_id {
            Some(location_id) => Some(self.load_location(location_id).await?),
            None => None,
        };

        let now = self.ctx.time_provider.now_millis();
        user.apply_update(update, location.as_ref(), now)?;
        self.ensure_login_free(&user.email, Some(&user.id)).await?;
        self.ensure_login_free(&user.mobile, Some(&user.id)).await?;
        self.ctx.users.update(&user).await?;

        info!(user_id = %user.id, updated_by = %principal.user_id, "User updated");
        Ok(user)
    }

    /// Admin: activate or deactivate. Deactivation revokes all sessions.
    pub async fn set_active(&self, principal: &Principal, id: &UserId, active: bool) -> Result<User> {
        principal.require_role(&[Role::Admin])?;
        if !active && principal.user_id == *id {
            return Err(AppError::Validation(
                "You cannot deactivate your own account".to_string(),
            ));
        }

        let mut user = self.load(id).await?;
        user.active = active;
        user.updated_at = self.ctx.time_provider.now_millis();
        self.ctx.users.update(&user).await?;

        if !active {
            self.ctx.sessions.delete_for_user(&user.id, None).await?;
        }

        info!(user_id = %user.id, active = active, "User activation changed");
        Ok(user)
    }

    /// Admin: regenerate the role+DOB password and force a change
    pub async fn reset_password(&self, principal: &Principal, id: &UserId) -> Result<IssuedCredentials> {
        principal.require_role(&[Role::Admin])?;
        let mut user = self.load(id).await?;

        let password = initial_password(user.role, user.date_of_birth);
        let now = self.ctx.time_provider.now_millis();
        user.set_password(PasswordHash::generate(&password)?, true, now);
        self.ctx.users.update(&user).await?;
        self.ctx.sessions.delete_for_user(&user.id, None).await?;

        deliver(
            self.ctx.notifier.as_ref(),
            notifications::password_reset(&user, &password),
        )
        .await;

        info!(user_id = %user.id, reset_by = %principal.user_id, "Password reset");
        Ok(IssuedCredentials {
            user,
            initial_password: password,
        })
    }

    /// Create the first Admin when the user table is empty
    pub async fn ensure_bootstrap_admin(&self, admin: BootstrapAdmin) -> Result<Option<IssuedCredentials>> {
        if self.ctx.users.count().await? > 0 {
            return Ok(None);
        }

        let created = self
            .insert_new(NewUser {
                full_name: admin.full_name,
                email: admin.email,
                mobile: admin.mobile,
                role: Role::Admin,
                date_of_birth: admin.date_of_birth,
                location_id: None,
            })
            .await?;

        info!(user_id = %created.user.id, "Bootstrap administrator created");
        Ok(Some(created))
    }

    async fn insert_new(&self, mut new: NewUser) -> Result<IssuedCredentials> {
        let location = match &new.location_id {
            Some(location_id) => Some(self.load_location(location_id).await?),
            None => None,
        };
        new.validate(location.as_ref(), self.ctx.time_provider.today())?;

        self.ensure_login_free(&new.email, None).await?;
        self.ensure_login_free(&new.mobile, None).await?;

        let password = initial_password(new.role, new.date_of_birth);
        let user = User::from_new(
            self.ctx.id_provider.generate_id(),
            self.ctx.time_provider.now_millis(),
            new,
            PasswordHash::generate(&password)?,
        );
        self.ctx.users.insert(&user).await?;

        deliver(
            self.ctx.notifier.as_ref(),
            notifications::account_created(&user, &password),
        )
        .await;

        Ok(IssuedCredentials {
            user,
            initial_password: password,
        })
    }

    async fn ensure_login_free(&self, identifier: &str, owner: Option<&UserId>) -> Result<()> {
        match self.ctx.users.find_by_login(identifier).await? {
            Some(existing) if Some(&existing.id) != owner => Err(AppError::Conflict(format!(
                "{} is already registered",
                identifier
            ))),
            _ => Ok(()),
        }
    }

    async fn load(&self, id: &UserId) -> Result<User> {
        self.ctx
            .users
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("User", id))
    }

    async fn load_location(&self, id: &str) -> Result<Location> {
        self.ctx
            .locations
            .find_by_id(&id.to_string())
            .await?
            .ok_or_else(|| AppError::not_found("Location", id))
    }
}
