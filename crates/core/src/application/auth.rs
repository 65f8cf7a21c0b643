// Authentication Use Cases: login, session lookup, logout, password change

use crate::application::access::Principal;
use crate::application::ServiceContext;
use crate::domain::credential::{validate_new_password, PasswordHash};
use crate::domain::user::normalize_mobile;
use crate::domain::{Session, User};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Session lifetime in milliseconds
    pub session_ttl_ms: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_ms: 12 * 60 * 60 * 1000,
        }
    }
}

/// Successful login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginOutcome {
    pub session: Session,
    pub user: User,
}

pub struct AuthService {
    ctx: ServiceContext,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(ctx: ServiceContext, config: AuthConfig) -> Self {
        Self { ctx, config }
    }

    /// Log in with email or mobile.
    ///
    /// Unknown, inactive and wrong-password logins are indistinguishable.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<LoginOutcome> {
        let identifier = normalize_identifier(identifier);
        let user = self
            .ctx
            .users
            .find_by_login(&identifier)
            .await?
            .filter(|u| u.active)
            .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

        if !user.password().verify(password) {
            warn!(user_id = %user.id, "Failed login attempt");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        let now = self.ctx.time_provider.now_millis();
        let session = Session::new(
            self.ctx.id_provider.generate_token(),
            user.id.clone(),
            now,
            self.config.session_ttl_ms,
        );
        self.ctx.sessions.insert(&session).await?;

        info!(user_id = %user.id, role = %user.role, "User logged in");
        Ok(LoginOutcome { session, user })
    }

    /// Resolve a bearer token to the current principal
    pub async fn authenticate(&self, token: &str) -> Result<Principal> {
        let session = self
            .ctx
            .sessions
            .find(token)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Session not found".to_string()))?;

        let now = self.ctx.time_provider.now_millis();
        if session.is_expired(now) {
            self.ctx.sessions.delete(token).await?;
            return Err(AppError::Unauthorized("Session expired".to_string()));
        }

        let user = self
            .ctx
            .users
            .find_by_id(&session.user_id)
            .await?
            .filter(|u| u.active)
            .ok_or_else(|| AppError::Unauthorized("Account is not active".to_string()))?;

        Ok(Principal::from_user(&user))
    }

    pub async fn logout(&self, token: &str) -> Result<()> {
        self.ctx.sessions.delete(token).await
    }

    pub async fn me(&self, principal: &Principal) -> Result<User> {
        self.ctx
            .users
            .find_by_id(&principal.user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User", &principal.user_id))
    }

    /// Change own password; other sessions of the user are revoked
    pub async fn change_password(
        &self,
        principal: &Principal,
        token: &str,
        current: &str,
        new: &str,
    ) -> Result<()> {
        let mut user = self.me(principal).await?;

        if !user.password().verify(current) {
            return Err(AppError::Unauthorized(
                "Current password is incorrect".to_string(),
            ));
        }
        validate_new_password(current, new)?;

        let now = self.ctx.time_provider.now_millis();
        user.set_password(PasswordHash::generate(new)?, false, now);
        self.ctx.users.update(&user).await?;

        let revoked = self
            .ctx
            .sessions
            .delete_for_user(&user.id, Some(token))
            .await?;

        info!(user_id = %user.id, revoked_sessions = revoked, "Password changed");
        Ok(())
    }
}

/// Emails are matched lowercased, mobiles in their 10-digit form
pub fn normalize_identifier(identifier: &str) -> String {
    let identifier = identifier.trim();
    if identifier.contains('@') {
        identifier.to_ascii_lowercase()
    } else {
        normalize_mobile(identifier).unwrap_or_else(|_| identifier.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_identifier() {
        assert_eq!(normalize_identifier(" Admin@Kissan.IN "), "admin@kissan.in");
        assert_eq!(normalize_identifier("+91 98765-43210"), "9876543210");
        assert_eq!(normalize_identifier("unknown"), "unknown");
    }
}
