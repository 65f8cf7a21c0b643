//! SDK Request/Response Types
//!
//! Domain payloads come from `kissan-core`; this module holds the wire
//! shapes that exist only at the RPC boundary.

use kissan_core::domain::{ReviewInput, User};
use serde::{Deserialize, Serialize};

/// Result of `auth.login.v1`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: i64,
    pub must_change_password: bool,
    pub user: User,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub identifier: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChangePasswordRequest<'a> {
    pub current_password: &'a str,
    pub new_password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct IdRequest<'a> {
    pub id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ApplicationPaymentsRequest<'a> {
    pub application_id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ReviewRequest<'a> {
    pub id: &'a str,
    #[serde(flatten)]
    pub input: &'a ReviewInput,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct OkResponse {
    #[allow(dead_code)]
    pub ok: bool,
}
