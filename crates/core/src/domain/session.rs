// Session Domain Model

use crate::domain::user::UserId;
use serde::{Deserialize, Serialize};

/// Login session, addressed by an opaque bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_id: UserId,
    pub created_at: i64, // epoch ms
    pub expires_at: i64,
}

impl Session {
    pub fn new(token: impl Into<String>, user_id: impl Into<String>, now_millis: i64, ttl_ms: i64) -> Self {
        Self {
            token: token.into(),
            user_id: user_id.into(),
            created_at: now_millis,
            expires_at: now_millis + ttl_ms,
        }
    }

    pub fn is_expired(&self, now_millis: i64) -> bool {
        now_millis >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_expiry_boundary() {
        let session = Session::new("tok", "user", 1_000, 500);
        assert_eq!(session.expires_at, 1_500);
        assert!(!session.is_expired(1_499));
        assert!(session.is_expired(1_500));
    }
}
