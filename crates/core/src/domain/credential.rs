// Credentials: generated passwords and salted password hashes

use crate::domain::error::{DomainError, Result};
use crate::domain::role::Role;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::NaiveDate;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
pub const DEFAULT_ITERATIONS: u32 = 10_000;
pub const MIN_PASSWORD_LEN: usize = 8;

/// Initial password handed out for new and reset accounts.
///
/// Format is `{Role}@{DDMMYYYY}`, e.g. `Talati@05031988`. The holder must
/// change it on first login.
pub fn initial_password(role: Role, date_of_birth: NaiveDate) -> String {
    format!("{}@{}", role.label(), date_of_birth.format("%d%m%Y"))
}

/// Password policy for user-chosen passwords
pub fn validate_new_password(current: &str, new: &str) -> Result<()> {
    if new.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::ValidationError(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if !new.chars().any(|c| c.is_alphabetic()) || !new.chars().any(|c| c.is_ascii_digit()) {
        return Err(DomainError::ValidationError(
            "Password must contain a letter and a digit".to_string(),
        ));
    }
    if new == current {
        return Err(DomainError::ValidationError(
            "New password must differ from the current one".to_string(),
        ));
    }
    Ok(())
}

/// Encoded password hash: `pbkdf2-sha256$<iterations>$<salt b64>$<digest b64>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn generate(password: &str) -> Result<Self> {
        Self::generate_with_iterations(password, DEFAULT_ITERATIONS)
    }

    pub fn generate_with_iterations(password: &str, iterations: u32) -> Result<Self> {
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        let digest = derive(&salt, password, iterations).ok_or_else(|| {
            DomainError::ValidationError("Password cannot be used as a key".to_string())
        })?;

        Ok(Self(format!(
            "{}${}${}${}",
            SCHEME,
            iterations,
            STANDARD.encode(salt),
            STANDARD.encode(digest)
        )))
    }

    /// Wrap a stored hash (no validation until `verify`)
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Constant-time verification. Malformed hashes never verify.
    pub fn verify(&self, password: &str) -> bool {
        let mut parts = self.0.split('$');
        let (Some(scheme), Some(iterations), Some(salt), Some(expected), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return false;
        };

        if scheme != SCHEME {
            return false;
        }
        let Ok(iterations) = iterations.parse::<u32>() else {
            return false;
        };
        let (Ok(salt), Ok(expected)) = (STANDARD.decode(salt), STANDARD.decode(expected)) else {
            return false;
        };

        let Some(actual) = derive(&salt, password, iterations) else {
            return false;
        };
        actual.as_slice().ct_eq(&expected).into()
    }
}

/// PBKDF2-HMAC-SHA256, one 32-byte block
fn derive(salt: &[u8], password: &str, iterations: u32) -> Option<[u8; 32]> {
    let prf = HmacSha256::new_from_slice(password.as_bytes()).ok()?;

    let mut mac = prf.clone();
    mac.update(salt);
    mac.update(&1u32.to_be_bytes());
    let mut block: [u8; 32] = mac.finalize().into_bytes().into();
    let mut output = block;

    for _ in 1..iterations.max(1) {
        let mut mac = prf.clone();
        mac.update(&block);
        block = mac.finalize().into_bytes().into();
        for (out, b) in output.iter_mut().zip(block.iter()) {
            *out ^= b;
        }
    }
    Some(output)
}
