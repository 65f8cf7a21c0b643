// User Domain Model

use crate::domain::credential::PasswordHash;
use crate::domain::error::{DomainError, Result};
use crate::domain::location::{Location, LocationId};
use crate::domain::role::Role;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

pub type UserId = String;

const MIN_AGE_YEARS: i32 = 18;
const MAX_NAME_LEN: usize = 120;

/// User Entity
///
/// `password_hash` is never serialized; API types expose users through
/// this struct directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
    pub mobile: String,
    pub role: Role,
    pub date_of_birth: NaiveDate,
    pub location_id: Option<LocationId>,

    #[serde(skip)]
    pub password_hash: String,
    pub must_change_password: bool,
    pub active: bool,

    pub created_at: i64, // epoch ms
    pub updated_at: i64,
}

/// Input for account creation, before validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub mobile: String,
    pub role: Role,
    pub date_of_birth: NaiveDate,
    #[serde(default)]
    pub location_id: Option<LocationId>,
}

/// Partial profile update (Admin)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub location_id: Option<LocationId>,
}

impl NewUser {
    /// Validate and normalize fields.
    ///
    /// `location` must be the resolved `location_id` (None for Admin).
    /// `today` is injected so age checks are deterministic.
    pub fn validate(&mut self, location: Option<&Location>, today: NaiveDate) -> Result<()> {
        self.full_name = normalize_name(&self.full_name)?;
        self.email = normalize_email(&self.email)?;
        self.mobile = normalize_mobile(&self.mobile)?;

        if self.date_of_birth >= today {
            return Err(DomainError::ValidationError(
                "Date of birth must be in the past".to_string(),
            ));
        }
        if age_on(self.date_of_birth, today) < MIN_AGE_YEARS {
            return Err(DomainError::ValidationError(format!(
                "Account holder must be at least {} years old",
                MIN_AGE_YEARS
            )));
        }

        check_jurisdiction(self.role, location)
    }
}

impl User {
    /// Build a user from a validated `NewUser`
    pub fn from_new(
        id: impl Into<String>,
        now_millis: i64,
        new: NewUser,
        password_hash: PasswordHash,
    ) -> Self {
        Self {
            id: id.into(),
            full_name: new.full_name,
            email: new.email,
            mobile: new.mobile,
            role: new.role,
            date_of_birth: new.date_of_birth,
            location_id: new.location_id,
            password_hash: password_hash.as_str().to_string(),
            must_change_password: true,
            active: true,
            created_at: now_millis,
            updated_at: now_millis,
        }
    }

    pub fn password(&self) -> PasswordHash {
        PasswordHash::from_encoded(self.password_hash.clone())
    }

    /// Replace the password hash. `temporary` marks generated passwords.
    pub fn set_password(&mut self, hash: PasswordHash, temporary: bool, now_millis: i64) {
        self.password_hash = hash.as_str().to_string();
        self.must_change_password = temporary;
        self.updated_at = now_millis;
    }

    /// Apply a profile update. `location` is the resolved new location, if any.
    pub fn apply_update(
        &mut self,
        update: UserUpdate,
        location: Option<&Location>,
        now_millis: i64,
    ) -> Result<()> {
        if let Some(name) = update.full_name {
            self.full_name = normalize_name(&name)?;
        }
        if let Some(email) = update.email {
            self.email = normalize_email(&email)?;
        }
        if let Some(mobile) = update.mobile {
            self.mobile = normalize_mobile(&mobile)?;
        }
        if let Some(location_id) = update.location_id {
            check_jurisdiction(self.role, location)?;
            self.location_id = Some(location_id);
        }
        self.updated_at = now_millis;
        Ok(())
    }
}

fn check_jurisdiction(role: Role, location: Option<&Location>) -> Result<()> {
    match (role.jurisdiction_level(), location) {
        (None, None) => Ok(()),
        (None, Some(_)) => Err(DomainError::ValidationError(format!(
            "{} accounts are not attached to a location",
            role.label()
        ))),
        (Some(expected), Some(loc)) if loc.level == expected => Ok(()),
        (Some(expected), _) => Err(DomainError::JurisdictionMismatch {
            role: role.to_string(),
            expected: expected.to_string(),
        }),
    }
}

/// Whole years between `dob` and `today`
pub fn age_on(dob: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        age -= 1;
    }
    age
}

fn normalize_name(name: &str) -> Result<String> {
    let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.is_empty() {
        return Err(DomainError::ValidationError(
            "Full name cannot be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::ValidationError("Full name too long".to_string()));
    }
    Ok(name)
}

pub fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_ascii_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .map(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
                    .unwrap_or(false)
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };

    if !valid {
        return Err(DomainError::ValidationError(format!(
            "Invalid email address: {}",
            email
        )));
    }
    Ok(email)
}

/// Indian mobile numbers: 10 digits starting with 6-9.
/// A leading `+91` or `0` is stripped.
pub fn normalize_mobile(mobile: &str) -> Result<String> {
    let digits: String = mobile.chars().filter(|c| !c.is_whitespace() && *c != '-').collect();
    let digits = digits
        .strip_prefix("+91")
        .or_else(|| digits.strip_prefix('0'))
        .unwrap_or(&digits);

    let valid = digits.len() == 10
        && digits.chars().all(|c| c.is_ascii_digit())
        && matches!(digits.chars().next(), Some('6'..='9'));

    if !valid {
        return Err(DomainError::ValidationError(format!(
            "Invalid mobile number: {}",
            mobile
        )));
    }
    Ok(digits.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::location::LocationLevel;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn village() -> Location {
        Location::new(
            "v1",
            0,
            "Shirpur",
            LocationLevel::Village,
            Some("t1".into()),
            None,
        )
        .unwrap()
    }

    fn new_farmer() -> NewUser {
        NewUser {
            full_name: "  Ramesh   Patil ".to_string(),
            email: "Ramesh.Patil@Example.IN".to_string(),
            mobile: "+91 98765 43210".to_string(),
            role: Role::Farmer,
            date_of_birth: NaiveDate::from_ymd_opt(1980, 1, 15).unwrap(),
            location_id: Some("v1".to_string()),
        }
    }

    #[test]
    fn test_validate_normalizes_fields() {
        let mut user = new_farmer();
        user.validate(Some(&village()), today()).unwrap();

        assert_eq!(user.full_name, "Ramesh Patil");
        assert_eq!(user.email, "ramesh.patil@example.in");
        assert_eq!(user.mobile, "9876543210");
    }

    #[test]
    fn test_validate_rejects_minor() {
        let mut user = new_farmer();
        user.date_of_birth = NaiveDate::from_ymd_opt(2008, 6, 2).unwrap();
        let err = user.validate(Some(&village()), today()).unwrap_err();
        assert!(err.to_string().contains("at least 18"));
    }

    #[test]
    fn test_validate_rejects_wrong_location_level() {
        let mut user = new_farmer();
        user.role = Role::Engineer;
        let err = user.validate(Some(&village()), today()).unwrap_err();
        assert_eq!(
            err,
            DomainError::JurisdictionMismatch {
                role: "ENGINEER".into(),
                expected: "DISTRICT".into()
            }
        );
    }

    #[test]
    fn test_admin_has_no_location() {
        let mut user = new_farmer();
        user.role = Role::Admin;
        assert!(user.validate(Some(&village()), today()).is_err());

        let mut user = new_farmer();
        user.role = Role::Admin;
        user.location_id = None;
        assert!(user.validate(None, today()).is_ok());
    }

    #[test]
    fn test_email_and_mobile_rules() {
        assert!(normalize_email("a@b.co").is_ok());
        assert!(normalize_email("no-at-sign.com").is_err());
        assert!(normalize_email("a@nodot").is_err());
        assert!(normalize_email("a@@b.com").is_err());

        assert_eq!(normalize_mobile("09876543210").unwrap(), "9876543210");
        assert!(normalize_mobile("1234567890").is_err());
        assert!(normalize_mobile("98765").is_err());
    }

    #[test]
    fn test_age_on_birthday_boundary() {
        let dob = NaiveDate::from_ymd_opt(2000, 6, 1).unwrap();
        assert_eq!(age_on(dob, today()), 25);
        let dob = NaiveDate::from_ymd_opt(2000, 6, 2).unwrap();
        assert_eq!(age_on(dob, today()), 24);
    }
}
