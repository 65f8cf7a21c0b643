// Role Domain Model

use crate::domain::location::LocationLevel;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Account role. Drives dashboards, review chains and jurisdiction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Engineer,
    Talati,
    Karkoon,
    Chowkidar,
    Farmer,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Admin,
        Role::Engineer,
        Role::Talati,
        Role::Karkoon,
        Role::Chowkidar,
        Role::Farmer,
    ];

    /// PascalCase name, used in generated passwords and emails
    pub fn label(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Engineer => "Engineer",
            Role::Talati => "Talati",
            Role::Karkoon => "Karkoon",
            Role::Chowkidar => "Chowkidar",
            Role::Farmer => "Farmer",
        }
    }

    /// Location level a user of this role must be attached to.
    ///
    /// Admin is global and has no location.
    pub fn jurisdiction_level(&self) -> Option<LocationLevel> {
        match self {
            Role::Admin => None,
            Role::Engineer => Some(LocationLevel::District),
            Role::Karkoon => Some(LocationLevel::Subdistrict),
            Role::Talati | Role::Chowkidar | Role::Farmer => Some(LocationLevel::Village),
        }
    }

    pub fn is_staff(&self) -> bool {
        !matches!(self, Role::Farmer)
    }

    pub fn is_reviewer(&self) -> bool {
        matches!(
            self,
            Role::Engineer | Role::Talati | Role::Karkoon | Role::Chowkidar
        )
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "ADMIN"),
            Role::Engineer => write!(f, "ENGINEER"),
            Role::Talati => write!(f, "TALATI"),
            Role::Karkoon => write!(f, "KARKOON"),
            Role::Chowkidar => write!(f, "CHOWKIDAR"),
            Role::Farmer => write!(f, "FARMER"),
        }
    }
}

impl FromStr for Role {
    type Err = crate::domain::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "ENGINEER" => Ok(Role::Engineer),
            "TALATI" => Ok(Role::Talati),
            "KARKOON" => Ok(Role::Karkoon),
            "CHOWKIDAR" => Ok(Role::Chowkidar),
            "FARMER" => Ok(Role::Farmer),
            other => Err(crate::domain::DomainError::ValidationError(format!(
                "Unknown role: {}",
                other
            ))),
        }
    }
}
