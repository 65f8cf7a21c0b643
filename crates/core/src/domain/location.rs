// Location Domain Model (State > District > Subdistrict > Village)

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub type LocationId = String;

const MAX_NAME_LEN: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationLevel {
    State,
    District,
    Subdistrict,
    Village,
}

impl LocationLevel {
    pub const ALL: [LocationLevel; 4] = [
        LocationLevel::State,
        LocationLevel::District,
        LocationLevel::Subdistrict,
        LocationLevel::Village,
    ];

    pub fn parent_level(&self) -> Option<LocationLevel> {
        match self {
            LocationLevel::State => None,
            LocationLevel::District => Some(LocationLevel::State),
            LocationLevel::Subdistrict => Some(LocationLevel::District),
            LocationLevel::Village => Some(LocationLevel::Subdistrict),
        }
    }

    pub fn child_level(&self) -> Option<LocationLevel> {
        match self {
            LocationLevel::State => Some(LocationLevel::District),
            LocationLevel::District => Some(LocationLevel::Subdistrict),
            LocationLevel::Subdistrict => Some(LocationLevel::Village),
            LocationLevel::Village => None,
        }
    }
}

impl std::fmt::Display for LocationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocationLevel::State => write!(f, "STATE"),
            LocationLevel::District => write!(f, "DISTRICT"),
            LocationLevel::Subdistrict => write!(f, "SUBDISTRICT"),
            LocationLevel::Village => write!(f, "VILLAGE"),
        }
    }
}

impl FromStr for LocationLevel {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STATE" => Ok(LocationLevel::State),
            "DISTRICT" => Ok(LocationLevel::District),
            "SUBDISTRICT" | "TALUKA" => Ok(LocationLevel::Subdistrict),
            "VILLAGE" => Ok(LocationLevel::Village),
            other => Err(DomainError::ValidationError(format!(
                "Unknown location level: {}",
                other
            ))),
        }
    }
}

/// Location Entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub level: LocationLevel,
    pub parent_id: Option<LocationId>,
    /// Census / LGD code, if known
    pub code: Option<String>,
    pub created_at: i64, // epoch ms
}

impl Location {
    /// Create a new location with injected ID and timestamp
    pub fn new(
        id: impl Into<String>,
        created_at: i64,
        name: &str,
        level: LocationLevel,
        parent_id: Option<LocationId>,
        code: Option<String>,
    ) -> Result<Self> {
        let name = normalize_name(name)?;

        match (level, &parent_id) {
            (LocationLevel::State, Some(_)) => {
                return Err(DomainError::ValidationError(
                    "A state cannot have a parent".to_string(),
                ))
            }
            (LocationLevel::State, None) => {}
            (_, None) => {
                return Err(DomainError::ValidationError(format!(
                    "A {} requires a parent",
                    level
                )))
            }
            (_, Some(_)) => {}
        }

        Ok(Self {
            id: id.into(),
            name,
            level,
            parent_id,
            code: code
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            created_at,
        })
    }

    pub fn rename(&mut self, name: &str) -> Result<()> {
        self.name = normalize_name(name)?;
        Ok(())
    }
}

/// Check that `parent` may hold a child of `child_level`
pub fn validate_parent(child_level: LocationLevel, parent: &Location) -> Result<()> {
    if child_level.parent_level() != Some(parent.level) {
        return Err(DomainError::InvalidParent {
            child: child_level.to_string(),
            parent: parent.level.to_string(),
        });
    }
    Ok(())
}

/// Whether a user attached to `jurisdiction` covers a village whose ancestor
/// chain (State first, village last) is `village_path`.
pub fn covers(jurisdiction: Option<&str>, village_path: &[Location]) -> bool {
    match jurisdiction {
        None => false,
        Some(id) => village_path.iter().any(|loc| loc.id == id),
    }
}

fn normalize_name(name: &str) -> Result<String> {
    let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.is_empty() {
        return Err(DomainError::ValidationError(
            "Location name cannot be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::ValidationError(format!(
            "Location name too long (max {} characters)",
            MAX_NAME_LEN
        )));
    }
    Ok(name)
}
