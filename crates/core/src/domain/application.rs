// Application Domain Model (Form-12, Namuna-7, NOC, well exemption)

use crate::domain::error::{DomainError, Result};
use crate::domain::location::LocationId;
use crate::domain::role::Role;
use crate::domain::user::UserId;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub type ApplicationId = String;

/// Upper bound on a single holding, in hectares
pub const MAX_AREA_HECTARES: f64 = 10_000.0;

/// Upper bound on the billing rate: Rs 1 crore per hectare
pub const MAX_RATE_PER_HECTARE_PAISE: i64 = 1_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationKind {
    /// Irrigation rate approval
    Form12,
    /// Water-supply application
    Namuna7,
    /// No-objection certificate
    Noc,
    WellExemption,
}

impl ApplicationKind {
    pub const ALL: [ApplicationKind; 4] = [
        ApplicationKind::Form12,
        ApplicationKind::Namuna7,
        ApplicationKind::Noc,
        ApplicationKind::WellExemption,
    ];

    /// Roles that must approve, in order
    pub fn review_chain(&self) -> &'static [Role] {
        match self {
            ApplicationKind::Form12 => &[Role::Talati, Role::Engineer],
            ApplicationKind::Namuna7 => &[
                Role::Chowkidar,
                Role::Talati,
                Role::Karkoon,
                Role::Engineer,
            ],
            ApplicationKind::Noc => &[Role::Karkoon, Role::Engineer],
            ApplicationKind::WellExemption => &[Role::Talati, Role::Engineer],
        }
    }

    /// Kinds that raise a water-charge demand on final approval
    pub fn is_billable(&self) -> bool {
        matches!(self, ApplicationKind::Form12 | ApplicationKind::Namuna7)
    }

    pub fn reference_prefix(&self) -> &'static str {
        match self {
            ApplicationKind::Form12 => "F12",
            ApplicationKind::Namuna7 => "N7",
            ApplicationKind::Noc => "NOC",
            ApplicationKind::WellExemption => "WEX",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ApplicationKind::Form12 => "Form-12 rate approval",
            ApplicationKind::Namuna7 => "Namuna-7 water supply",
            ApplicationKind::Noc => "NOC request",
            ApplicationKind::WellExemption => "Well exemption",
        }
    }

    /// Check the kind-specific `details` object
    pub fn validate_details(&self, details: &serde_json::Value) -> Result<()> {
        let obj = details.as_object().ok_or_else(|| {
            DomainError::ValidationError("Application details must be an object".to_string())
        })?;

        let required_text = |key: &str| -> Result<()> {
            match obj.get(key).and_then(|v| v.as_str()) {
                Some(s) if !s.trim().is_empty() => Ok(()),
                _ => Err(DomainError::ValidationError(format!(
                    "{} requires a non-empty '{}'",
                    self.title(),
                    key
                ))),
            }
        };

        match self {
            ApplicationKind::Form12 => {
                required_text("crop")?;
                let season = obj.get("season").and_then(|v| v.as_str()).unwrap_or("");
                if !matches!(season, "KHARIF" | "RABI" | "HOT_WEATHER") {
                    return Err(DomainError::ValidationError(format!(
                        "Invalid season '{}': expected KHARIF, RABI or HOT_WEATHER",
                        season
                    )));
                }
            }
            ApplicationKind::Namuna7 => {
                required_text("water_source")?;
                required_text("crop")?;
            }
            ApplicationKind::Noc => required_text("purpose")?,
            ApplicationKind::WellExemption => {
                match obj.get("well_depth_m").and_then(|v| v.as_f64()) {
                    Some(depth) if depth > 0.0 => {}
                    _ => {
                        return Err(DomainError::ValidationError(
                            "Well exemption requires a positive 'well_depth_m'".to_string(),
                        ))
                    }
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for ApplicationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApplicationKind::Form12 => write!(f, "FORM12"),
            ApplicationKind::Namuna7 => write!(f, "NAMUNA7"),
            ApplicationKind::Noc => write!(f, "NOC"),
            ApplicationKind::WellExemption => write!(f, "WELL_EXEMPTION"),
        }
    }
}

impl FromStr for ApplicationKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "FORM12" | "FORM_12" => Ok(ApplicationKind::Form12),
            "NAMUNA7" | "NAMUNA_7" => Ok(ApplicationKind::Namuna7),
            "NOC" => Ok(ApplicationKind::Noc),
            "WELL_EXEMPTION" => Ok(ApplicationKind::WellExemption),
            other => Err(DomainError::ValidationError(format!(
                "Unknown application kind: {}",
                other
            ))),
        }
    }
}

/// Derived status; never stored as the source of truth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Submitted,
    UnderReview,
    Approved,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 5] = [
        ApplicationStatus::Submitted,
        ApplicationStatus::UnderReview,
        ApplicationStatus::Approved,
        ApplicationStatus::Rejected,
        ApplicationStatus::Withdrawn,
    ];

    pub fn is_open(&self) -> bool {
        matches!(
            self,
            ApplicationStatus::Submitted | ApplicationStatus::UnderReview
        )
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApplicationStatus::Submitted => write!(f, "SUBMITTED"),
            ApplicationStatus::UnderReview => write!(f, "UNDER_REVIEW"),
            ApplicationStatus::Approved => write!(f, "APPROVED"),
            ApplicationStatus::Rejected => write!(f, "REJECTED"),
            ApplicationStatus::Withdrawn => write!(f, "WITHDRAWN"),
        }
    }
}

impl FromStr for ApplicationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SUBMITTED" => Ok(ApplicationStatus::Submitted),
            "UNDER_REVIEW" => Ok(ApplicationStatus::UnderReview),
            "APPROVED" => Ok(ApplicationStatus::Approved),
            "REJECTED" => Ok(ApplicationStatus::Rejected),
            "WITHDRAWN" => Ok(ApplicationStatus::Withdrawn),
            other => Err(DomainError::ValidationError(format!(
                "Unknown application status: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Approved,
    Denied,
}

/// One reviewer's slot in the chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewStep {
    pub role: Role,
    pub decision: Option<Decision>,
    pub reviewer_id: Option<UserId>,
    pub remark: Option<String>,
    pub decided_at: Option<i64>,
}

impl ReviewStep {
    fn pending(role: Role) -> Self {
        Self {
            role,
            decision: None,
            reviewer_id: None,
            remark: None,
            decided_at: None,
        }
    }
}

/// Reviewer input for a single decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewInput {
    pub decision: Decision,
    #[serde(default)]
    pub remark: Option<String>,
    /// Required when the final approver approves a billable kind
    #[serde(default)]
    pub rate_per_hectare_paise: Option<i64>,
    /// Optimistic concurrency guard; rejected if the stored version differs
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// Application Entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub reference_no: String,
    pub kind: ApplicationKind,
    pub applicant_id: UserId,
    pub village_id: LocationId,
    pub survey_number: String,
    pub area_hectares: f64,
    pub details: serde_json::Value,

    pub reviews: Vec<ReviewStep>,
    pub withdrawn: bool,
    pub rate_per_hectare_paise: Option<i64>,
    pub demand_paise: Option<i64>,

    pub version: i64,
    pub created_at: i64, // epoch ms
    pub updated_at: i64,
}

impl Application {
    /// Create a freshly submitted application with injected ID, reference and time
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        reference_no: impl Into<String>,
        created_at: i64,
        kind: ApplicationKind,
        applicant_id: impl Into<String>,
        village_id: impl Into<String>,
        survey_number: &str,
        area_hectares: f64,
        details: serde_json::Value,
    ) -> Result<Self> {
        let survey_number = survey_number.trim().to_string();
        if survey_number.is_empty() {
            return Err(DomainError::ValidationError(
                "Survey number cannot be empty".to_string(),
            ));
        }
        if !area_hectares.is_finite() || area_hectares <= 0.0 || area_hectares > MAX_AREA_HECTARES
        {
            return Err(DomainError::ValidationError(format!(
                "Area must be greater than 0 and at most {} hectares",
                MAX_AREA_HECTARES
            )));
        }
        kind.validate_details(&details)?;

        Ok(Self {
            id: id.into(),
            reference_no: reference_no.into(),
            kind,
            applicant_id: applicant_id.into(),
            village_id: village_id.into(),
            survey_number,
            area_hectares,
            details,
            reviews: kind
                .review_chain()
                .iter()
                .copied()
                .map(ReviewStep::pending)
                .collect(),
            withdrawn: false,
            rate_per_hectare_paise: None,
            demand_paise: None,
            version: 1,
            created_at,
            updated_at: created_at,
        })
    }

    /// Status is derived from the withdrawn flag and the review decisions
    pub fn status(&self) -> ApplicationStatus {
        derive_status(self.withdrawn, &self.reviews)
    }

    /// Role expected to act next, while the application is open
    pub fn pending_role(&self) -> Option<Role> {
        if !self.status().is_open() {
            return None;
        }
        self.reviews
            .iter()
            .find(|step| step.decision.is_none())
            .map(|step| step.role)
    }

    /// Record the next reviewer's decision
    pub fn record_decision(
        &mut self,
        role: Role,
        reviewer_id: &str,
        input: &ReviewInput,
        now_millis: i64,
    ) -> Result<()> {
        let status = self.status();
        if !status.is_open() {
            return Err(DomainError::InvalidStateTransition {
                from: status.to_string(),
                to: "REVIEWED".to_string(),
            });
        }

        let index = self
            .reviews
            .iter()
            .position(|step| step.decision.is_none())
            .ok_or_else(|| DomainError::ValidationError("No pending review step".to_string()))?;

        let expected = self.reviews[index].role;
        if expected != role {
            return Err(DomainError::ValidationError(format!(
                "Application is awaiting {} review, not {}",
                expected.label(),
                role.label()
            )));
        }

        let remark = input
            .remark
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(String::from);

        if input.decision == Decision::Denied && remark.is_none() {
            return Err(DomainError::ValidationError(
                "A remark is required when denying an application".to_string(),
            ));
        }

        let is_final = index + 1 == self.reviews.len();
        if input.decision == Decision::Approved && is_final && self.kind.is_billable() {
            let rate = match input.rate_per_hectare_paise {
                Some(rate) if rate > 0 => rate,
                _ => {
                    return Err(DomainError::ValidationError(
                        "Final approval requires a positive rate_per_hectare_paise".to_string(),
                    ))
                }
            };
            let demand = compute_demand(self.area_hectares, rate)?;
            self.rate_per_hectare_paise = Some(rate);
            self.demand_paise = Some(demand);
        }

        let step = &mut self.reviews[index];
        step.decision = Some(input.decision);
        step.reviewer_id = Some(reviewer_id.to_string());
        step.remark = remark;
        step.decided_at = Some(now_millis);

        self.touch(now_millis);
        Ok(())
    }

    /// Applicant withdraws an open application
    pub fn withdraw(&mut self, now_millis: i64) -> Result<()> {
        let status = self.status();
        if !status.is_open() {
            return Err(DomainError::InvalidStateTransition {
                from: status.to_string(),
                to: ApplicationStatus::Withdrawn.to_string(),
            });
        }
        self.withdrawn = true;
        self.touch(now_millis);
        Ok(())
    }

    /// Time of the last recorded decision, if any
    pub fn last_decided_at(&self) -> Option<i64> {
        self.reviews.iter().filter_map(|s| s.decided_at).max()
    }

    fn touch(&mut self, now_millis: i64) {
        self.updated_at = now_millis;
        self.version += 1;
    }
}

/// Status derivation from the withdrawn flag and per-step decisions
pub fn derive_status(withdrawn: bool, reviews: &[ReviewStep]) -> ApplicationStatus {
    if withdrawn {
        return ApplicationStatus::Withdrawn;
    }
    if reviews
        .iter()
        .any(|s| s.decision == Some(Decision::Denied))
    {
        return ApplicationStatus::Rejected;
    }
    if reviews
        .iter()
        .all(|s| s.decision == Some(Decision::Approved))
    {
        return ApplicationStatus::Approved;
    }
    if reviews.iter().all(|s| s.decision.is_none()) {
        return ApplicationStatus::Submitted;
    }
    ApplicationStatus::UnderReview
}

/// Demand in paise, rounded half away from zero.
///
/// The rate must lie in `1..=MAX_RATE_PER_HECTARE_PAISE`, which keeps any
/// demand (and the sum of many) well inside `i64`.
pub fn compute_demand(area_hectares: f64, rate_per_hectare_paise: i64) -> Result<i64> {
    if !(1..=MAX_RATE_PER_HECTARE_PAISE).contains(&rate_per_hectare_paise) {
        return Err(DomainError::ValidationError(format!(
            "rate_per_hectare_paise must be between 1 and {}",
            MAX_RATE_PER_HECTARE_PAISE
        )));
    }

    let demand = (area_hectares * rate_per_hectare_paise as f64).round();
    let max_demand = MAX_AREA_HECTARES * MAX_RATE_PER_HECTARE_PAISE as f64;
    if !demand.is_finite() || demand < 0.0 || demand > max_demand {
        return Err(DomainError::ValidationError(format!(
            "Demand out of range for {} ha at {} paise/ha",
            area_hectares, rate_per_hectare_paise
        )));
    }
    Ok(demand as i64)
}

/// `{prefix}/{year}/{seq:05}`, e.g. `N7/2025/00042`
pub fn format_reference(kind: ApplicationKind, year: i32, seq: i64) -> String {
    format!("{}/{}/{:05}", kind.reference_prefix(), year, seq)
}
