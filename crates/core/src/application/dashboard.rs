// Role dashboards

use crate::application::access::{record_scope, Principal};
use crate::application::ServiceContext;
use crate::domain::{ApplicationKind, ApplicationStatus, LocationLevel, Role};
use crate::error::Result;
use crate::port::ApplicationQuery;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Counters for the caller's landing page.
///
/// Map keys are the wire names (`UNDER_REVIEW`, `FORM12`, ...) and every
/// known key is present, zero-filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub role: Role,
    pub applications_by_status: BTreeMap<String, i64>,
    pub applications_by_kind: BTreeMap<String, i64>,
    pub pending_for_me: i64,
    pub total_demand_paise: i64,
    pub total_collected_paise: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users_by_role: Option<BTreeMap<String, i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations_by_level: Option<BTreeMap<String, i64>>,
}

pub struct DashboardService {
    ctx: ServiceContext,
}

impl DashboardService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn summary(&self, principal: &Principal) -> Result<DashboardSummary> {
        let scope = record_scope(&self.ctx, principal).await?;
        let stats = self.ctx.applications.stats(&scope).await?;

        let applications_by_status = zero_filled(&ApplicationStatus::ALL, &stats.by_status);
        let applications_by_kind = zero_filled(&ApplicationKind::ALL, &stats.by_kind);

        let pending_for_me = if principal.role.is_reviewer() {
            let mut query = ApplicationQuery::new(scope.clone());
            query.pending_role = Some(principal.role);
            self.ctx.applications.count(&query).await?
        } else {
            0
        };

        let total_collected_paise = self.ctx.payments.total_collected(&scope).await?;

        let (users_by_role, locations_by_level) = if principal.is_admin() {
            let users = self.ctx.users.count_by_role().await?;
            let locations = self.ctx.locations.count_by_level().await?;
            (
                Some(zero_filled(&Role::ALL, &users)),
                Some(zero_filled(&LocationLevel::ALL, &locations)),
            )
        } else {
            (None, None)
        };

        Ok(DashboardSummary {
            role: principal.role,
            applications_by_status,
            applications_by_kind,
            pending_for_me,
            total_demand_paise: stats.total_demand_paise,
            total_collected_paise,
            users_by_role,
            locations_by_level,
        })
    }
}

fn zero_filled<K>(keys: &[K], counts: &BTreeMap<K, i64>) -> BTreeMap<String, i64>
where
    K: Ord + std::fmt::Display,
{
    keys.iter()
        .map(|k| (k.to_string(), counts.get(k).copied().unwrap_or(0)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_filled_uses_wire_names() {
        let mut counts = BTreeMap::new();
        counts.insert(ApplicationStatus::UnderReview, 3);

        let filled = zero_filled(&ApplicationStatus::ALL, &counts);
        assert_eq!(filled.len(), 5);
        assert_eq!(filled["UNDER_REVIEW"], 3);
        assert_eq!(filled["APPROVED"], 0);
    }
}
