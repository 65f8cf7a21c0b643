// Application Repository Port (Interface)

use crate::domain::{
    Application, ApplicationId, ApplicationKind, ApplicationStatus, LocationId, Role, UserId,
};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Which records a principal may see
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordScope {
    All,
    Villages(Vec<LocationId>),
    Applicant(UserId),
}

/// Query for application listings
#[derive(Debug, Clone)]
pub struct ApplicationQuery {
    pub scope: RecordScope,
    pub kind: Option<ApplicationKind>,
    pub status: Option<ApplicationStatus>,
    pub village_id: Option<LocationId>,
    pub pending_role: Option<Role>,
    pub limit: i64,
    pub offset: i64,
}

impl ApplicationQuery {
    pub fn new(scope: RecordScope) -> Self {
        Self {
            scope,
            kind: None,
            status: None,
            village_id: None,
            pending_role: None,
            limit: i64::MAX,
            offset: 0,
        }
    }
}

/// Aggregates for dashboards
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplicationStats {
    pub by_status: BTreeMap<ApplicationStatus, i64>,
    pub by_kind: BTreeMap<ApplicationKind, i64>,
    pub total_demand_paise: i64,
}

/// Repository interface for Application persistence
#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    async fn insert(&self, app: &Application) -> Result<()>;

    async fn find_by_id(&self, id: &ApplicationId) -> Result<Option<Application>>;

    /// Save `app` only if the stored version is still `expected_version`.
    ///
    /// A lost race yields `AppError::Conflict`.
    async fn update(&self, app: &Application, expected_version: i64) -> Result<()>;

    /// Newest first
    async fn list(&self, query: &ApplicationQuery) -> Result<Vec<Application>>;

    /// Count ignoring limit/offset
    async fn count(&self, query: &ApplicationQuery) -> Result<i64>;

    async fn stats(&self, scope: &RecordScope) -> Result<ApplicationStats>;
}
