// Application Workflow Use Cases: submit, review, withdraw, listing

use crate::application::access::{covers_village, ensure_can_view, record_scope, Principal};
use crate::application::notifications::{self, deliver};
use crate::application::ServiceContext;
use crate::domain::application::format_reference;
use crate::domain::{
    Application, ApplicationId, ApplicationKind, ApplicationStatus, LocationId, ReviewInput, Role,
};
use crate::error::{AppError, Result};
use crate::port::ApplicationQuery;
use serde::{Deserialize, Serialize};
use tracing::info;

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 500;

/// Farmer's submission; the village is taken from the farmer's account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitApplication {
    pub kind: ApplicationKind,
    pub survey_number: String,
    pub area_hectares: f64,
    #[serde(default = "empty_details")]
    pub details: serde_json::Value,
}

fn empty_details() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationFilter {
    #[serde(default)]
    pub kind: Option<ApplicationKind>,
    #[serde(default)]
    pub status: Option<ApplicationStatus>,
    #[serde(default)]
    pub village_id: Option<LocationId>,
    /// Only applications waiting on the caller's role
    #[serde(default)]
    pub pending_for_me: bool,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

/// Application with its derived status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationView {
    #[serde(flatten)]
    pub application: Application,
    pub status: ApplicationStatus,
    pub pending_role: Option<Role>,
}

impl From<Application> for ApplicationView {
    fn from(application: Application) -> Self {
        Self {
            status: application.status(),
            pending_role: application.pending_role(),
            application,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationPage {
    pub items: Vec<ApplicationView>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

pub struct ApplicationService {
    ctx: ServiceContext,
}

impl ApplicationService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Farmer files a new application for their own village
    pub async fn submit(&self, principal: &Principal, request: SubmitApplication) -> Result<Application> {
        principal.require_role(&[Role::Farmer])?;
        let village_id = principal.location_id.clone().ok_or_else(|| {
            AppError::Validation("Your account is not attached to a village".to_string())
        })?;

        let now = self.ctx.time_provider.now_millis();
        let year = self.ctx.time_provider.current_year();
        let seq = self
            .ctx
            .sequences
            .next_value(&format!(
                "application/{}/{}",
                request.kind.reference_prefix(),
                year
            ))
            .await?;

        let app = Application::new(
            self.ctx.id_provider.generate_id(),
            format_reference(request.kind, year, seq),
            now,
            request.kind,
            principal.user_id.clone(),
            village_id,
            &request.survey_number,
            request.area_hectares,
            request.details,
        )?;
        self.ctx.applications.insert(&app).await?;

        info!(
            application_id = %app.id,
            reference_no = %app.reference_no,
            kind = %app.kind,
            applicant_id = %app.applicant_id,
            "Application submitted"
        );
        Ok(app)
    }

    pub async fn get(&self, principal: &Principal, id: &ApplicationId) -> Result<Application> {
        let app = self.load(id).await?;
        ensure_can_view(&self.ctx, principal, &app).await?;
        Ok(app)
    }

    /// Newest first, restricted to the caller's scope
    pub async fn list(&self, principal: &Principal, filter: ApplicationFilter) -> Result<ApplicationPage> {
        let limit = filter
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let offset = filter.offset.unwrap_or(0).max(0);

        let Some(mut query) = scoped_query(&self.ctx, principal, &filter).await? else {
            return Ok(ApplicationPage {
                items: Vec::new(),
                total: 0,
                limit,
                offset,
            });
        };

        let total = self.ctx.applications.count(&query).await?;
        query.limit = limit;
        query.offset = offset;
        let items = self
            .ctx
            .applications
            .list(&query)
            .await?
            .into_iter()
            .map(ApplicationView::from)
            .collect();

        Ok(ApplicationPage {
            items,
            total,
            limit,
            offset,
        })
    }

    /// Record the caller's decision at the current step of the chain
    pub async fn review(
        &self,
        principal: &Principal,
        id: &ApplicationId,
        input: ReviewInput,
    ) -> Result<Application> {
        principal.require_role(&[Role::Engineer, Role::Talati, Role::Karkoon, Role::Chowkidar])?;
        let mut app = self.load(id).await?;

        if !covers_village(&self.ctx, principal, &app.village_id).await? {
            return Err(AppError::Forbidden(format!(
                "Application {} is outside your jurisdiction",
                app.reference_no
            )));
        }

        let stored_version = app.version;
        if let Some(expected) = input.expected_version {
            if expected != stored_version {
                return Err(AppError::Conflict(format!(
                    "Application {} was modified (version {}, expected {})",
                    app.reference_no, stored_version, expected
                )));
            }
        }

        let now = self.ctx.time_provider.now_millis();
        app.record_decision(principal.role, &principal.user_id, &input, now)?;
        self.ctx.applications.update(&app, stored_version).await?;

        info!(
            application_id = %app.id,
            reviewer_id = %principal.user_id,
            role = %principal.role,
            decision = ?input.decision,
            status = %app.status(),
            "Application reviewed"
        );

        let decided = app
            .reviews
            .iter()
            .find(|step| step.role == principal.role && step.decision.is_some());
        if let (Some(step), Some(applicant)) = (decided, self.ctx.users.find_by_id(&app.applicant_id).await?) {
            deliver(
                self.ctx.notifier.as_ref(),
                notifications::application_decision(&applicant, &app, step),
            )
            .await;
        }

        Ok(app)
    }

    /// Applicant withdraws while the application is still open
    pub async fn withdraw(&self, principal: &Principal, id: &ApplicationId) -> Result<Application> {
        let mut app = self.load(id).await?;
        if app.applicant_id != principal.user_id {
            return Err(AppError::Forbidden(
                "Only the applicant may withdraw an application".to_string(),
            ));
        }

        let stored_version = app.version;
        app.withdraw(self.ctx.time_provider.now_millis())?;
        self.ctx.applications.update(&app, stored_version).await?;

        info!(application_id = %app.id, "Application withdrawn");
        Ok(app)
    }

    async fn load(&self, id: &ApplicationId) -> Result<Application> {
        self.ctx
            .applications
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Application", id))
    }
}

/// Translate a filter into a repository query within the caller's scope.
///
/// `None` means the result is empty by construction (e.g. "pending for me"
/// asked by a role that never reviews).
pub(crate) async fn scoped_query(
    ctx: &ServiceContext,
    principal: &Principal,
    filter: &ApplicationFilter,
) -> Result<Option<ApplicationQuery>> {
    let mut query = ApplicationQuery::new(record_scope(ctx, principal).await?);
    query.kind = filter.kind;
    query.status = filter.status;
    query.village_id = filter.village_id.clone();

    if filter.pending_for_me {
        if !principal.role.is_reviewer() {
            return Ok(None);
        }
        query.pending_role = Some(principal.role);
    }
    Ok(Some(query))
}
