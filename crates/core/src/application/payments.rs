// Payment Use Cases: collect water charges against approved demands

use crate::application::access::{covers_village, ensure_can_view, Principal};
use crate::application::notifications::{self, deliver};
use crate::application::ServiceContext;
use crate::domain::payment::format_receipt;
use crate::domain::{
    Application, ApplicationId, ApplicationStatus, Payment, PaymentMode, PaymentSummary, Role,
};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPayment {
    pub application_id: ApplicationId,
    pub amount_paise: i64,
    pub mode: PaymentMode,
    #[serde(default)]
    pub reference: Option<String>,
}

/// Recorded payment and the balance left after it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub payment: Payment,
    pub summary: PaymentSummary,
}

pub struct PaymentService {
    ctx: ServiceContext,
}

impl PaymentService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Talati/Karkoon with jurisdiction record any mode; the applicant may
    /// record an online payment for their own application.
    pub async fn record(&self, principal: &Principal, request: RecordPayment) -> Result<PaymentReceipt> {
        let app = self.load(&request.application_id).await?;

        match principal.role {
            Role::Talati | Role::Karkoon => {
                if !covers_village(&self.ctx, principal, &app.village_id).await? {
                    return Err(AppError::Forbidden(format!(
                        "Application {} is outside your jurisdiction",
                        app.reference_no
                    )));
                }
            }
            Role::Farmer if app.applicant_id == principal.user_id => {
                if request.mode != PaymentMode::Online {
                    return Err(AppError::Forbidden(
                        "Applicants may only record online payments".to_string(),
                    ));
                }
            }
            _ => {
                return Err(AppError::Forbidden(format!(
                    "{} accounts cannot record payments for {}",
                    principal.role.label(),
                    app.reference_no
                )))
            }
        }

        let status = app.status();
        if status != ApplicationStatus::Approved {
            return Err(AppError::InvalidState(format!(
                "Application {} is {}; payments need an approved application",
                app.reference_no, status
            )));
        }
        let demand = app.demand_paise.ok_or_else(|| {
            AppError::Validation(format!("{} is not billable", app.reference_no))
        })?;

        let paid = self.ctx.payments.total_paid(&app.id).await?;
        PaymentSummary::new(Some(demand), paid).check_amount(request.amount_paise)?;

        let now = self.ctx.time_provider.now_millis();
        let year = self.ctx.time_provider.current_year();
        let seq = self
            .ctx
            .sequences
            .next_value(&format!("receipt/{}", year))
            .await?;

        let payment = Payment::new(
            self.ctx.id_provider.generate_id(),
            format_receipt(year, seq),
            now,
            app.id.clone(),
            request.amount_paise,
            request.mode,
            request.reference,
            principal.user_id.clone(),
        )?;
        self.ctx.payments.insert_within_demand(&payment, demand).await?;

        let summary = PaymentSummary::new(Some(demand), paid + payment.amount_paise);
        info!(
            payment_id = %payment.id,
            receipt_no = %payment.receipt_no,
            application_id = %app.id,
            amount_paise = payment.amount_paise,
            balance_paise = summary.balance_paise,
            "Payment recorded"
        );

        if let Some(applicant) = self.ctx.users.find_by_id(&app.applicant_id).await? {
            deliver(
                self.ctx.notifier.as_ref(),
                notifications::payment_receipt(&applicant, &app, &payment, summary.balance_paise),
            )
            .await;
        }

        Ok(PaymentReceipt { payment, summary })
    }

    pub async fn list(&self, principal: &Principal, application_id: &ApplicationId) -> Result<Vec<Payment>> {
        let app = self.load(application_id).await?;
        ensure_can_view(&self.ctx, principal, &app).await?;
        self.ctx.payments.list_by_application(&app.id).await
    }

    pub async fn summary(&self, principal: &Principal, application_id: &ApplicationId) -> Result<PaymentSummary> {
        let app = self.load(application_id).await?;
        ensure_can_view(&self.ctx, principal, &app).await?;
        let paid = self.ctx.payments.total_paid(&app.id).await?;
        Ok(PaymentSummary::new(app.demand_paise, paid))
    }

    async fn load(&self, id: &ApplicationId) -> Result<Application> {
        self.ctx
            .applications
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Application", id))
    }
}
