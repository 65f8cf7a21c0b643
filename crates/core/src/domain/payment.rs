// Payment Domain Model

use crate::domain::application::ApplicationId;
use crate::domain::error::{DomainError, Result};
use crate::domain::user::UserId;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub type PaymentId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMode {
    Cash,
    Cheque,
    Online,
}

impl PaymentMode {
    pub fn requires_reference(&self) -> bool {
        !matches!(self, PaymentMode::Cash)
    }
}

impl std::fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMode::Cash => write!(f, "CASH"),
            PaymentMode::Cheque => write!(f, "CHEQUE"),
            PaymentMode::Online => write!(f, "ONLINE"),
        }
    }
}

impl FromStr for PaymentMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CASH" => Ok(PaymentMode::Cash),
            "CHEQUE" => Ok(PaymentMode::Cheque),
            "ONLINE" => Ok(PaymentMode::Online),
            other => Err(DomainError::ValidationError(format!(
                "Unknown payment mode: {}",
                other
            ))),
        }
    }
}

/// Payment Entity (amounts in paise)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub receipt_no: String,
    pub application_id: ApplicationId,
    pub amount_paise: i64,
    pub mode: PaymentMode,
    pub reference: Option<String>,
    pub recorded_by: UserId,
    pub paid_at: i64, // epoch ms
}

impl Payment {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        receipt_no: impl Into<String>,
        paid_at: i64,
        application_id: impl Into<String>,
        amount_paise: i64,
        mode: PaymentMode,
        reference: Option<String>,
        recorded_by: impl Into<String>,
    ) -> Result<Self> {
        if amount_paise <= 0 {
            return Err(DomainError::ValidationError(
                "Payment amount must be positive".to_string(),
            ));
        }

        let reference = reference
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        if mode.requires_reference() && reference.is_none() {
            return Err(DomainError::ValidationError(format!(
                "{} payments require a reference number",
                mode
            )));
        }

        Ok(Self {
            id: id.into(),
            receipt_no: receipt_no.into(),
            application_id: application_id.into(),
            amount_paise,
            mode,
            reference,
            recorded_by: recorded_by.into(),
            paid_at,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    NotBillable,
    Due,
    PartiallyPaid,
    Paid,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::NotBillable => write!(f, "NOT_BILLABLE"),
            PaymentStatus::Due => write!(f, "DUE"),
            PaymentStatus::PartiallyPaid => write!(f, "PARTIALLY_PAID"),
            PaymentStatus::Paid => write!(f, "PAID"),
        }
    }
}

/// Demand vs. collections for one application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub demand_paise: Option<i64>,
    pub paid_paise: i64,
    pub balance_paise: i64,
    pub status: PaymentStatus,
}

impl PaymentSummary {
    pub fn new(demand_paise: Option<i64>, paid_paise: i64) -> Self {
        let (balance_paise, status) = match demand_paise {
            None => (0, PaymentStatus::NotBillable),
            Some(demand) => {
                let balance = (demand - paid_paise).max(0);
                let status = if balance == 0 {
                    PaymentStatus::Paid
                } else if paid_paise > 0 {
                    PaymentStatus::PartiallyPaid
                } else {
                    PaymentStatus::Due
                };
                (balance, status)
            }
        };

        Self {
            demand_paise,
            paid_paise,
            balance_paise,
            status,
        }
    }

    /// Check that `amount` fits within the outstanding balance
    pub fn check_amount(&self, amount_paise: i64) -> Result<()> {
        if self.demand_paise.is_none() {
            return Err(DomainError::ValidationError(
                "Application has no demand to pay".to_string(),
            ));
        }
        if amount_paise > self.balance_paise {
            return Err(DomainError::ExceedsBalance {
                amount: amount_paise,
                balance: self.balance_paise,
            });
        }
        Ok(())
    }
}

/// `RCPT/{year}/{seq:06}`
pub fn format_receipt(year: i32, seq: i64) -> String {
    format!("RCPT/{}/{:06}", year, seq)
}

/// Paise as rupees with two decimals, e.g. `187500` -> `1875.00`
pub fn format_rupees(paise: i64) -> String {
    let sign = if paise < 0 { "-" } else { "" };
    let abs = paise.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}
