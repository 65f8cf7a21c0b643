// Spreadsheet exports (CSV that opens cleanly in Excel)

use crate::application::access::{record_scope, Principal};
use crate::application::applications::{scoped_query, ApplicationFilter};
use crate::application::ServiceContext;
use crate::domain::payment::format_rupees;
use crate::domain::{Application, ApplicationId, Location, LocationId, PaymentMode, User, UserId};
use crate::error::{AppError, Result};
use crate::port::time_provider::local_date;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

const CONTENT_TYPE: &str = "text/csv";
const BOM: char = '\u{feff}';

const APPLICATION_COLUMNS: [&str; 12] = [
    "Reference No",
    "Kind",
    "Applicant",
    "Mobile",
    "Village",
    "Survey No",
    "Area (ha)",
    "Status",
    "Pending With",
    "Demand (Rs)",
    "Paid (Rs)",
    "Submitted On",
];

const PAYMENT_COLUMNS: [&str; 7] = [
    "Receipt No",
    "Reference No",
    "Applicant",
    "Mode",
    "Reference",
    "Amount (Rs)",
    "Paid On",
];

/// Generated document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub filename: String,
    pub content_type: String,
    pub content: String,
    pub rows: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentReportFilter {
    #[serde(default)]
    pub mode: Option<PaymentMode>,
    /// Inclusive, IST calendar date
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

pub struct ExportService {
    ctx: ServiceContext,
}

impl ExportService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn applications(&self, principal: &Principal, filter: ApplicationFilter) -> Result<Report> {
        require_staff(principal)?;

        let apps = match scoped_query(&self.ctx, principal, &filter).await? {
            Some(query) => self.ctx.applications.list(&query).await?,
            None => Vec::new(),
        };

        let mut lookup = Lookup::new(&self.ctx);
        let mut csv = CsvWriter::new();
        csv.write_row(APPLICATION_COLUMNS);

        for app in &apps {
            let applicant = lookup.user(&app.applicant_id).await?;
            let village = lookup.location(&app.village_id).await?;
            let paid = self.ctx.payments.total_paid(&app.id).await?;

            csv.write_row([
                app.reference_no.clone(),
                app.kind.title().to_string(),
                applicant.as_ref().map(|u| u.full_name.clone()).unwrap_or_default(),
                applicant.map(|u| u.mobile).unwrap_or_default(),
                village.map(|l| l.name).unwrap_or_default(),
                app.survey_number.clone(),
                format!("{:.2}", app.area_hectares),
                app.status().to_string(),
                app.pending_role()
                    .map(|r| r.label().to_string())
                    .unwrap_or_default(),
                app.demand_paise.map(format_rupees).unwrap_or_default(),
                format_rupees(paid),
                format_date(app.created_at),
            ]);
        }

        let report = self.finish("applications", csv, apps.len());
        info!(user_id = %principal.user_id, rows = report.rows, "Applications exported");
        Ok(report)
    }

    pub async fn payments(&self, principal: &Principal, filter: PaymentReportFilter) -> Result<Report> {
        require_staff(principal)?;

        let scope = record_scope(&self.ctx, principal).await?;
        let payments: Vec<_> = self
            .ctx
            .payments
            .list(&scope)
            .await?
            .into_iter()
            .filter(|p| filter.mode.map_or(true, |m| p.mode == m))
            .filter(|p| {
                let day = local_date(p.paid_at);
                filter.from.map_or(true, |from| day >= from) && filter.to.map_or(true, |to| day <= to)
            })
            .collect();

        let mut lookup = Lookup::new(&self.ctx);
        let mut csv = CsvWriter::new();
        csv.write_row(PAYMENT_COLUMNS);

        for payment in &payments {
            let app = lookup.application(&payment.application_id).await?;
            let reference_no = app.as_ref().map(|a| a.reference_no.clone()).unwrap_or_default();
            let applicant = match app {
                Some(a) => lookup.user(&a.applicant_id).await?.map(|u| u.full_name),
                None => None,
            };

            csv.write_row([
                payment.receipt_no.clone(),
                reference_no,
                applicant.unwrap_or_default(),
                payment.mode.to_string(),
                payment.reference.clone().unwrap_or_default(),
                format_rupees(payment.amount_paise),
                format_date(payment.paid_at),
            ]);
        }

        let report = self.finish("payments", csv, payments.len());
        info!(user_id = %principal.user_id, rows = report.rows, "Payments exported");
        Ok(report)
    }

    fn finish(&self, name: &str, csv: CsvWriter, rows: usize) -> Report {
        Report {
            filename: format!(
                "{}-{}.csv",
                name,
                self.ctx.time_provider.today().format("%Y%m%d")
            ),
            content_type: CONTENT_TYPE.to_string(),
            content: csv.finish(),
            rows,
        }
    }
}

fn require_staff(principal: &Principal) -> Result<()> {
    if principal.role.is_staff() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Exports are available to staff accounts only".to_string(),
        ))
    }
}

fn format_date(millis: i64) -> String {
    local_date(millis).format("%d/%m/%Y").to_string()
}

/// Per-export cache so each user, village and application is loaded once
struct Lookup<'a> {
    ctx: &'a ServiceContext,
    users: HashMap<UserId, Option<User>>,
    locations: HashMap<LocationId, Option<Location>>,
    applications: HashMap<ApplicationId, Option<Application>>,
}

impl<'a> Lookup<'a> {
    fn new(ctx: &'a ServiceContext) -> Self {
        Self {
            ctx,
            users: HashMap::new(),
            locations: HashMap::new(),
            applications: HashMap::new(),
        }
    }

    async fn user(&mut self, id: &UserId) -> Result<Option<User>> {
        if !self.users.contains_key(id) {
            let user = self.ctx.users.find_by_id(id).await?;
            self.users.insert(id.clone(), user);
        }
        Ok(self.users.get(id).cloned().flatten())
    }

    async fn location(&mut self, id: &LocationId) -> Result<Option<Location>> {
        if !self.locations.contains_key(id) {
            let location = self.ctx.locations.find_by_id(id).await?;
            self.locations.insert(id.clone(), location);
        }
        Ok(self.locations.get(id).cloned().flatten())
    }

    async fn application(&mut self, id: &ApplicationId) -> Result<Option<Application>> {
        if !self.applications.contains_key(id) {
            let app = self.ctx.applications.find_by_id(id).await?;
            self.applications.insert(id.clone(), app);
        }
        Ok(self.applications.get(id).cloned().flatten())
    }
}

/// RFC 4180 writer: BOM prefix, CRLF rows, quotes only where needed
pub struct CsvWriter {
    buf: String,
}

impl CsvWriter {
    pub fn new() -> Self {
        let mut buf = String::new();
        buf.push(BOM);
        Self { buf }
    }

    pub fn write_row<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for (i, field) in fields.into_iter().enumerate() {
            if i > 0 {
                self.buf.push(',');
            }
            push_field(&mut self.buf, field.as_ref());
        }
        self.buf.push_str("\r\n");
    }

    pub fn finish(self) -> String {
        self.buf
    }
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn push_field(buf: &mut String, field: &str) {
    let needs_quotes = field.contains(&[',', '"', '\r', '\n'][..])
        || field.starts_with(' ')
        || field.ends_with(' ');
    if !needs_quotes {
        buf.push_str(field);
        return;
    }
    buf.push('"');
    for c in field.chars() {
        if c == '"' {
            buf.push('"');
        }
        buf.push(c);
    }
    buf.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_quoting_and_line_endings() {
        let mut csv = CsvWriter::new();
        csv.write_row(["Reference No", "Applicant"]);
        csv.write_row(["N7/2025/00001", "Patil, \"Anna\""]);
        csv.write_row(["multi\nline", " padded"]);
        let out = csv.finish();

        assert!(out.starts_with('\u{feff}'));
        assert_eq!(
            out.trim_start_matches('\u{feff}'),
            "Reference No,Applicant\r\n\
             N7/2025/00001,\"Patil, \"\"Anna\"\"\"\r\n\
             \"multi\nline\",\" padded\"\r\n"
        );
    }

    #[test]
    fn test_format_date_is_ist() {
        // 2025-03-31T20:00:00Z is already 1 April in India
        assert_eq!(format_date(1_743_451_200_000), "01/04/2025");
    }
}
