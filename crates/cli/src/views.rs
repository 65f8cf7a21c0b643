//! Table rows built from RPC results

use chrono::{DateTime, FixedOffset};
use serde_json::Value;
use tabled::Tabled;

const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

fn text(value: &Value, key: &str) -> String {
    match &value[key] {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `123456` paise -> `1234.56`
pub fn rupees(paise: i64) -> String {
    let sign = if paise < 0 { "-" } else { "" };
    let paise = paise.abs();
    format!("{}{}.{:02}", sign, paise / 100, paise % 100)
}

fn rupees_field(value: &Value, key: &str) -> String {
    value[key].as_i64().map(rupees).unwrap_or_default()
}

/// Epoch millis as an Indian calendar date (DD/MM/YYYY)
pub fn ist_date(millis: i64) -> String {
    let Some(offset) = FixedOffset::east_opt(IST_OFFSET_SECS) else {
        return String::new();
    };
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.with_timezone(&offset).format("%d/%m/%Y").to_string())
        .unwrap_or_default()
}

fn date_field(value: &Value, key: &str) -> String {
    value[key].as_i64().map(ist_date).unwrap_or_default()
}

#[derive(Tabled)]
pub struct UserRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Role")]
    pub role: String,
    #[tabled(rename = "Email")]
    pub email: String,
    #[tabled(rename = "Mobile")]
    pub mobile: String,
    #[tabled(rename = "Active")]
    pub active: String,
}

impl From<&Value> for UserRow {
    fn from(v: &Value) -> Self {
        Self {
            id: text(v, "id"),
            name: text(v, "full_name"),
            role: text(v, "role"),
            email: text(v, "email"),
            mobile: text(v, "mobile"),
            active: if v["active"].as_bool().unwrap_or(false) { "yes" } else { "no" }.to_string(),
        }
    }
}

#[derive(Tabled)]
pub struct LocationRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Level")]
    pub level: String,
    #[tabled(rename = "Code")]
    pub code: String,
}

impl From<&Value> for LocationRow {
    fn from(v: &Value) -> Self {
        Self {
            id: text(v, "id"),
            name: text(v, "name"),
            level: text(v, "level"),
            code: text(v, "code"),
        }
    }
}

#[derive(Tabled)]
pub struct ApplicationRow {
    #[tabled(rename = "Reference No")]
    pub reference_no: String,
    #[tabled(rename = "Kind")]
    pub kind: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Pending With")]
    pub pending_role: String,
    #[tabled(rename = "Survey No")]
    pub survey_number: String,
    #[tabled(rename = "Demand (Rs)")]
    pub demand: String,
    #[tabled(rename = "Submitted")]
    pub submitted: String,
    #[tabled(rename = "ID")]
    pub id: String,
}

impl From<&Value> for ApplicationRow {
    fn from(v: &Value) -> Self {
        Self {
            reference_no: text(v, "reference_no"),
            kind: text(v, "kind"),
            status: text(v, "status"),
            pending_role: text(v, "pending_role"),
            survey_number: text(v, "survey_number"),
            demand: rupees_field(v, "demand_paise"),
            submitted: date_field(v, "created_at"),
            id: text(v, "id"),
        }
    }
}

#[derive(Tabled)]
pub struct ReviewRow {
    #[tabled(rename = "Step")]
    pub role: String,
    #[tabled(rename = "Decision")]
    pub decision: String,
    #[tabled(rename = "Remark")]
    pub remark: String,
    #[tabled(rename = "Decided")]
    pub decided: String,
}

impl From<&Value> for ReviewRow {
    fn from(v: &Value) -> Self {
        let decision = text(v, "decision");
        Self {
            role: text(v, "role"),
            decision: if decision.is_empty() { "PENDING".to_string() } else { decision },
            remark: text(v, "remark"),
            decided: date_field(v, "decided_at"),
        }
    }
}

#[derive(Tabled)]
pub struct PaymentRow {
    #[tabled(rename = "Receipt No")]
    pub receipt_no: String,
    #[tabled(rename = "Mode")]
    pub mode: String,
    #[tabled(rename = "Amount (Rs)")]
    pub amount: String,
    #[tabled(rename = "Reference")]
    pub reference: String,
    #[tabled(rename = "Paid On")]
    pub paid_on: String,
}

impl From<&Value> for PaymentRow {
    fn from(v: &Value) -> Self {
        Self {
            receipt_no: text(v, "receipt_no"),
            mode: text(v, "mode"),
            amount: rupees_field(v, "amount_paise"),
            reference: text(v, "reference"),
            paid_on: date_field(v, "paid_at"),
        }
    }
}

/// Two-column table for `{ "KEY": count }` maps
#[derive(Tabled)]
pub struct CountRow {
    #[tabled(rename = "")]
    pub key: String,
    #[tabled(rename = "Count")]
    pub count: i64,
}

pub fn count_rows(map: &Value) -> Vec<CountRow> {
    map.as_object()
        .map(|m| {
            m.iter()
                .map(|(k, v)| CountRow {
                    key: k.clone(),
                    count: v.as_i64().unwrap_or(0),
                })
                .collect()
        })
        .unwrap_or_default()
}

pub fn rows<'a, T>(items: &'a Value) -> Vec<T>
where
    T: From<&'a Value>,
{
    items
        .as_array()
        .map(|a| a.iter().map(T::from).collect())
        .unwrap_or_default()
}
