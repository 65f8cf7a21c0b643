// Email templates and best-effort delivery

use crate::domain::payment::format_rupees;
use crate::domain::{Application, Decision, Payment, ReviewStep, User};
use crate::port::time_provider::local_date;
use crate::port::{Notification, Notifier};
use tracing::{debug, warn};

const PRODUCT: &str = "Kissan Plus";

/// Send and log; delivery failures never fail the calling use case
pub async fn deliver(notifier: &dyn Notifier, notification: Notification) {
    match notifier.send(&notification).await {
        Ok(()) => debug!(to = %notification.to_email, subject = %notification.subject, "Notification sent"),
        Err(e) => warn!(
            to = %notification.to_email,
            subject = %notification.subject,
            error = %e,
            "Notification delivery failed"
        ),
    }
}

pub fn account_created(user: &User, initial_password: &str) -> Notification {
    let lines = vec![
        format!("Dear {},", user.full_name),
        format!(
            "A {} account has been created for you on {}.",
            user.role.label(),
            PRODUCT
        ),
        format!("Login: {} (or mobile {})", user.email, user.mobile),
        format!("Temporary password: {}", initial_password),
        "You will be asked to choose a new password when you first sign in.".to_string(),
    ];
    render(user, format!("{}: your account is ready", PRODUCT), &lines)
}

pub fn password_reset(user: &User, initial_password: &str) -> Notification {
    let lines = vec![
        format!("Dear {},", user.full_name),
        format!("Your {} password has been reset by an administrator.", PRODUCT),
        format!("Temporary password: {}", initial_password),
        "You will be asked to choose a new password when you next sign in.".to_string(),
    ];
    render(user, format!("{}: password reset", PRODUCT), &lines)
}

/// Sent to the applicant after every review decision
pub fn application_decision(applicant: &User, app: &Application, step: &ReviewStep) -> Notification {
    let verdict = match step.decision {
        Some(Decision::Approved) => "approved",
        Some(Decision::Denied) => "denied",
        None => "updated",
    };

    let mut lines = vec![
        format!("Dear {},", applicant.full_name),
        format!(
            "Your {} {} has been {} by the {}.",
            app.kind.title(),
            app.reference_no,
            verdict,
            step.role.label()
        ),
    ];
    if let Some(remark) = &step.remark {
        lines.push(format!("Remark: {}", remark));
    }
    lines.push(format!("Current status: {}", app.status()));
    if let Some(next) = app.pending_role() {
        lines.push(format!("It is now awaiting {} review.", next.label()));
    }
    if let Some(demand) = app.demand_paise {
        lines.push(format!("Amount payable: Rs {}", format_rupees(demand)));
    }

    render(
        applicant,
        format!("{}: {} {}", PRODUCT, app.reference_no, verdict),
        &lines,
    )
}

pub fn payment_receipt(
    applicant: &User,
    app: &Application,
    payment: &Payment,
    balance_paise: i64,
) -> Notification {
    let lines = vec![
        format!("Dear {},", applicant.full_name),
        format!(
            "We have received Rs {} ({}) against {}.",
            format_rupees(payment.amount_paise),
            payment.mode,
            app.reference_no
        ),
        format!("Receipt number: {}", payment.receipt_no),
        format!(
            "Paid on: {}",
            local_date(payment.paid_at).format("%d/%m/%Y")
        ),
        format!("Outstanding balance: Rs {}", format_rupees(balance_paise)),
    ];
    render(
        applicant,
        format!("{}: receipt {}", PRODUCT, payment.receipt_no),
        &lines,
    )
}

fn render(to: &User, subject: String, lines: &[String]) -> Notification {
    let text_body = format!("{}\n\n-- \n{}\n", lines.join("\n\n"), PRODUCT);
    let html_body = format!(
        "<html><body>{}<hr><p style=\"color:#6b7280;font-size:12px\">{}</p></body></html>",
        lines
            .iter()
            .map(|l| format!("<p>{}</p>", escape_html(l)))
            .collect::<String>(),
        PRODUCT
    );

    Notification {
        to_email: to.email.clone(),
        to_name: to.full_name.clone(),
        subject,
        text_body,
        html_body,
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
