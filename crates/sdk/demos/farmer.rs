//! Farmer walkthrough: log in, file a Form-12 application, follow it.
//!
//! ```bash
//! KISSAN_MOBILE=9876543210 KISSAN_PASSWORD=... cargo run -p kissan-sdk --example farmer
//! ```

use kissan_sdk::{ApplicationFilter, ApplicationKind, KissanClient, SubmitApplication};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let url = std::env::var("KISSAN_RPC_URL").unwrap_or_else(|_| "http://127.0.0.1:9530".into());
    let mobile = std::env::var("KISSAN_MOBILE")?;
    let password = std::env::var("KISSAN_PASSWORD")?;

    let mut client = KissanClient::connect(&url).await?;
    let login = client.login(&mobile, &password).await?;
    println!("Logged in as {}", login.user.full_name);

    if login.must_change_password {
        println!("Password change required; run `kissan passwd` first.");
        return Ok(());
    }

    let app = client
        .submit_application(&SubmitApplication {
            kind: ApplicationKind::Form12,
            survey_number: "42/1".to_string(),
            area_hectares: 1.5,
            details: json!({ "crop": "Sugarcane", "season": "RABI" }),
        })
        .await?;
    println!(
        "Submitted {} ({})",
        app.application.reference_no, app.status
    );

    let page = client
        .list_applications(&ApplicationFilter::default())
        .await?;
    for view in page.items {
        let pending = view
            .pending_role
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<18} {:<14} pending with {}",
            view.application.reference_no, view.status, pending
        );
    }

    let summary = client.dashboard().await?;
    println!(
        "Balance due: {} paise",
        summary.total_demand_paise - summary.total_collected_paise
    );

    client.logout().await?;
    Ok(())
}
