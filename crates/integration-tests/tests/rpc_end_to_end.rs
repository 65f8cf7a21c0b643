// JSON-RPC server and SDK client over a real HTTP socket

mod common;

use common::{new_user, Office, FARMER_EMAIL, PASSWORD};
use jsonrpsee::server::ServerHandle;
use kissan_api_rpc::{RpcServer, RpcServerConfig};
use kissan_core::domain::Role;
use kissan_sdk::{
    code, ApplicationFilter, ApplicationKind, ApplicationStatus, Decision, KissanClient,
    PaymentMode, PaymentStatus, RecordPayment, ReviewInput, SdkError, SubmitApplication,
};
use serde_json::json;

/// Serve the office on a free local port
async fn serve(office: &Office, login_max_attempts: u32) -> (ServerHandle, String) {
    let config = RpcServerConfig {
        port: 0,
        login_max_attempts,
        ..Default::default()
    };
    let (handle, addr) = RpcServer::new(
        config,
        office.env.services.clone(),
        office.env.maintenance.clone(),
    )
    .start()
    .await
    .unwrap();
    (handle, format!("http://{}", addr))
}

async fn login(url: &str, identifier: &str, password: &str) -> KissanClient {
    let mut client = KissanClient::connect(url).await.unwrap();
    client.login(identifier, password).await.unwrap();
    client
}

fn form12() -> SubmitApplication {
    SubmitApplication {
        kind: ApplicationKind::Form12,
        survey_number: "112/3A".to_string(),
        area_hectares: 2.0,
        details: json!({"crop": "Sugarcane", "season": "RABI"}),
    }
}

fn approve(rate: Option<i64>) -> ReviewInput {
    ReviewInput {
        decision: Decision::Approved,
        remark: None,
        rate_per_hectare_paise: rate,
        expected_version: None,
    }
}

/// A generated password only unlocks `me` and `change_password`
#[tokio::test]
async fn test_first_login_requires_password_change() {
    let office = Office::open().await;
    office
        .services()
        .users
        .create(
            &office.talati,
            new_user(Role::Farmer, "Suresh Bhosale", "suresh@example.in", "9123456780", None),
        )
        .await
        .unwrap();
    let (_server, url) = serve(&office, 5).await;

    let mut client = KissanClient::connect(&url).await.unwrap();
    let response = client
        .login("suresh@example.in", "Farmer@05031985")
        .await
        .unwrap();
    assert!(response.must_change_password);
    assert_eq!(response.user.role, Role::Farmer);
    assert_eq!(client.token(), Some(response.token.as_str()));

    let me = client.me().await.unwrap();
    assert_eq!(me.email, "suresh@example.in");

    let err = client.submit_application(&form12()).await.unwrap_err();
    assert!(err.is_password_change_required());
    assert_eq!(err.code(), Some(code::PASSWORD_CHANGE_REQUIRED));

    client
        .change_password("Farmer@05031985", "Suresh2025pass")
        .await
        .unwrap();

    let view = client.submit_application(&form12()).await.unwrap();
    assert_eq!(view.application.reference_no, "F12/2025/00001");
    assert_eq!(view.status, ApplicationStatus::Submitted);
    assert_eq!(view.pending_role, Some(Role::Talati));

    println!("✅ First login gated until password change");
}

#[tokio::test]
async fn test_tokens_and_logout() {
    let office = Office::open().await;
    let (_server, url) = serve(&office, 5).await;

    let err = KissanClient::connect(&url)
        .await
        .unwrap()
        .with_token("not-a-session")
        .me()
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(err.code(), Some(code::UNAUTHORIZED));

    // Wrong credentials look the same whether or not the account exists
    let mut anonymous = KissanClient::connect(&url).await.unwrap();
    let unknown = anonymous.login("nobody@example.in", PASSWORD).await.unwrap_err();
    let wrong = anonymous.login(FARMER_EMAIL, "wrong-password1").await.unwrap_err();
    assert_eq!(unknown.code(), Some(code::UNAUTHORIZED));
    assert_eq!(unknown.to_string(), wrong.to_string());

    let mut client = login(&url, FARMER_EMAIL, PASSWORD).await;
    let token = client.token().unwrap().to_string();
    assert_eq!(client.me().await.unwrap().email, FARMER_EMAIL);

    client.logout().await.unwrap();
    assert!(client.token().is_none());
    assert!(matches!(client.me().await, Err(SdkError::NotLoggedIn)));

    let stale = KissanClient::connect(&url).await.unwrap().with_token(token);
    assert_eq!(stale.me().await.unwrap_err().code(), Some(code::UNAUTHORIZED));
}

#[tokio::test]
async fn test_repeated_login_failures_are_throttled() {
    let office = Office::open().await;
    let (_server, url) = serve(&office, 2).await;
    let mut client = KissanClient::connect(&url).await.unwrap();

    for _ in 0..2 {
        let err = client.login(FARMER_EMAIL, "wrong-password1").await.unwrap_err();
        assert_eq!(err.code(), Some(code::UNAUTHORIZED));
    }

    // Even the right password waits out the window
    let err = client.login(FARMER_EMAIL, PASSWORD).await.unwrap_err();
    assert_eq!(err.code(), Some(code::THROTTLED));

    // Other identifiers are unaffected
    client.login("talati@example.in", PASSWORD).await.unwrap();
}

/// Reformatting the mobile number does not buy extra guesses
#[tokio::test]
async fn test_login_throttle_counts_every_mobile_spelling() {
    let office = Office::open().await;
    let (_server, url) = serve(&office, 2).await;
    let mut client = KissanClient::connect(&url).await.unwrap();

    for spelling in ["9876543210", "+91 98765 43210"] {
        let err = client.login(spelling, "wrong-password1").await.unwrap_err();
        assert_eq!(err.code(), Some(code::UNAUTHORIZED));
    }

    for spelling in ["09876543210", "9876-543210", "+919876543210"] {
        let err = client.login(spelling, "wrong-password1").await.unwrap_err();
        assert_eq!(err.code(), Some(code::THROTTLED), "{} got through", spelling);
    }

    let err = client.login("98765 43210", PASSWORD).await.unwrap_err();
    assert_eq!(err.code(), Some(code::THROTTLED));
}

/// Submit, review, bill and collect entirely through the SDK
#[tokio::test]
async fn test_application_lifecycle_over_rpc() {
    let office = Office::open().await;
    let (_server, url) = serve(&office, 5).await;

    let farmer = login(&url, FARMER_EMAIL, PASSWORD).await;
    let talati = login(&url, "talati@example.in", PASSWORD).await;
    let engineer = login(&url, "engineer@example.in", PASSWORD).await;
    let outsider = login(&url, "talati2@example.in", PASSWORD).await;

    let mut bad = form12();
    bad.details = json!({"crop": "Sugarcane", "season": "MONSOON"});
    let err = farmer.submit_application(&bad).await.unwrap_err();
    assert_eq!(err.code(), Some(code::VALIDATION_ERROR));

    let view = farmer.submit_application(&form12()).await.unwrap();
    let id = view.application.id.clone();

    let err = talati.get_application("no-such-application").await.unwrap_err();
    assert_eq!(err.code(), Some(code::NOT_FOUND));

    let err = outsider.review_application(&id, &approve(None)).await.unwrap_err();
    assert_eq!(err.code(), Some(code::FORBIDDEN));

    let queue = talati
        .list_applications(&ApplicationFilter {
            pending_for_me: true,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(queue.total, 1);
    assert_eq!(queue.items[0].application.id, id);

    let view = talati.review_application(&id, &approve(None)).await.unwrap();
    assert_eq!(view.status, ApplicationStatus::UnderReview);
    assert_eq!(view.pending_role, Some(Role::Engineer));

    let view = engineer
        .review_application(&id, &approve(Some(350_000)))
        .await
        .unwrap();
    assert_eq!(view.status, ApplicationStatus::Approved);
    assert_eq!(view.application.demand_paise, Some(700_000));

    let err = talati
        .record_payment(&RecordPayment {
            application_id: id.clone(),
            amount_paise: 900_000,
            mode: PaymentMode::Cash,
            reference: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(code::CONFLICT));

    let receipt = talati
        .record_payment(&RecordPayment {
            application_id: id.clone(),
            amount_paise: 700_000,
            mode: PaymentMode::Cash,
            reference: None,
        })
        .await
        .unwrap();
    assert_eq!(receipt.payment.receipt_no, "RCPT/2025/000001");

    let summary = farmer.payment_summary(&id).await.unwrap();
    assert_eq!(summary.status, PaymentStatus::Paid);
    assert_eq!(farmer.list_payments(&id).await.unwrap().len(), 1);

    let err = farmer.withdraw_application(&id).await.unwrap_err();
    assert_eq!(err.code(), Some(code::CONFLICT));

    let dashboard = farmer.dashboard().await.unwrap();
    assert_eq!(dashboard.role, Role::Farmer);
    assert_eq!(dashboard.applications_by_status["APPROVED"], 1);
    assert_eq!(dashboard.total_collected_paise, 700_000);

    println!("✅ Full lifecycle over JSON-RPC");
}
