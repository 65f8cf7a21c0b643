//! Kissan Plus Client Implementation

use crate::error::{Result, SdkError};
use crate::types::{
    ApplicationPaymentsRequest, ChangePasswordRequest, IdRequest, LoginRequest, LoginResponse,
    OkResponse, ReviewRequest,
};
use jsonrpsee::core::client::ClientT;
use jsonrpsee::core::params::ObjectParams;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use kissan_core::application::{
    ApplicationFilter, ApplicationPage, ApplicationView, DashboardSummary, PaymentReceipt,
    RecordPayment, SubmitApplication,
};
use kissan_core::domain::{Payment, PaymentSummary, ReviewInput, User};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Kissan Plus Client
///
/// Typed access to the back-office JSON-RPC API. Log in once; the session
/// token is attached to every later call.
///
/// # Example
///
/// ```no_run
/// use kissan_sdk::KissanClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut client = KissanClient::connect("http://127.0.0.1:9530").await?;
/// client.login("9876543210", "Farmer@01011990").await?;
/// let me = client.me().await?;
/// println!("{} ({})", me.full_name, me.role);
/// # Ok(())
/// # }
/// ```
pub struct KissanClient {
    client: HttpClient,
    token: Option<String>,
}

impl KissanClient {
    /// Connect to the server at `url` (e.g. `http://127.0.0.1:9530`)
    pub async fn connect(url: impl AsRef<str>) -> Result<Self> {
        let url = url.as_ref();

        let client = HttpClientBuilder::default()
            .request_timeout(Duration::from_secs(30))
            .build(url)
            .map_err(|e| SdkError::Connection(format!("Failed to create client: {}", e)))?;

        Ok(Self {
            client,
            token: None,
        })
    }

    /// Reuse a token from an earlier login
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    async fn call<P, R>(&self, method: &str, params: &P) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let token = self.token.as_deref().ok_or(SdkError::NotLoggedIn)?;
        let params = object_params(params, Some(token))?;
        Ok(self.client.request(method, params).await?)
    }

    // ---- auth ----

    /// Log in with email or mobile; the session token is kept for later calls
    pub async fn login(&mut self, identifier: &str, password: &str) -> Result<LoginResponse> {
        let params = object_params(
            &LoginRequest {
                identifier,
                password,
            },
            None,
        )?;
        let response: LoginResponse = self.client.request("auth.login.v1", params).await?;
        self.token = Some(response.token.clone());
        Ok(response)
    }

    pub async fn logout(&mut self) -> Result<()> {
        let _: OkResponse = self.call("auth.logout.v1", &Value::Null).await?;
        self.token = None;
        Ok(())
    }

    pub async fn me(&self) -> Result<User> {
        self.call("auth.me.v1", &Value::Null).await
    }

    /// Other sessions of the account are revoked; this one stays valid
    pub async fn change_password(&self, current: &str, new: &str) -> Result<()> {
        let _: OkResponse = self
            .call(
                "auth.change_password.v1",
                &ChangePasswordRequest {
                    current_password: current,
                    new_password: new,
                },
            )
            .await?;
        Ok(())
    }

    // ---- applications ----

    pub async fn submit_application(&self, request: &SubmitApplication) -> Result<ApplicationView> {
        self.call("applications.submit.v1", request).await
    }

    pub async fn get_application(&self, id: &str) -> Result<ApplicationView> {
        self.call("applications.get.v1", &IdRequest { id }).await
    }

    pub async fn list_applications(&self, filter: &ApplicationFilter) -> Result<ApplicationPage> {
        self.call("applications.list.v1", filter).await
    }

    pub async fn review_application(
        &self,
        id: &str,
        input: &ReviewInput,
    ) -> Result<ApplicationView> {
        self.call("applications.review.v1", &ReviewRequest { id, input })
            .await
    }

    pub async fn withdraw_application(&self, id: &str) -> Result<ApplicationView> {
        self.call("applications.withdraw.v1", &IdRequest { id })
            .await
    }

    // ---- payments ----

    pub async fn record_payment(&self, request: &RecordPayment) -> Result<PaymentReceipt> {
        self.call("payments.record.v1", request).await
    }

    pub async fn list_payments(&self, application_id: &str) -> Result<Vec<Payment>> {
        self.call(
            "payments.list.v1",
            &ApplicationPaymentsRequest { application_id },
        )
        .await
    }

    pub async fn payment_summary(&self, application_id: &str) -> Result<PaymentSummary> {
        self.call(
            "payments.summary.v1",
            &ApplicationPaymentsRequest { application_id },
        )
        .await
    }

    // ---- dashboard ----

    pub async fn dashboard(&self) -> Result<DashboardSummary> {
        self.call("dashboard.summary.v1", &Value::Null).await
    }
}

/// Named params from a serializable struct, plus the session token
fn object_params<P: Serialize>(params: &P, token: Option<&str>) -> Result<ObjectParams> {
    let mut object = ObjectParams::new();
    match serde_json::to_value(params)? {
        Value::Object(map) => {
            for (key, value) in map {
                // Unset optionals are left to server defaults
                if !value.is_null() {
                    object.insert(&key, value)?;
                }
            }
        }
        Value::Null => {}
        other => {
            return Err(SdkError::Other(format!(
                "RPC params must be a JSON object, got {}",
                other
            )))
        }
    }
    if let Some(token) = token {
        object.insert("token", token)?;
    }
    Ok(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonrpsee::core::traits::ToRpcParams;
    use kissan_core::domain::Decision;
    use serde_json::json;

    fn to_json(params: ObjectParams) -> Value {
        let raw = params.to_rpc_params().unwrap().unwrap();
        serde_json::from_str(raw.get()).unwrap()
    }

    #[test]
    fn test_review_params_are_flat_with_token() {
        let input = ReviewInput {
            decision: Decision::Denied,
            remark: Some("Survey number mismatch".to_string()),
            rate_per_hectare_paise: None,
            expected_version: Some(1),
        };
        let params = object_params(
            &ReviewRequest {
                id: "app-1",
                input: &input,
            },
            Some("t-1"),
        )
        .unwrap();

        assert_eq!(
            to_json(params),
            json!({
                "id": "app-1",
                "decision": "DENIED",
                "remark": "Survey number mismatch",
                "expected_version": 1,
                "token": "t-1"
            })
        );
    }

    #[test]
    fn test_token_only_params() {
        let params = object_params(&Value::Null, Some("t-2")).unwrap();
        assert_eq!(to_json(params), json!({ "token": "t-2" }));
    }

    #[test]
    fn test_non_object_params_are_rejected() {
        assert!(object_params(&vec![1, 2], None).is_err());
    }

    #[tokio::test]
    async fn test_calls_without_login_fail_fast() {
        let client = KissanClient::connect("http://127.0.0.1:1").await.unwrap();
        let err = client.me().await.unwrap_err();
        assert!(matches!(err, SdkError::NotLoggedIn));
    }
}
