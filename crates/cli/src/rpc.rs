//! Minimal JSON-RPC 2.0 client over HTTP

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error codes the CLI reacts to
pub const UNAUTHORIZED: i32 = 4010;
pub const PASSWORD_CHANGE_REQUIRED: i32 = 4031;

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RPC error ({}): {}", self.code, self.message)?;
        match self.code {
            UNAUTHORIZED => write!(f, "\n  hint: run `kissan login` and export KISSAN_TOKEN"),
            PASSWORD_CHANGE_REQUIRED => write!(f, "\n  hint: run `kissan passwd` first"),
            _ => Ok(()),
        }
    }
}

impl std::error::Error for JsonRpcError {}

pub struct RpcClient {
    url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl RpcClient {
    pub fn new(url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            url: url.into(),
            token,
            http: reqwest::Client::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Call a method that needs no session
    pub async fn call_anonymous(&self, method: &str, params: Value) -> Result<Value> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: 1,
        };

        let response: JsonRpcResponse = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .context("Failed to connect to server")?
            .json()
            .await
            .context("Failed to parse response")?;

        if let Some(error) = response.error {
            return Err(error.into());
        }

        response
            .result
            .ok_or_else(|| anyhow::anyhow!("No result in response"))
    }

    /// Call a method with the session token merged into `params`
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let token = self
            .token
            .as_deref()
            .context("Not logged in: set KISSAN_TOKEN or pass --token")?;
        self.call_anonymous(method, with_token(params, token)).await
    }
}

fn with_token(params: Value, token: &str) -> Value {
    let mut map = match params {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    map.insert("token".to_string(), Value::String(token.to_string()));
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_with_token_merges_into_params() {
        let params = with_token(json!({ "id": "app-1" }), "t-1");
        assert_eq!(params, json!({ "id": "app-1", "token": "t-1" }));

        let params = with_token(Value::Null, "t-2");
        assert_eq!(params, json!({ "token": "t-2" }));
    }

    #[test]
    fn test_error_hint_for_expired_session() {
        let err = JsonRpcError {
            code: UNAUTHORIZED,
            message: "Session expired".to_string(),
        };
        let text = err.to_string();
        assert!(text.starts_with("RPC error (4010): Session expired"));
        assert!(text.contains("kissan login"));
    }
}
