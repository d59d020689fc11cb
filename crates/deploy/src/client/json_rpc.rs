//! Minimal Ethereum JSON-RPC transport.

use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::ChainError;

/// Timeout for a single RPC request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Attempts for idempotent queries before giving up.
const MAX_QUERY_ATTEMPTS: usize = 4;

/// Error from a single JSON-RPC exchange.
#[derive(Debug, thiserror::Error)]
pub(crate) enum RpcError {
    #[error("{method} request failed: {source}")]
    Transport {
        method: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} returned error {code}: {message}")]
    Response {
        method: String,
        code: i64,
        message: String,
    },

    #[error("{method} returned an unexpected payload: {reason}")]
    Decode { method: String, reason: String },
}

impl RpcError {
    /// Whether resending the same request could succeed.
    fn is_transient(&self) -> bool {
        match self {
            Self::Transport { source, .. } => {
                source.is_timeout() || source.is_connect() || source.is_request()
            }
            Self::Response { .. } | Self::Decode { .. } => false,
        }
    }

    /// Classify a failed read-only query.
    pub(crate) fn into_query_error(self) -> ChainError {
        ChainError::Connectivity(self.to_string())
    }
}

/// JSON-RPC endpoint bound to one URL.
#[derive(Debug, Clone)]
pub(crate) struct JsonRpc {
    http: reqwest::Client,
    url: Url,
}

impl JsonRpc {
    pub(crate) fn new(url: Url) -> Result<Self, ChainError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ChainError::Connectivity(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { http, url })
    }

    pub(crate) fn url(&self) -> &Url {
        &self.url
    }

    /// Make a JSON-RPC call and deserialize the result. Never retried.
    pub(crate) async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, RpcError> {
        let response = self
            .http
            .post(self.url.clone())
            .json(&serde_json::json!({
                "jsonrpc": "2.0",
                "method": method,
                "params": params,
                "id": 1
            }))
            .send()
            .await
            .map_err(|source| RpcError::Transport {
                method: method.to_string(),
                source,
            })?;

        let body: Value = response.json().await.map_err(|source| RpcError::Transport {
            method: method.to_string(),
            source,
        })?;

        decode_response(method, body)
    }

    /// Make an idempotent JSON-RPC call, retrying transient transport failures.
    pub(crate) async fn query<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, RpcError> {
        (|| self.call(method, params.clone()))
            .retry(ExponentialBuilder::default().with_max_times(MAX_QUERY_ATTEMPTS))
            .when(RpcError::is_transient)
            .notify(|err, after| {
                tracing::debug!(error = %err, retry_in = ?after, "RPC query failed, retrying...");
            })
            .await
    }
}

/// Extract `result` from a JSON-RPC response body.
fn decode_response<T: DeserializeOwned>(method: &str, body: Value) -> Result<T, RpcError> {
    if let Some(error) = body.get("error") {
        return Err(RpcError::Response {
            method: method.to_string(),
            code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
        });
    }

    let result = body.get("result").cloned().ok_or_else(|| RpcError::Decode {
        method: method.to_string(),
        reason: "no result in response".to_string(),
    })?;

    serde_json::from_value(result).map_err(|e| RpcError::Decode {
        method: method.to_string(),
        reason: e.to_string(),
    })
}
