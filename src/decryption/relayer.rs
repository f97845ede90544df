// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Relayer transport
//!
//! The relayer authenticates the signed request, checks the ACL and forwards
//! to the KMS. Its answer is returned raw; schema handling lives in
//! [`super::response`].

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::errors::DecryptFailure;
use super::request::UserDecryptRequest;
use crate::errors::RollError;

const USER_DECRYPT_PATH: &str = "v1/user-decrypt";

#[async_trait]
pub trait RelayerClient: Send + Sync {
    /// Submit a signed user-decrypt request and return the raw JSON answer
    async fn user_decrypt(
        &self,
        request: &UserDecryptRequest,
    ) -> Result<serde_json::Value, DecryptFailure>;

    fn name(&self) -> &'static str;
}

/// Relayer reached over HTTPS
pub struct HttpRelayerClient {
    client: Client,
    endpoint: Url,
    timeout: Duration,
}

impl HttpRelayerClient {
    /// Create a client for the relayer at `base_url`
    ///
    /// # Arguments
    /// * `base_url` - Relayer root, e.g. `https://relayer.testnet.zama.cloud`
    /// * `timeout` - Per-request deadline; exceeding it is a network failure
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RollError> {
        let mut base = Url::parse(base_url)
            .map_err(|e| RollError::Config(format!("invalid relayer url '{}': {}", base_url, e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base
            .join(USER_DECRYPT_PATH)
            .map_err(|e| RollError::Config(format!("invalid relayer url '{}': {}", base_url, e)))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RollError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// Map a non-success HTTP status onto a failure class
fn classify_status(status: StatusCode, body: &str) -> DecryptFailure {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        DecryptFailure::NetworkUnavailable(format!("relayer returned {}", status))
    } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        DecryptFailure::AuthorizationDenied(if body.is_empty() {
            format!("relayer returned {}", status)
        } else {
            body.to_string()
        })
    } else {
        DecryptFailure::MalformedResponse(format!("relayer returned {}: {}", status, body))
    }
}

#[async_trait]
impl RelayerClient for HttpRelayerClient {
    async fn user_decrypt(
        &self,
        request: &UserDecryptRequest,
    ) -> Result<serde_json::Value, DecryptFailure> {
        debug!(
            "POST {} ({} handle(s))",
            self.endpoint,
            request.handle_contract_pairs.len()
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("Accept", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DecryptFailure::NetworkUnavailable(format!(
                        "relayer timed out after {}s",
                        self.timeout.as_secs()
                    ))
                } else {
                    DecryptFailure::NetworkUnavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("relayer rejected user decrypt: {} {}", status, body);
            return Err(classify_status(status, &body));
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| DecryptFailure::malformed(format!("JSON parse error: {}", e)))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
