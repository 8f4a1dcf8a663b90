//! Anthropic Messages API oracle
//!
//! Sends the prompt variant as the `system` field and the document as a
//! single user message. The reply's `stop_reason` of `max_tokens` is the
//! length-ceiling signal the extraction pipeline recovers from.

use crate::LlmError;
use async_trait::async_trait;
use lectio_domain::{Oracle, OracleRequest, OracleResponse, StopReason};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Default Messages API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com";

/// API version header value
pub const API_VERSION: &str = "2023-06-01";

/// Environment variable consulted for the API key
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Default timeout for a single request (5 minutes)
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Default number of retry attempts
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Oracle backed by the Anthropic Messages API
pub struct AnthropicOracle {
    endpoint: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
    max_retries: u32,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl MessagesResponse {
    fn into_oracle_response(self) -> OracleResponse {
        let text: String = self
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();

        let stop_reason = match self.stop_reason.as_deref() {
            None | Some("end_turn") | Some("stop_sequence") => StopReason::Completed,
            Some("max_tokens") => StopReason::LengthLimit,
            Some(other) => StopReason::Other(other.to_string()),
        };

        OracleResponse {
            text: if text.is_empty() { None } else { Some(text) },
            stop_reason,
        }
    }
}

impl AnthropicOracle {
    /// Create an oracle with an explicit API key
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: model.into(),
            api_key: api_key.into(),
            client: build_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Create an oracle reading the key from `ANTHROPIC_API_KEY`
    pub fn from_env(model: impl Into<String>) -> Result<Self, LlmError> {
        Self::from_env_var(API_KEY_ENV, model)
    }

    /// Create an oracle reading the key from the named environment variable
    pub fn from_env_var(var: &str, model: impl Into<String>) -> Result<Self, LlmError> {
        let key = std::env::var(var)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| LlmError::MissingApiKey(var.to_string()))?;
        Ok(Self::new(key, model))
    }

    /// Override the API endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the maximum number of retry attempts
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the HTTP timeout for a single attempt
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_client(timeout);
        self
    }

    async fn send(&self, request: &OracleRequest) -> Result<OracleResponse, LlmError> {
        let url = format!("{}/v1/messages", self.endpoint.trim_end_matches('/'));
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: request.max_output_tokens,
            system: &request.system,
            messages: vec![Message {
                role: "user",
                content: &request.user,
            }],
        };

        let mut attempts = 0;
        let mut last_error = None;

        while attempts < self.max_retries.max(1) {
            let result = self
                .client
                .post(&url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", API_VERSION)
                .json(&body)
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    return response
                        .json::<MessagesResponse>()
                        .await
                        .map(MessagesResponse::into_oracle_response)
                        .map_err(|e| {
                            LlmError::InvalidResponse(format!("Failed to parse response: {}", e))
                        });
                }
                Ok(response) => {
                    let status = response.status();
                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(LlmError::ModelNotAvailable(self.model.clone()));
                    }
                    let error_text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    last_error = Some(if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        LlmError::RateLimitExceeded
                    } else {
                        LlmError::Communication(format!("HTTP {}: {}", status, error_text))
                    });
                }
                Err(e) => {
                    last_error = Some(LlmError::Communication(format!("Request failed: {}", e)));
                }
            }

            attempts += 1;
            if attempts < self.max_retries {
                let delay = Duration::from_secs(2u64.pow(attempts - 1));
                warn!("Anthropic request failed (attempt {}), retrying in {:?}", attempts, delay);
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error
            .unwrap_or_else(|| LlmError::Communication("Max retries exceeded".to_string())))
    }
}

#[async_trait]
impl Oracle for AnthropicOracle {
    type Error = LlmError;

    async fn generate(&self, request: OracleRequest) -> Result<OracleResponse, Self::Error> {
        debug!(
            "Anthropic generate: model={}, prompt {} chars, max_tokens {}",
            self.model,
            request.user.len(),
            request.max_output_tokens
        );
        self.send(&request).await
    }
}

fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}
