//! Lectio LLM Provider Layer
//!
//! Implementations of the `Oracle` trait from `lectio-domain`.
//!
//! # Providers
//!
//! - `MockOracle`: Deterministic scripted oracle for testing
//! - `OllamaOracle`: Local Ollama API integration
//! - `AnthropicOracle`: Anthropic Messages API integration
//!
//! # Examples
//!
//! ```
//! use lectio_domain::{Oracle, OracleRequest};
//! use lectio_llm::MockOracle;
//!
//! # tokio_test::block_on(async {
//! let oracle = MockOracle::new(r#"{"title": "Romans"}"#);
//! let reply = oracle
//!     .generate(OracleRequest::new("system", "document", 1024))
//!     .await
//!     .unwrap();
//! assert_eq!(reply.text.as_deref(), Some(r#"{"title": "Romans"}"#));
//! # });
//! ```

#![warn(missing_docs)]

pub mod anthropic;
pub mod ollama;

use async_trait::async_trait;
use lectio_domain::{Oracle, OracleRequest, OracleResponse, StopReason};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

pub use anthropic::AnthropicOracle;
pub use ollama::OllamaOracle;

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// No API key configured for a hosted provider
    #[error("Missing API key: set {0}")]
    MissingApiKey(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

/// One scripted reply returned by [`MockOracle`]
#[derive(Debug, Clone)]
pub struct MockReply {
    text: Option<String>,
    stop_reason: StopReason,
    delay: Option<Duration>,
    fail: bool,
}

impl MockReply {
    /// A normally completed reply
    pub fn completed(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            stop_reason: StopReason::Completed,
            delay: None,
            fail: false,
        }
    }

    /// A reply cut off at the output ceiling
    pub fn truncated(text: impl Into<String>) -> Self {
        Self {
            stop_reason: StopReason::LengthLimit,
            ..Self::completed(text)
        }
    }

    /// A reply with no text block
    pub fn empty() -> Self {
        Self {
            text: None,
            ..Self::completed("")
        }
    }

    /// A transport-level failure
    pub fn error() -> Self {
        Self {
            fail: true,
            ..Self::empty()
        }
    }

    /// Wait before replying
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Debug, Clone)]
enum Matcher {
    User(String),
    System(String),
}

impl Matcher {
    fn matches(&self, request: &OracleRequest) -> bool {
        match self {
            Matcher::User(needle) => request.user.contains(needle.as_str()),
            Matcher::System(needle) => request.system.contains(needle.as_str()),
        }
    }
}

/// Mock oracle for deterministic testing
///
/// Replies are chosen in this order: the next queued reply, then the first
/// rule whose needle occurs in the request, then the default reply. Every
/// request is recorded. Clones share state.
///
/// # Examples
///
/// ```
/// use lectio_domain::{Oracle, OracleRequest, StopReason};
/// use lectio_llm::{MockOracle, MockReply};
///
/// # tokio_test::block_on(async {
/// let oracle = MockOracle::new("fallback");
/// oracle.add_response("Week 2", MockReply::truncated("{\"title\":"));
///
/// let reply = oracle.generate(OracleRequest::new("sys", "Week 2: Hope", 100)).await.unwrap();
/// assert_eq!(reply.stop_reason, StopReason::LengthLimit);
///
/// let reply = oracle.generate(OracleRequest::new("sys", "Week 3", 100)).await.unwrap();
/// assert_eq!(reply.text.as_deref(), Some("fallback"));
/// assert_eq!(oracle.call_count(), 2);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct MockOracle {
    default_reply: MockReply,
    rules: Arc<Mutex<Vec<(Matcher, MockReply)>>>,
    queue: Arc<Mutex<VecDeque<MockReply>>>,
    requests: Arc<Mutex<Vec<OracleRequest>>>,
}

impl MockOracle {
    /// Create a MockOracle with a fixed completed reply for all requests
    pub fn new(response: impl Into<String>) -> Self {
        Self::with_default(MockReply::completed(response))
    }

    /// Create a MockOracle with an arbitrary default reply
    pub fn with_default(reply: MockReply) -> Self {
        Self {
            default_reply: reply,
            rules: Arc::new(Mutex::new(Vec::new())),
            queue: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Reply with `reply` when the user message contains `needle`
    pub fn add_response(&self, needle: impl Into<String>, reply: MockReply) {
        self.rules
            .lock()
            .unwrap()
            .push((Matcher::User(needle.into()), reply));
    }

    /// Reply with `reply` when the system instruction contains `needle`
    pub fn add_system_response(&self, needle: impl Into<String>, reply: MockReply) {
        self.rules
            .lock()
            .unwrap()
            .push((Matcher::System(needle.into()), reply));
    }

    /// Fail requests whose user message contains `needle`
    pub fn add_error(&self, needle: impl Into<String>) {
        self.add_response(needle, MockReply::error());
    }

    /// Queue a reply for the next unconsumed call, ahead of any rule
    pub fn push_reply(&self, reply: MockReply) {
        self.queue.lock().unwrap().push_back(reply);
    }

    /// Get the number of times generate was called
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every request received so far, in arrival order
    pub fn requests(&self) -> Vec<OracleRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Forget recorded requests
    pub fn reset(&self) {
        self.requests.lock().unwrap().clear();
    }

    fn select_reply(&self, request: &OracleRequest) -> MockReply {
        if let Some(reply) = self.queue.lock().unwrap().pop_front() {
            return reply;
        }
        self.rules
            .lock()
            .unwrap()
            .iter()
            .find(|(matcher, _)| matcher.matches(request))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.default_reply.clone())
    }
}

impl Default for MockOracle {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

#[async_trait]
impl Oracle for MockOracle {
    type Error = LlmError;

    async fn generate(&self, request: OracleRequest) -> Result<OracleResponse, Self::Error> {
        let reply = self.select_reply(&request);
        self.requests.lock().unwrap().push(request);

        if let Some(delay) = reply.delay {
            tokio::time::sleep(delay).await;
        }
        if reply.fail {
            return Err(LlmError::Other("Mock error".to_string()));
        }

        Ok(OracleResponse {
            text: reply.text,
            stop_reason: reply.stop_reason,
        })
    }
}
