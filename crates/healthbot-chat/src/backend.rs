//! Client for the analysis backend.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use healthbot_core::config::BackendConfig;
use healthbot_core::{HistoryTurn, Severity};

use crate::error::BackendError;

/// A classified reply from the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub text: String,
    pub severity: Severity,
}

/// The remote service that classifies messages and keeps history.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Classify one user message.
    async fn analyze(&self, message: &str) -> Result<Analysis, BackendError>;

    /// Ask the backend to forget the conversation.
    async fn reset(&self) -> Result<(), BackendError>;
}

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    message: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct AnalyzeReply {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    message: Option<String>,
}

/// Whether an `error` field counts as set: present and not empty.
fn error_is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Interpret an analyze response.
///
/// A set `error` field fails the call whatever the HTTP status; otherwise
/// non-success statuses fail, and a success body must carry `text`.
/// Unrecognized severities become `Unknown`.
pub fn parse_analysis(status: u16, body: &str) -> Result<Analysis, BackendError> {
    let reply: AnalyzeReply = serde_json::from_str(body).map_err(|e| {
        if (200..300).contains(&status) {
            BackendError::Malformed(e.to_string())
        } else {
            BackendError::Status(status)
        }
    })?;

    if let Some(error) = reply.error.as_ref().filter(|e| error_is_set(e)) {
        let reason = match (error, reply.message.as_deref()) {
            (Value::String(s), Some(detail)) => format!("{}: {}", s, detail),
            (Value::String(s), None) => s.clone(),
            (other, _) => other.to_string(),
        };
        return Err(BackendError::Rejected(reason));
    }
    if !(200..300).contains(&status) {
        return Err(BackendError::Status(status));
    }

    let text = reply
        .text
        .ok_or_else(|| BackendError::Malformed("response has no text".to_string()))?;
    let severity = reply
        .severity
        .as_deref()
        .map(Severity::from_wire)
        .unwrap_or(Severity::Unknown);
    Ok(Analysis { text, severity })
}

// =============================================================================
// HTTP implementation
// =============================================================================

/// Talks to a `healthbot-api` compatible server over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self, BackendError> {
        Self::new(
            &config.base_url,
            Duration::from_secs(config.request_timeout_secs.max(1)),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Turns recorded by the backend, oldest first.
    pub async fn history(&self) -> Result<Vec<HistoryTurn>, BackendError> {
        let response = self.client.get(self.endpoint("api/history")).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status(status.as_u16()));
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| BackendError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl AnalysisBackend for HttpBackend {
    async fn analyze(&self, message: &str) -> Result<Analysis, BackendError> {
        tracing::debug!(chars = message.len(), "Sending message for analysis");
        let response = self
            .client
            .post(self.endpoint("api/healthbot"))
            .json(&AnalyzeRequest { message })
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        parse_analysis(status, &body)
    }

    async fn reset(&self) -> Result<(), BackendError> {
        let response = self.client.post(self.endpoint("api/reset")).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(BackendError::Status(status.as_u16()))
        }
    }
}

// =============================================================================
// Mock implementation
// =============================================================================

type MockReply = Result<Analysis, BackendError>;

/// Scripted backend for tests.
///
/// Replies are returned in push order; with the queue empty every message
/// is answered with the fallback reply.
#[derive(Debug)]
pub struct MockBackend {
    replies: Mutex<std::collections::VecDeque<MockReply>>,
    fallback: Analysis,
    delay: Option<Duration>,
    fail_reset: bool,
    received: Mutex<Vec<String>>,
    resets: Mutex<usize>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            replies: Mutex::new(Default::default()),
            fallback: Analysis {
                text: "Monitor and rest.".to_string(),
                severity: Severity::Low,
            },
            delay: None,
            fail_reset: false,
            received: Mutex::new(Vec::new()),
            resets: Mutex::new(0),
        }
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every analyze and reset call, to observe the in-flight state.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_failing_reset(mut self) -> Self {
        self.fail_reset = true;
        self
    }

    pub fn push_reply(&self, text: &str, severity: Severity) {
        self.push(Ok(Analysis {
            text: text.to_string(),
            severity,
        }));
    }

    pub fn push_error(&self, error: BackendError) {
        self.push(Err(error));
    }

    fn push(&self, reply: MockReply) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }

    /// Messages the backend was asked to analyze.
    pub fn received(&self) -> Vec<String> {
        self.received.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn reset_count(&self) -> usize {
        self.resets.lock().map(|r| *r).unwrap_or_default()
    }
}

#[async_trait]
impl AnalysisBackend for MockBackend {
    async fn analyze(&self, message: &str) -> Result<Analysis, BackendError> {
        if let Ok(mut received) = self.received.lock() {
            received.push(message.to_string());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.replies.lock().ok().and_then(|mut r| r.pop_front());
        next.unwrap_or_else(|| Ok(self.fallback.clone()))
    }

    async fn reset(&self) -> Result<(), BackendError> {
        if let Ok(mut resets) = self.resets.lock() {
            *resets += 1;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_reset {
            return Err(BackendError::Transport("connection refused".to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
