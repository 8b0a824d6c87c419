//! AI gateway.
//!
//! Two interchangeable remote surfaces sit behind the [`AiBackend`] trait: the
//! intermediary tutoring/analysis microservice and an OpenAI-compatible chat
//! completions API. Consumers only see [`AiGateway`] and [`TutorChat`].

mod direct;
#[cfg(test)]
pub(crate) mod fake;
mod gateway;
mod prompts;
mod service;
mod sse;

pub use direct::DirectBackend;
pub use gateway::*;
pub use service::ServiceBackend;

use std::pin::Pin;

use futures_util::future::BoxFuture;
use futures_util::Stream;
use serde_json::Value;

use crate::models::{AnalysisKind, ChatContext, ChatMessage};

/// Failure category for a gateway call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    /// Endpoint or key not configured
    Config,
    /// Network-level failure
    Transport,
    /// Non-2xx status from the remote
    Upstream,
    /// Payload was not the structured data we expected
    Parse,
    /// Request exceeded the configured bound
    Timeout,
}

#[derive(Debug, Clone)]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub message: String,
}

impl GatewayError {
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Config, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Transport, message)
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Upstream, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Parse, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Timeout, message)
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for GatewayError {}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        tracing::error!("AI backend request failed: {:?}", err);
        if err.is_timeout() {
            GatewayError::timeout(format!("AI backend timed out: {}", err))
        } else if err.is_decode() {
            GatewayError::parse(format!("Malformed AI backend payload: {}", err))
        } else if let Some(status) = err.status() {
            GatewayError::upstream(format!("AI backend returned {}", status))
        } else {
            GatewayError::transport(format!("AI backend unreachable: {}", err))
        }
    }
}

/// Lazy, finite, non-restartable sequence of text fragments.
///
/// The stream owns its transport; dropping it mid-way releases the connection.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, GatewayError>> + Send>>;

/// Capability contract every AI surface provides.
pub trait AiBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// One complete tutor reply. `history` holds the earlier exchanges of the
    /// conversation, oldest first; surfaces that keep no history may ignore it.
    fn chat<'a>(
        &'a self,
        context: &'a ChatContext,
        history: &'a [ChatMessage],
        message: &'a str,
    ) -> BoxFuture<'a, Result<String, GatewayError>>;

    /// Tutor reply as fragments in arrival order.
    fn chat_stream<'a>(
        &'a self,
        context: &'a ChatContext,
        history: &'a [ChatMessage],
        message: &'a str,
    ) -> BoxFuture<'a, Result<FragmentStream, GatewayError>>;

    /// Narrative analysis of staff dashboard data.
    fn analyze<'a>(
        &'a self,
        kind: AnalysisKind,
        query: &'a str,
        context: &'a Value,
    ) -> BoxFuture<'a, Result<String, GatewayError>>;

    /// Raw equity heatmap payload (`{"heatmap": [...]}`) for a county.
    fn equity<'a>(&'a self, county: &'a str) -> BoxFuture<'a, Result<Value, GatewayError>>;

    fn health(&self) -> BoxFuture<'_, bool>;
}

/// Turn a non-2xx response into an upstream error.
pub(crate) fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        tracing::error!("AI backend error status: {}", status);
        Err(GatewayError::upstream(format!("AI backend error: {}", status)))
    }
}
