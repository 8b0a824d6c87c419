//! In-process scripted backend for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::{json, Value};

use super::{AiBackend, FragmentStream, GatewayError};
use crate::models::{AnalysisKind, ChatContext, ChatMessage};

#[derive(Debug, Clone)]
pub enum Step {
    Text(String),
    /// Emit the user's message back as a fragment
    Echo,
    Delay(Duration),
    Fail(GatewayError),
}

impl Step {
    pub fn text(text: &str) -> Self {
        Step::Text(text.to_string())
    }

    pub fn delay(duration: Duration) -> Self {
        Step::Delay(duration)
    }
}

/// Plays the same script for every call.
pub struct ScriptedBackend {
    steps: Vec<Step>,
    live: Arc<AtomicUsize>,
    opened: Arc<AtomicUsize>,
    equity: Value,
}

/// Decrements the live-stream counter when the stream is dropped.
struct LiveGuard(Arc<AtomicUsize>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedBackend {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            live: Arc::new(AtomicUsize::new(0)),
            opened: Arc::new(AtomicUsize::new(0)),
            equity: json!({"heatmap": []}),
        }
    }

    pub fn with_equity(mut self, equity: Value) -> Self {
        self.equity = equity;
        self
    }

    /// Streams opened and not yet dropped.
    pub fn live_streams(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.live)
    }

    /// Streams opened in total.
    pub fn opened_streams(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.opened)
    }

    async fn run_to_end(&self, message: &str) -> Result<String, GatewayError> {
        let mut out = String::new();
        for step in &self.steps {
            match step {
                Step::Text(t) => out.push_str(t),
                Step::Echo => out.push_str(message),
                Step::Delay(d) => tokio::time::sleep(*d).await,
                Step::Fail(e) => return Err(e.clone()),
            }
        }
        Ok(out)
    }
}

impl AiBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn chat<'a>(
        &'a self,
        _context: &'a ChatContext,
        _history: &'a [ChatMessage],
        message: &'a str,
    ) -> BoxFuture<'a, Result<String, GatewayError>> {
        self.run_to_end(message).boxed()
    }

    fn chat_stream<'a>(
        &'a self,
        _context: &'a ChatContext,
        _history: &'a [ChatMessage],
        message: &'a str,
    ) -> BoxFuture<'a, Result<FragmentStream, GatewayError>> {
        self.live.fetch_add(1, Ordering::SeqCst);
        self.opened.fetch_add(1, Ordering::SeqCst);
        let guard = LiveGuard(Arc::clone(&self.live));
        let steps = self.steps.clone();
        let message = message.to_string();

        async move {
            let stream = futures_util::stream::unfold(
                (steps.into_iter(), guard),
                move |(mut steps, guard)| {
                    let message = message.clone();
                    async move {
                        loop {
                            match steps.next()? {
                                Step::Text(t) => return Some((Ok(t), (steps, guard))),
                                Step::Echo => return Some((Ok(message), (steps, guard))),
                                Step::Delay(d) => tokio::time::sleep(d).await,
                                Step::Fail(e) => return Some((Err(e), (steps, guard))),
                            }
                        }
                    }
                },
            );
            Ok(Box::pin(stream) as FragmentStream)
        }
        .boxed()
    }

    fn analyze<'a>(
        &'a self,
        kind: AnalysisKind,
        query: &'a str,
        _context: &'a Value,
    ) -> BoxFuture<'a, Result<String, GatewayError>> {
        async move {
            let text = self.run_to_end(query).await?;
            Ok(format!("{:?}: {}{}", kind, query, text))
        }
        .boxed()
    }

    fn equity<'a>(&'a self, _county: &'a str) -> BoxFuture<'a, Result<Value, GatewayError>> {
        async move {
            self.run_to_end("").await?;
            Ok(self.equity.clone())
        }
        .boxed()
    }

    fn health(&self) -> BoxFuture<'_, bool> {
        async { true }.boxed()
    }
}
