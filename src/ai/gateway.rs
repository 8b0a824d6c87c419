//! Gateway facade: timeouts, tutor chat handles, structured equity results.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use tokio::time::Instant;

use super::{AiBackend, DirectBackend, FragmentStream, GatewayError, ServiceBackend};
use crate::config::{AiBackendKind, AiConfig};
use crate::models::{
    AnalysisKind, ChatContext, ChatMessage, Correlation, HeatmapEntry, ResourceLevel,
};

/// Shown in place of a failed tutor answer.
pub const TUTOR_FALLBACK: &str = "Oops! I had a little trouble thinking. Could you ask me again?";

/// Shown in place of a tutor answer that ran past the time bound.
pub const TUTOR_TIMEOUT: &str =
    "Mwalimu AI is taking too long to answer. Please check your connection and ask again.";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Entry point for every AI call made by the portal.
#[derive(Clone)]
pub struct AiGateway {
    backend: Arc<dyn AiBackend>,
    timeout: Duration,
}

impl AiGateway {
    pub fn new(backend: Arc<dyn AiBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Build the configured backend. Fails with a config error when the
    /// selected surface is missing its endpoint or key.
    pub fn from_config(config: &AiConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::config(format!("Failed to build HTTP client: {}", e)))?;

        let backend: Arc<dyn AiBackend> = match config.backend {
            AiBackendKind::Service => Arc::new(ServiceBackend::new(
                client,
                config.service_url.as_deref().unwrap_or_default(),
            )?),
            AiBackendKind::Direct => Arc::new(DirectBackend::new(
                client,
                &config.base_url,
                config.api_key.as_deref(),
                &config.model,
                config.max_tokens,
                config.temperature,
            )?),
        };

        Ok(Self::new(backend, config.timeout))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Chat handle bound to one tutoring context.
    pub fn tutor(&self, context: ChatContext) -> TutorChat {
        if context.resource_level == ResourceLevel::Low {
            tracing::info!("ADAPT: low-resource mode activated for student tutor");
        }
        TutorChat {
            backend: Arc::clone(&self.backend),
            context,
            timeout: self.timeout,
        }
    }

    pub async fn analyze(
        &self,
        kind: AnalysisKind,
        query: &str,
        context: &Value,
    ) -> Result<String, GatewayError> {
        let deadline = Instant::now() + self.timeout;
        bounded(deadline, self.backend.analyze(kind, query, context)).await
    }

    /// Equity heatmap for a county, validated into fixed-shape records.
    pub async fn equity(&self, county: &str) -> Result<Vec<HeatmapEntry>, GatewayError> {
        let deadline = Instant::now() + self.timeout;
        let raw = bounded(deadline, self.backend.equity(county)).await?;
        parse_heatmap(raw)
    }

    pub async fn health(&self) -> bool {
        let deadline = Instant::now() + self.timeout;
        tokio::time::timeout_at(deadline, self.backend.health())
            .await
            .unwrap_or(false)
    }
}

/// Conversational capability for one tutoring context.
pub struct TutorChat {
    backend: Arc<dyn AiBackend>,
    context: ChatContext,
    timeout: Duration,
}

impl TutorChat {
    pub fn context(&self) -> &ChatContext {
        &self.context
    }

    /// Ask for one complete reply, following the earlier exchanges in `history`.
    pub async fn send(&self, history: &[ChatMessage], text: &str) -> Result<String, GatewayError> {
        let deadline = Instant::now() + self.timeout;
        bounded(deadline, self.backend.chat(&self.context, history, text)).await
    }

    /// Open a fragment stream. The whole exchange, opening included, shares one
    /// deadline; running past it yields a timeout error and ends the stream.
    pub async fn send_stream(
        &self,
        history: &[ChatMessage],
        text: &str,
    ) -> Result<FragmentStream, GatewayError> {
        let deadline = Instant::now() + self.timeout;
        let stream = bounded(
            deadline,
            self.backend.chat_stream(&self.context, history, text),
        )
        .await?;
        Ok(with_deadline(stream, deadline))
    }
}

async fn bounded<T, F>(deadline: Instant, fut: F) -> Result<T, GatewayError>
where
    F: std::future::Future<Output = Result<T, GatewayError>>,
{
    match tokio::time::timeout_at(deadline, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("AI request exceeded its time bound");
            Err(GatewayError::timeout("AI request timed out"))
        }
    }
}

fn with_deadline(stream: FragmentStream, deadline: Instant) -> FragmentStream {
    Box::pin(futures_util::stream::unfold(
        Some(stream),
        move |state| async move {
            let mut stream = state?;
            match tokio::time::timeout_at(deadline, stream.next()).await {
                Ok(Some(item)) => Some((item, Some(stream))),
                Ok(None) => None,
                Err(_) => {
                    tracing::warn!("AI stream exceeded its time bound");
                    Some((Err(GatewayError::timeout("AI stream timed out")), None))
                }
            }
        },
    ))
}

#[derive(Debug, Deserialize)]
struct RawHeatmap {
    heatmap: Vec<RawHeatmapEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawHeatmapEntry {
    ward: String,
    #[serde(alias = "resource_level")]
    resource_level: String,
    #[serde(alias = "avg_score")]
    avg_score: f64,
    correlation: String,
}

fn parse_heatmap(raw: Value) -> Result<Vec<HeatmapEntry>, GatewayError> {
    let raw: RawHeatmap = serde_json::from_value(raw)
        .map_err(|e| GatewayError::parse(format!("Equity payload has the wrong shape: {}", e)))?;

    raw.heatmap
        .into_iter()
        .map(|entry| {
            let resource_level = ResourceLevel::parse(&entry.resource_level).ok_or_else(|| {
                GatewayError::parse(format!("Unknown resource level '{}'", entry.resource_level))
            })?;
            let correlation = Correlation::parse(&entry.correlation).ok_or_else(|| {
                GatewayError::parse(format!("Unknown correlation '{}'", entry.correlation))
            })?;
            if !(0.0..=100.0).contains(&entry.avg_score) {
                return Err(GatewayError::parse(format!(
                    "Average score {} outside 0-100",
                    entry.avg_score
                )));
            }
            Ok(HeatmapEntry {
                ward: entry.ward,
                resource_level,
                avg_score: entry.avg_score,
                correlation,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::fake::{ScriptedBackend, Step};
    use crate::ai::GatewayErrorKind;
    use serde_json::json;

    fn context() -> ChatContext {
        ChatContext::new(5, "Science", ResourceLevel::Medium, None).unwrap()
    }

    #[test]
    fn test_parse_heatmap_accepts_both_casings() {
        let entries = parse_heatmap(json!({
            "heatmap": [
                {"ward": "Kibera", "resource_level": "LOW", "avg_score": 48, "correlation": "strong"},
                {"ward": "Karen", "resourceLevel": "high", "avgScore": 81.5, "correlation": "Weak"}
            ]
        }))
        .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].resource_level, ResourceLevel::Low);
        assert_eq!(entries[1].correlation, Correlation::Weak);
    }

    #[test]
    fn test_parse_heatmap_rejects_bad_values() {
        let bad_level = json!({"heatmap": [
            {"ward": "A", "resource_level": "extreme", "avg_score": 10, "correlation": "weak"}
        ]});
        let bad_score = json!({"heatmap": [
            {"ward": "A", "resource_level": "low", "avg_score": 140, "correlation": "weak"}
        ]});
        let bad_shape = json!({"wards": []});
        for payload in [bad_level, bad_score, bad_shape] {
            assert_eq!(parse_heatmap(payload).unwrap_err().kind, GatewayErrorKind::Parse);
        }
    }

    #[tokio::test]
    async fn test_send_collects_fragments() {
        let backend = ScriptedBackend::new(vec![Step::text("Hello "), Step::text("there")]);
        let gateway = AiGateway::new(Arc::new(backend), Duration::from_secs(5));
        let reply = gateway.tutor(context()).send(&[], "hi").await.unwrap();
        assert_eq!(reply, "Hello there");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_past_deadline_times_out() {
        let backend = ScriptedBackend::new(vec![
            Step::text("Let's "),
            Step::delay(Duration::from_secs(60)),
            Step::text("never"),
        ]);
        let live = backend.live_streams();
        let gateway = AiGateway::new(Arc::new(backend), Duration::from_secs(30));
        let mut stream = gateway.tutor(context()).send_stream(&[], "hi").await.unwrap();

        assert_eq!(stream.next().await.unwrap().unwrap(), "Let's ");
        let err = stream.next().await.unwrap().unwrap_err();
        assert_eq!(err.kind, GatewayErrorKind::Timeout);
        assert!(stream.next().await.is_none());
        assert_eq!(live.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_analysis_times_out() {
        let backend = ScriptedBackend::new(vec![Step::delay(Duration::from_secs(120))]);
        let gateway = AiGateway::new(Arc::new(backend), Duration::from_secs(30));
        let err = gateway
            .analyze(AnalysisKind::CountyStrategic, "q", &json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.kind, GatewayErrorKind::Timeout);
    }
}
