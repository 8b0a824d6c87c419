//! Adapter for the intermediary tutoring/analysis microservice.

use futures_util::future::BoxFuture;
use futures_util::{FutureExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{check_status, sse, AiBackend, FragmentStream, GatewayError};
use crate::models::{AnalysisKind, ChatContext, ChatMessage};

/// Student context as the microservice expects it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireStudentContext<'a> {
    grade_level: u8,
    current_subject: &'a str,
    resource_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    teacher_customization: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireChatRequest<'a> {
    message: &'a str,
    student_context: WireStudentContext<'a>,
    stream_response: bool,
}

#[derive(Debug, Deserialize)]
struct WireChatResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireAnalysisRequest<'a> {
    query: &'a str,
    school_id: &'a str,
    context_data: &'a Value,
    analysis_type: AnalysisKind,
}

#[derive(Debug, Deserialize)]
struct WireAnalysisResponse {
    #[serde(default)]
    analysis: String,
}

/// Talks to `{base}/tutor/...` and `{base}/analysis/...`.
pub struct ServiceBackend {
    client: reqwest::Client,
    base_url: String,
}

impl ServiceBackend {
    pub fn new(client: reqwest::Client, base_url: &str) -> Result<Self, GatewayError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(GatewayError::config(
                "AI service URL not configured. Please set SYNCSENTA_AI_SERVICE_URL",
            ));
        }
        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn chat_request<'a>(
        context: &'a ChatContext,
        message: &'a str,
        stream: bool,
    ) -> WireChatRequest<'a> {
        WireChatRequest {
            message,
            student_context: WireStudentContext {
                grade_level: context.grade_level,
                current_subject: &context.subject,
                resource_level: context.resource_level.as_str().to_ascii_uppercase(),
                teacher_customization: context.customization.as_deref(),
            },
            stream_response: stream,
        }
    }
}

impl AiBackend for ServiceBackend {
    fn name(&self) -> &'static str {
        "service"
    }

    fn chat<'a>(
        &'a self,
        context: &'a ChatContext,
        _history: &'a [ChatMessage],
        message: &'a str,
    ) -> BoxFuture<'a, Result<String, GatewayError>> {
        async move {
            let response = self
                .client
                .post(self.url("/tutor/chat"))
                .json(&Self::chat_request(context, message, false))
                .send()
                .await?;
            let body: WireChatResponse = check_status(response)?.json().await?;
            Ok(body.response)
        }
        .boxed()
    }

    fn chat_stream<'a>(
        &'a self,
        context: &'a ChatContext,
        _history: &'a [ChatMessage],
        message: &'a str,
    ) -> BoxFuture<'a, Result<FragmentStream, GatewayError>> {
        async move {
            let response = self
                .client
                .post(self.url("/tutor/chat/stream"))
                .json(&Self::chat_request(context, message, true))
                .send()
                .await?;
            let response = check_status(response)?;

            let fragments = sse::data_payloads(response).filter(|item| {
                futures_util::future::ready(!matches!(item, Ok(text) if text.is_empty()))
            });
            Ok(Box::pin(fragments) as FragmentStream)
        }
        .boxed()
    }

    fn analyze<'a>(
        &'a self,
        kind: AnalysisKind,
        query: &'a str,
        context: &'a Value,
    ) -> BoxFuture<'a, Result<String, GatewayError>> {
        async move {
            let school_id = context
                .get("schoolId")
                .or_else(|| context.get("county"))
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            let request = WireAnalysisRequest {
                query,
                school_id,
                context_data: context,
                analysis_type: kind,
            };
            let response = self
                .client
                .post(self.url(&format!("/analysis/{}", kind.endpoint())))
                .json(&request)
                .send()
                .await?;
            let body: WireAnalysisResponse = check_status(response)?.json().await?;
            Ok(body.analysis)
        }
        .boxed()
    }

    fn equity<'a>(&'a self, county: &'a str) -> BoxFuture<'a, Result<Value, GatewayError>> {
        async move {
            let response = self
                .client
                .post(self.url("/analysis/equity"))
                .json(&json!({ "county": county }))
                .send()
                .await?;
            let body: Value = check_status(response)?.json().await?;
            Ok(body)
        }
        .boxed()
    }

    fn health(&self) -> BoxFuture<'_, bool> {
        async move {
            let (tutor, analysis) = tokio::join!(
                self.client.get(self.url("/tutor/health")).send(),
                self.client.get(self.url("/analysis/health")).send(),
            );
            match (tutor, analysis) {
                (Ok(t), Ok(a)) => t.status().is_success() && a.status().is_success(),
                (t, a) => {
                    tracing::warn!(
                        "AI service health check failed: tutor={:?} analysis={:?}",
                        t.err(),
                        a.err()
                    );
                    false
                }
            }
        }
        .boxed()
    }
}
