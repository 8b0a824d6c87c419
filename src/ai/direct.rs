//! Adapter for an OpenAI-compatible chat completions API.

use futures_util::future::BoxFuture;
use futures_util::{future, FutureExt, StreamExt};
use serde_json::{json, Value};

use super::{check_status, prompts, sse, AiBackend, FragmentStream, GatewayError};
use crate::models::{AnalysisKind, ChatContext, ChatMessage, ChatRole};

/// Calls `{base}/chat/completions` directly with a bearer key.
pub struct DirectBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl DirectBackend {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        api_key: Option<&str>,
        model: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<Self, GatewayError> {
        let api_key = api_key
            .map(str::trim)
            .filter(|k| !k.is_empty() && !k.contains("your_openai_api_key"))
            .ok_or_else(|| {
                GatewayError::config("API key not configured. Please set SYNCSENTA_AI_API_KEY")
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            max_tokens,
            temperature,
        })
    }

    /// Request body with the system prompt first, then the earlier exchanges
    /// in order, then the new user message.
    fn body(&self, system: &str, history: &[ChatMessage], user: &str, stream: bool) -> Value {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(json!({ "role": "system", "content": system }));
        messages.extend(history.iter().map(|entry| {
            let role = match entry.role {
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
            };
            json!({ "role": role, "content": entry.text })
        }));
        messages.push(json!({ "role": "user", "content": user }));

        json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "stream": stream,
        })
    }

    async fn post(&self, body: &Value) -> Result<reqwest::Response, GatewayError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;
        check_status(response)
    }

    async fn complete(&self, body: Value) -> Result<String, GatewayError> {
        let payload: Value = self.post(&body).await?.json().await?;
        message_content(&payload)
    }
}

/// `choices[0].message.content` of a completion.
fn message_content(payload: &Value) -> Result<String, GatewayError> {
    payload
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| GatewayError::parse("Completion had no message content"))
}

/// `choices[0].delta.content` of a streamed chunk; empty when the chunk carries none.
fn delta_content(data: &str) -> Result<String, GatewayError> {
    let chunk: Value = serde_json::from_str(data)
        .map_err(|e| GatewayError::parse(format!("Malformed stream chunk: {}", e)))?;
    Ok(chunk
        .pointer("/choices/0/delta/content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string())
}

impl AiBackend for DirectBackend {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn chat<'a>(
        &'a self,
        context: &'a ChatContext,
        history: &'a [ChatMessage],
        message: &'a str,
    ) -> BoxFuture<'a, Result<String, GatewayError>> {
        let body = self.body(&prompts::tutor_system_prompt(context), history, message, false);
        self.complete(body).boxed()
    }

    fn chat_stream<'a>(
        &'a self,
        context: &'a ChatContext,
        history: &'a [ChatMessage],
        message: &'a str,
    ) -> BoxFuture<'a, Result<FragmentStream, GatewayError>> {
        let body = self.body(&prompts::tutor_system_prompt(context), history, message, true);
        async move {
            let response = self.post(&body).await?;
            let fragments = sse::data_payloads(response).filter_map(|item| {
                future::ready(match item.and_then(|data| delta_content(&data)) {
                    Ok(text) if text.is_empty() => None,
                    other => Some(other),
                })
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
        let system = format!(
            "{}\n\nYou are performing data analysis. Be thorough and provide insights.",
            prompts::analysis_system_prompt(kind)
        );
        let body = self.body(&system, &[], &prompts::analysis_user_prompt(query, context), false);
        self.complete(body).boxed()
    }

    fn equity<'a>(&'a self, county: &'a str) -> BoxFuture<'a, Result<Value, GatewayError>> {
        let mut body = self.body(
            prompts::EQUITY_SYSTEM_PROMPT,
            &[],
            &prompts::equity_prompt(county),
            false,
        );
        body["response_format"] = json!({ "type": "json_object" });
        async move {
            let text = self.complete(body).await?;
            serde_json::from_str(&text).map_err(|e| {
                tracing::error!("Equity analysis was not valid JSON: {} (raw: {})", e, text);
                GatewayError::parse("AI response was not valid JSON.")
            })
        }
        .boxed()
    }

    fn health(&self) -> BoxFuture<'_, bool> {
        async move {
            match self
                .client
                .get(format!("{}/models", self.base_url))
                .bearer_auth(&self.api_key)
                .send()
                .await
            {
                Ok(response) => response.status().is_success(),
                Err(e) => {
                    tracing::warn!("AI model API health check failed: {}", e);
                    false
                }
            }
        }
        .boxed()
    }
}
