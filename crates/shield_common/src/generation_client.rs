//! Generation client boundary.
//!
//! A client takes an instruction plus the report schema and returns the raw
//! text of the service's answer. It never parses the document and never
//! retries; both belong to the caller.

use crate::config::{Backend, GenerationSettings};
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use shield_shared::error::ShieldError;
use std::sync::Mutex;
use std::time::Duration;

/// What is sent to the generation service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub instruction: String,
    pub schema: Value,
    pub temperature: f32,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenerationError {
    #[error("generation is disabled in configuration")]
    Disabled,

    #[error("request failed: {0}")]
    Transport(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("API request failed: {code} - {message}")]
    Status { code: u16, message: String },

    #[error("invalid response structure from API: {0}")]
    EmptyResponse(String),
}

impl From<GenerationError> for ShieldError {
    fn from(e: GenerationError) -> Self {
        ShieldError::Network(e.to_string())
    }
}

#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Return the raw document text produced for `request`
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;

    /// Short label for logs
    fn name(&self) -> &str;
}

/// HTTP client for Gemini, Ollama and OpenAI-compatible services
pub struct HttpGenerationClient {
    settings: GenerationSettings,
    client: reqwest::Client,
}

impl HttpGenerationClient {
    pub fn new(settings: GenerationSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;
        Ok(Self { settings, client })
    }

    fn base(&self) -> &str {
        self.settings.endpoint.trim_end_matches('/')
    }

    fn map_send_error(&self, e: reqwest::Error) -> GenerationError {
        if e.is_timeout() {
            GenerationError::Timeout(self.settings.timeout())
        } else {
            GenerationError::Transport(e.to_string())
        }
    }

    async fn post(&self, request: reqwest::RequestBuilder) -> Result<Value, GenerationError> {
        let response = request.send().await.map_err(|e| self.map_send_error(e))?;
        let status = response.status();
        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            return Err(GenerationError::Status {
                code: status.as_u16(),
                message: service_error_message(&body),
            });
        }
        response
            .json()
            .await
            .map_err(|e| GenerationError::EmptyResponse(format!("envelope is not JSON: {}", e)))
    }

    async fn call_gemini(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base(),
            self.settings.model
        );
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": request.instruction }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": request.schema,
                "temperature": request.temperature,
            },
        });
        let mut builder = self.client.post(&url).json(&body);
        if let Some(key) = &self.settings.api_key {
            builder = builder.query(&[("key", key)]);
        }
        let envelope = self.post(builder).await?;
        extract_gemini_text(&envelope)
    }

    async fn call_ollama(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let url = format!("{}/api/generate", self.base());
        let body = json!({
            "model": self.settings.model,
            "prompt": format!(
                "{}\n\nYou must respond with valid JSON matching this schema:\n{}",
                request.instruction, request.schema
            ),
            "stream": false,
            "format": "json",
            "options": { "temperature": request.temperature },
        });
        let envelope = self.post(self.client.post(&url).json(&body)).await?;
        extract_ollama_text(&envelope)
    }

    async fn call_openai(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let url = format!("{}/v1/chat/completions", self.base());
        let body = json!({
            "model": self.settings.model,
            "messages": [
                { "role": "system", "content": format!(
                    "Respond with a JSON object matching this schema:\n{}",
                    request.schema
                ) },
                { "role": "user", "content": request.instruction },
            ],
            "response_format": { "type": "json_object" },
            "temperature": request.temperature,
        });
        let mut builder = self.client.post(&url).json(&body);
        if let Some(key) = &self.settings.api_key {
            builder = builder.bearer_auth(key);
        }
        let envelope = self.post(builder).await?;
        extract_openai_text(&envelope)
    }
}

#[async_trait]
impl GenerationClient for HttpGenerationClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        if !self.settings.enabled {
            return Err(GenerationError::Disabled);
        }
        tracing::debug!(
            "Calling {:?} backend at {} ({} prompt chars)",
            self.settings.backend,
            self.base(),
            request.instruction.len()
        );
        match self.settings.backend {
            Backend::Gemini => self.call_gemini(request).await,
            Backend::Ollama => self.call_ollama(request).await,
            Backend::OpenAi => self.call_openai(request).await,
        }
    }

    fn name(&self) -> &str {
        match self.settings.backend {
            Backend::Gemini => "gemini",
            Backend::Ollama => "ollama",
            Backend::OpenAi => "openai",
        }
    }
}

fn service_error_message(body: &Value) -> String {
    body.get("error")
        .and_then(|e| e.get("message").or(Some(e)))
        .and_then(|m| m.as_str())
        .unwrap_or("Unknown error")
        .to_string()
}

fn non_empty(text: Option<&str>, what: &str) -> Result<String, GenerationError> {
    match text {
        Some(t) if !t.trim().is_empty() => Ok(t.to_string()),
        _ => Err(GenerationError::EmptyResponse(format!(
            "the service did not return {}",
            what
        ))),
    }
}

/// `candidates[0].content.parts[0].text`
pub fn extract_gemini_text(envelope: &Value) -> Result<String, GenerationError> {
    non_empty(
        envelope
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str),
        "candidate text",
    )
}

pub fn extract_ollama_text(envelope: &Value) -> Result<String, GenerationError> {
    non_empty(
        envelope.get("response").and_then(Value::as_str),
        "a response field",
    )
}

/// `choices[0].message.content`
pub fn extract_openai_text(envelope: &Value) -> Result<String, GenerationError> {
    non_empty(
        envelope
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str),
        "message content",
    )
}

/// One scripted answer of a [`FakeGenerationClient`]
#[derive(Debug, Clone)]
pub struct FakeResponse {
    pub result: Result<String, GenerationError>,
    pub delay: Duration,
}

impl FakeResponse {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            result: Ok(text.into()),
            delay: Duration::ZERO,
        }
    }

    pub fn err(error: GenerationError) -> Self {
        Self {
            result: Err(error),
            delay: Duration::ZERO,
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Scripted client for tests and offline runs
pub struct FakeGenerationClient {
    responses: Mutex<Vec<FakeResponse>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl FakeGenerationClient {
    /// Responses are served in order; the last one repeats
    pub fn new(responses: Vec<FakeResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn always(text: impl Into<String>) -> Self {
        Self::new(vec![FakeResponse::ok(text)])
    }

    pub fn always_error(error: GenerationError) -> Self {
        Self::new(vec![FakeResponse::err(error)])
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.requests.lock().ok().and_then(|r| r.last().cloned())
    }

    fn next_response(&self) -> FakeResponse {
        let mut responses = match self.responses.lock() {
            Ok(r) => r,
            Err(poisoned) => poisoned.into_inner(),
        };
        match responses.len() {
            0 => FakeResponse::err(GenerationError::EmptyResponse(
                "no scripted response".to_string(),
            )),
            1 => responses[0].clone(),
            _ => responses.remove(0),
        }
    }
}

#[async_trait]
impl GenerationClient for FakeGenerationClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let response = self.next_response();
        if !response.delay.is_zero() {
            tokio::time::sleep(response.delay).await;
        }
        response.result
    }

    fn name(&self) -> &str {
        "fake"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> GenerationRequest {
        GenerationRequest {
            instruction: "analyze".to_string(),
            schema: json!({ "type": "OBJECT" }),
            temperature: 0.2,
        }
    }

    #[test]
    fn test_extract_gemini_text() {
        let envelope = json!({
            "candidates": [{ "content": { "parts": [{ "text": "{\"step1\":{}}" }] } }]
        });
        assert_eq!(extract_gemini_text(&envelope).unwrap(), "{\"step1\":{}}");
        assert!(matches!(
            extract_gemini_text(&json!({ "candidates": [] })),
            Err(GenerationError::EmptyResponse(_))
        ));
    }

    #[test]
    fn test_extract_openai_and_ollama_text() {
        let openai = json!({ "choices": [{ "message": { "content": "{}" } }] });
        assert_eq!(extract_openai_text(&openai).unwrap(), "{}");
        let ollama = json!({ "response": "   " });
        assert!(extract_ollama_text(&ollama).is_err());
    }

    #[test]
    fn test_service_error_message() {
        let body = json!({ "error": { "message": "API key not valid" } });
        assert_eq!(service_error_message(&body), "API key not valid");
        assert_eq!(service_error_message(&Value::Null), "Unknown error");
    }

    #[test]
    fn test_errors_map_to_network() {
        let err: ShieldError = GenerationError::Status {
            code: 503,
            message: "overloaded".into(),
        }
        .into();
        assert!(matches!(err, ShieldError::Network(ref m) if m.contains("503 - overloaded")));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_timeout_message_keeps_subsecond_precision() {
        let err = GenerationError::Timeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "request timed out after 250ms");
    }

    #[tokio::test]
    async fn test_fake_client_sequence_then_repeat() {
        let client = FakeGenerationClient::new(vec![
            FakeResponse::err(GenerationError::Timeout(Duration::from_secs(5))),
            FakeResponse::ok("second"),
        ]);
        assert!(client.generate(&request()).await.is_err());
        assert_eq!(client.generate(&request()).await.unwrap(), "second");
        assert_eq!(client.generate(&request()).await.unwrap(), "second");
        assert_eq!(client.call_count(), 3);
        assert_eq!(client.last_request().unwrap().instruction, "analyze");
    }

    #[tokio::test]
    async fn test_disabled_http_client_short_circuits() {
        let settings = GenerationSettings {
            enabled: false,
            ..GenerationSettings::default()
        };
        let client = HttpGenerationClient::new(settings).unwrap();
        assert_eq!(
            client.generate(&request()).await,
            Err(GenerationError::Disabled)
        );
    }
}
