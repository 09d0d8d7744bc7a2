use analysis_exchange::{AnalysisError, ModelClient, PromptPayload, Result};
use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use serde_json::{Value, json};
use tracing::{debug, info};

const OPENROUTER_COMPLETIONS_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_MODEL: &str = "openai/gpt-4.1-mini";
const MAX_TOKENS: u32 = 4000;

/// OpenRouter-backed model client.
///
/// Structured, possibly multimodal calls go through the chat-completions
/// API directly so we can attach data-URI images and request schema-guided
/// JSON output; conversational calls go through a rig agent.
pub struct OpenRouterClient {
    http: reqwest::Client,
    model: String,
}

impl OpenRouterClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            model: model.into(),
        }
    }

    /// Model name from `ANALYSIS_MODEL`, falling back to the default.
    pub fn from_env() -> Self {
        let model = std::env::var("ANALYSIS_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        info!(model = %model, "OpenRouter model client configured");
        Self::new(model)
    }

    /// Credentials are read at call time so a missing key short-circuits
    /// with a distinct diagnostic before any network I/O.
    fn api_key() -> Result<String> {
        std::env::var("OPENROUTER_API_KEY")
            .map_err(|_| AnalysisError::Configuration("OPENROUTER_API_KEY not set".to_string()))
    }
}

/// Build the chat-completions request body: one text part plus one
/// `image_url` part per attachment, and the schema as a strict
/// `response_format` when structured output is requested.
fn build_request_body(model: &str, payload: &PromptPayload, schema: Option<&Value>) -> Value {
    let mut content = vec![json!({
        "type": "text",
        "text": payload.instructions,
    })];
    for attachment in &payload.attachments {
        content.push(json!({
            "type": "image_url",
            "image_url": { "url": attachment.to_data_uri() }
        }));
    }

    let mut body = json!({
        "model": model,
        "messages": [{ "role": "user", "content": content }],
        "max_tokens": MAX_TOKENS,
    });
    if let Some(schema) = schema {
        body["response_format"] = json!({
            "type": "json_schema",
            "json_schema": {
                "name": "analysis_report",
                "strict": true,
                "schema": schema,
            }
        });
    }
    body
}

/// Pull the completion text out of a chat-completions response.
fn extract_completion(response: &Value) -> Result<String> {
    let choices = response["choices"]
        .as_array()
        .ok_or_else(|| AnalysisError::MalformedResponse("response has no choices".to_string()))?;
    if choices.is_empty() {
        return Err(AnalysisError::ModelDeclined);
    }
    choices[0]["message"]["content"]
        .as_str()
        .map(|s| s.to_string())
        .ok_or(AnalysisError::ModelDeclined)
}

/// Models occasionally wrap JSON answers in markdown fences despite the
/// response format; strip them before parsing.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

#[async_trait]
impl ModelClient for OpenRouterClient {
    async fn structured_completion(
        &self,
        payload: &PromptPayload,
        schema: &Value,
    ) -> Result<Value> {
        let api_key = Self::api_key()?;
        let body = build_request_body(&self.model, payload, Some(schema));
        debug!(
            model = %self.model,
            attachments = payload.attachments.len(),
            "dispatching structured completion"
        );

        let response = self
            .http
            .post(OPENROUTER_COMPLETIONS_URL)
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&body)
            .send()
            .await
            .map_err(|e| AnalysisError::ServiceUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AnalysisError::ServiceUnavailable(format!(
                "model API returned {}",
                response.status()
            )));
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;
        let completion = extract_completion(&response_json)?;

        serde_json::from_str(strip_code_fences(&completion))
            .map_err(|e| AnalysisError::MalformedResponse(format!("completion is not JSON: {e}")))
    }

    async fn text_completion(&self, payload: &PromptPayload) -> Result<String> {
        let api_key = Self::api_key()?;
        let client = rig::providers::openrouter::Client::new(&api_key);
        let agent = client.agent(&self.model).build();

        agent
            .prompt(&payload.instructions)
            .await
            .map_err(|e| AnalysisError::ServiceUnavailable(e.to_string()))
    }
}
