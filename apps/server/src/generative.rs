//! # Generative Language Client
//!
//! Outbound text-in/text-out calls to the generative-language API.
//!
//! ## Wire Format
//! ```text
//! POST {api_base}/models/{model}:generateContent?key={api_key}
//! {
//!   "contents": [{ "parts": [{ "text": "<prompt>" }] }],
//!   "generationConfig": { "temperature": 0.7, "maxOutputTokens": 1024 }
//! }
//! ```
//!
//! ## Text Extraction
//! The response body is searched in a fixed order and the first non-empty
//! text wins:
//! 1. `candidates[0].content.parts[*].text`
//! 2. `output[*].content[*].text` (or `output.content.text` as objects)
//! 3. any `"text"` string anywhere in the body (depth-first)
//!
//! The last step covers responses whose schema drifted; it is the least
//! precise matcher and only runs when the first two find nothing.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::GeminiConfig;

/// Sampling settings of one call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// Errors of a single model call. Callers retry or fall back; none of
/// these reach the HTTP client of this server.
#[derive(Debug, thiserror::Error)]
pub enum GenerativeError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Model API returned status {status}")]
    Status { status: u16, body: String },

    #[error("Response contained no text")]
    NoText,
}

/// A text generator. The chat orchestrator depends on this trait only.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Sends `prompt` and returns the extracted reply text.
    async fn generate(&self, prompt: &str, config: GenerationConfig)
        -> Result<String, GenerativeError>;
}

// =============================================================================
// HTTP Client
// =============================================================================

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

/// Client for the `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GeminiClient {
    /// Builds a client from configuration.
    ///
    /// ## Returns
    /// * `Ok(None)` - No API key configured; the model is disabled
    /// * `Ok(Some(client))` - Ready client
    /// * `Err(GenerativeError)` - The HTTP client could not be built
    pub fn from_config(config: &GeminiConfig) -> Result<Option<Self>, GenerativeError> {
        let Some(api_key) = config.api_key.clone() else {
            return Ok(None);
        };
        Self::new(&config.api_base, &config.model, api_key, config.timeout).map(Some)
    }

    pub fn new(
        api_base: &str,
        model: &str,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, GenerativeError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(GeminiClient {
            http,
            endpoint: format!(
                "{}/models/{}:generateContent",
                api_base.trim_end_matches('/'),
                model
            ),
            api_key,
        })
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(
        &self,
        prompt: &str,
        config: GenerationConfig,
    ) -> Result<String, GenerativeError> {
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
            generation_config: config,
        };

        debug!(
            endpoint = %self.endpoint,
            temperature = config.temperature,
            max_output_tokens = config.max_output_tokens,
            prompt_chars = prompt.chars().count(),
            "Calling generative model"
        );

        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %truncate(&body, 500), "Generative model error");
            return Err(GenerativeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let json: Value = response.json().await?;
        extract_text(&json).ok_or(GenerativeError::NoText)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

// =============================================================================
// Text Extraction
// =============================================================================

/// Returns the first non-empty reply text found in a response body.
///
/// ## Example
/// ```rust
/// use kasir_server::generative::extract_text;
/// use serde_json::json;
///
/// let body = json!({"candidates": [{"content": {"parts": [{"text": "Halo!"}]}}]});
/// assert_eq!(extract_text(&body).as_deref(), Some("Halo!"));
/// ```
pub fn extract_text(body: &Value) -> Option<String> {
    candidates_text(body)
        .or_else(|| output_text(body))
        .or_else(|| scan_text(body))
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn candidates_text(body: &Value) -> Option<String> {
    let parts = body
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let joined: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    non_empty(&joined)
}

fn output_text(body: &Value) -> Option<String> {
    let output = body.get("output")?;
    let outputs: Vec<&Value> = match output {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    outputs.into_iter().find_map(|item| {
        let content = item.get("content")?;
        match content {
            Value::Array(items) => items
                .iter()
                .find_map(|c| c.get("text").and_then(Value::as_str).and_then(non_empty)),
            other => other.get("text").and_then(Value::as_str).and_then(non_empty),
        }
    })
}

fn scan_text(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => {
            if let Some(text) = map.get("text").and_then(Value::as_str).and_then(non_empty) {
                return Some(text);
            }
            map.values().find_map(scan_text)
        }
        Value::Array(items) => items.iter().find_map(scan_text),
        _ => None,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_candidates_parts_are_joined() {
        let body = json!({
            "candidates": [{
                "content": {"parts": [{"text": "Stok Pocari "}, {"text": "60 unit."}]}
            }]
        });
        assert_eq!(extract_text(&body).as_deref(), Some("Stok Pocari 60 unit."));
    }

    #[test]
    fn test_output_array_shape() {
        let body = json!({"output": [{"content": [{"type": "output_text", "text": "Halo"}]}]});
        assert_eq!(extract_text(&body).as_deref(), Some("Halo"));
    }

    #[test]
    fn test_output_object_shape() {
        let body = json!({"output": {"content": {"text": "Halo juga"}}});
        assert_eq!(extract_text(&body).as_deref(), Some("Halo juga"));
    }

    #[test]
    fn test_generic_scan_finds_nested_text() {
        let body = json!({"result": {"choices": [{"message": {"text": "  ok  "}}]}});
        assert_eq!(extract_text(&body).as_deref(), Some("ok"));
    }

    #[test]
    fn test_empty_texts_are_skipped() {
        let body = json!({
            "candidates": [{"content": {"parts": [{"text": "   "}]}}],
            "promptFeedback": {"blockReason": "SAFETY"}
        });
        assert_eq!(extract_text(&body), None);
    }

    #[test]
    fn test_request_body_shape() {
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: "hai" }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.5,
                max_output_tokens: 512,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hai");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 512);
        assert_eq!(json["generationConfig"]["temperature"], 0.5);
    }
}
