//! Gemini backend using schema-constrained `generateContent`.

use super::provider::{non_blank, GenerationOptions, LlmError, LlmProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemma-3-27b-it";
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

pub struct GeminiProvider {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    options: GenerationOptions,
}

impl GeminiProvider {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        options: GenerationOptions,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
            options,
        }
    }
}

/// Gemma models served through the API reject JSON mode.
fn supports_json_mode(model: &str) -> bool {
    !model.starts_with("gemma")
}

/// Schema of the scoring answer, sent as the response schema.
fn score_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "match_score": { "type": "INTEGER" },
            "likelihood_score": { "type": "INTEGER" },
            "match_reason": { "type": "STRING" },
            "likelihood_reason": { "type": "STRING" }
        },
        "required": ["match_score", "likelihood_score", "match_reason", "likelihood_reason"]
    })
}

/// Content of the first fenced json block, or the whole text.
pub fn extract_json_block(text: &str) -> &str {
    match text.split_once("```json") {
        Some((_, rest)) => rest.split("```").next().unwrap_or(rest).trim(),
        None => text,
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<Option<String>, LlmError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let json_mode = supports_json_mode(&self.model);
        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.options.temperature,
                max_output_tokens: self.options.max_tokens,
                response_mime_type: json_mode.then(|| "application/json".to_string()),
                response_schema: json_mode.then(score_schema),
            },
        };

        debug!(model = %self.model, "Sending generateContent request to Gemini");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .timeout(self.options.timeout)
            .send()
            .await
            .map_err(LlmError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(LlmError::from_status(response).await);
        }

        let generated: GenerateResponse = response.json().await.map_err(|e| {
            LlmError::InvalidResponse(format!("Failed to parse Gemini response: {}", e))
        })?;

        Ok(response_text(generated).map(|text| extract_json_block(&text).to_string()))
    }
}

fn response_text(response: GenerateResponse) -> Option<String> {
    let content = response.candidates.into_iter().next()?.content?;
    let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
    non_blank(text)
}

// ============================================================================
// Gemini API types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}
