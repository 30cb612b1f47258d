//! Client for Google's Gemini `generateContent` REST endpoint

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::NarrativeGenerator;
use crate::error::GenerationError;

/// Default Gemini API base URL.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default Gemini model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-pro";

/// Client for the Gemini text generation API
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self::with_base_url(DEFAULT_GEMINI_BASE_URL, api_key, model)
    }

    /// Create a client against another endpoint (proxies, local test servers).
    pub fn with_base_url(base_url: &str, api_key: &str, model: &str) -> Self {
        // The engine enforces its own per-request timeout; this one only
        // guards against hung sockets
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Create a client from environment variables.
    ///
    /// Reads `GEMINI_API_KEY` (required), `GEMINI_MODEL` and `GEMINI_BASE_URL`,
    /// after loading a `.env` file if one exists.
    pub fn from_env() -> Result<Self, GenerationError> {
        dotenvy::dotenv().ok();

        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                GenerationError::NotConfigured("GEMINI_API_KEY is not set".to_string())
            })?;
        let model =
            std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string());
        let base_url = std::env::var("GEMINI_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string());

        Ok(Self::with_base_url(&base_url, &api_key, &model))
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl NarrativeGenerator for GeminiClient {
    async fn generate(&self, prompt: String) -> Result<String, GenerationError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part { text: Some(prompt) }],
            }],
        };

        log::debug!("Sending generateContent request to {}", self.model);
        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .map_err(|e| GenerationError::RequestFailed(e.to_string()))?;
            return Err(GenerationError::RequestFailed(format!(
                "{}: {}",
                status, error_text
            )));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        extract_text(body)
    }
}

/// Joins the text parts of the first candidate
fn extract_text(response: GenerateContentResponse) -> Result<String, GenerationError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| GenerationError::InvalidResponse("no candidates in response".to_string()))?;

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate
            .finish_reason
            .unwrap_or_else(|| "unknown".to_string());
        return Err(GenerationError::InvalidResponse(format!(
            "candidate has no text (finish reason: {})",
            reason
        )));
    }
    Ok(text)
}

// =============================================================================
// Gemini API types
// =============================================================================

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_joined_text_from_first_candidate() {
        let body: GenerateContentResponse = serde_json::from_str(
            r#"{
                "candidates": [
                    {
                        "content": {
                            "role": "model",
                            "parts": [{"text": "The bee dived. "}, {"text": "Bee won."}]
                        },
                        "finishReason": "STOP"
                    },
                    {
                        "content": {"role": "model", "parts": [{"text": "ignored"}]}
                    }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(extract_text(body).unwrap(), "The bee dived. Bee won.");
    }

    #[test]
    fn blocked_candidate_is_invalid() {
        let body: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#).unwrap();

        let err = extract_text(body).unwrap_err();
        assert!(matches!(err, GenerationError::InvalidResponse(ref msg) if msg.contains("SAFETY")));
    }

    #[test]
    fn missing_candidates_is_invalid() {
        let body: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(extract_text(body).is_err());
    }

    #[test]
    fn request_serializes_in_api_shape() {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some("hello".to_string()),
                }],
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(json["contents"][0]["role"], "user");
    }
}
