use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Text generation backend used for taste analysis.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model identifier, for logs.
    fn model(&self) -> &str;

    /// Whether the backend has what it needs to serve requests.
    fn is_configured(&self) -> bool {
        true
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Client for the Google Gemini `generateContent` API.
pub struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(http: Client, base_url: impl Into<String>, model: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    fn model(&self) -> &str {
        &self.model
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::NotConfigured)?;
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let request_body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .http
            .post(&url)
            .query(&[("key", api_key)])
            .json(&request_body)
            .send()
            .await
            .map_err(LlmError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: GenerateResponse = response.json().await.map_err(LlmError::Http)?;
        extract_text(body)
    }
}

fn extract_text(body: GenerateResponse) -> Result<String, LlmError> {
    let text: String = body
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    Ok(text)
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("no API key configured")]
    NotConfigured,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("model returned no text")]
    EmptyResponse,

    #[error("request timed out after {0}s")]
    Timeout(u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_joins_parts() {
        let body: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "{\"a\":"}, {"text": " 1}"}]}}]
        }))
        .unwrap();
        assert_eq!(extract_text(body).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn test_extract_text_empty() {
        let body: GenerateResponse = serde_json::from_value(serde_json::json!({"candidates": []})).unwrap();
        assert!(matches!(extract_text(body), Err(LlmError::EmptyResponse)));
    }

    #[tokio::test]
    async fn test_missing_key_is_not_configured() {
        let client = GeminiClient::new(Client::new(), DEFAULT_API_BASE, DEFAULT_MODEL, Some("  ".to_string()));
        assert!(!client.is_configured());
        assert!(matches!(client.generate("hi").await, Err(LlmError::NotConfigured)));
    }
}
