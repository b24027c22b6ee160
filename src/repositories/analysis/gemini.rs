use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use super::{UpstreamError, VisionModel};
use crate::models::analysis::ImagePayload;
use crate::settings;

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

pub struct GeminiApi {
    api_key: Option<String>,
    url: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiApi {
    pub fn new(config: &settings::Gemini) -> Result<Self, anyhow::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            api_key: config.api_key.clone(),
            url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            client,
        })
    }
}

#[async_trait]
impl VisionModel for GeminiApi {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, prompt: &str, image: &ImagePayload) -> Result<String, UpstreamError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| UpstreamError::Authentication("API key is not configured".to_string()))?;

        let payload = json!({
            "contents": [{
                "parts": [
                    { "text": prompt },
                    { "inline_data": { "mime_type": image.mime_type, "data": image.data } }
                ]
            }]
        });

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.url, self.model
            ))
            .header("x-goog-api-key", api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| UpstreamError::Other(format!("Gemini: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| UpstreamError::Other(format!("Gemini: {}", e)))?;

        if !status.is_success() {
            return Err(classify_failure(status, &body));
        }

        let response: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| UpstreamError::Other(format!("Gemini: bad response format: {}", e)))?;

        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(UpstreamError::Other("Gemini: empty response".to_string()));
        }

        Ok(text)
    }
}

/// Maps a non-success Gemini reply onto the error classes callers act on.
fn classify_failure(status: StatusCode, body: &str) -> UpstreamError {
    let (message, api_status) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => (envelope.error.message, envelope.error.status),
        Err(_) => (body.to_string(), String::new()),
    };
    let detail = format!("Gemini {}: {}", status, message);
    let lowered = message.to_ascii_lowercase();

    if status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || api_status == "UNAUTHENTICATED"
        || api_status == "PERMISSION_DENIED"
        || lowered.contains("api key")
        || lowered.contains("authentication")
    {
        UpstreamError::Authentication(detail)
    } else if status == StatusCode::TOO_MANY_REQUESTS
        || api_status == "RESOURCE_EXHAUSTED"
        || lowered.contains("quota")
        || lowered.contains("limit")
    {
        UpstreamError::Quota(detail)
    } else {
        UpstreamError::Other(detail)
    }
}
