//! Gemini `generateContent` adapter
//!
//! Images travel inline as base64 `inline_data` parts; the reply is the
//! concatenation of every text part of the first candidate.

use super::{api_error, encode_image, http_client, VisionError, VisionProvider};
use crate::analysis::ChartImage;
use crate::config::ProviderConfig;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    /// Create a provider from configuration
    ///
    /// # Errors
    /// `NotConfigured` when the API key env var is unset, `Network` when the
    /// HTTP client cannot be built.
    pub fn new(config: &ProviderConfig) -> Result<Self, VisionError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            VisionError::NotConfigured(format!("set {} to use Gemini", config.api_key_env))
        })?;
        let client = http_client(config)?;
        let base_url = config
            .api_base
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        tracing::info!(
            "Initialized Gemini provider: {} (model: {})",
            base_url,
            config.model
        );

        Ok(Self {
            client,
            base_url,
            api_key,
            model: config.model.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    async fn generate(&self, parts: Vec<Part<'_>>) -> Result<String, VisionError> {
        let body = GenerateRequest {
            contents: vec![Content { parts }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| VisionError::Network(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| VisionError::Parse(e.to_string()))?;

        extract_text(body)
    }
}

fn extract_text(body: GenerateResponse) -> Result<String, VisionError> {
    let text: String = body
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(VisionError::EmptyResponse);
    }
    Ok(text)
}

// Wire format

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    InlineData { inline_data: InlineData },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl VisionProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn analyze<'a>(
        &'a self,
        image: &'a ChartImage,
        prompt: &'a str,
    ) -> BoxFuture<'a, Result<String, VisionError>> {
        Box::pin(async move {
            tracing::debug!(
                image = %image.name,
                bytes = image.bytes.len(),
                "gemini generateContent with image"
            );
            let parts = vec![
                Part::Text { text: prompt },
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: image.mime,
                        data: encode_image(image),
                    },
                },
            ];
            self.generate(parts).await
        })
    }

    fn complete_text<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, VisionError>> {
        Box::pin(async move { self.generate(vec![Part::Text { text: prompt }]).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text { text: "what timeframe?" },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: "image/png",
                            data: "AAAA".to_string(),
                        },
                    },
                ],
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "what timeframe?");
        assert_eq!(
            json["contents"][0]["parts"][1]["inline_data"]["mime_type"],
            "image/png"
        );
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let body: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"15"},{"text":"m"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(body).unwrap(), "15m");
    }

    #[test]
    fn test_extract_text_empty_candidates() {
        let body: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert_eq!(extract_text(body), Err(VisionError::EmptyResponse));
    }
}
