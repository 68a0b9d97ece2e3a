//! OpenAI-compatible chat completions adapter
//!
//! Works with any endpoint speaking the `/chat/completions` dialect with
//! image content parts (OpenAI, OpenRouter, local gateways). Images are sent
//! as `data:` URLs.

use super::{api_error, encode_image, http_client, VisionError, VisionProvider};
use crate::analysis::ChartImage;
use crate::config::ProviderConfig;
use futures::future::BoxFuture;
use serde::Deserialize;
use serde_json::json;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

pub struct OpenAiCompatibleProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, VisionError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            VisionError::NotConfigured(format!(
                "set {} to use the OpenAI-compatible provider",
                config.api_key_env
            ))
        })?;
        let client = http_client(config)?;
        let base_url = config
            .api_base
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        tracing::info!(
            "Initialized OpenAI-compatible provider: {} (model: {})",
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

    fn build_request(&self, content: serde_json::Value) -> reqwest::RequestBuilder {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        self.client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({
                "model": self.model,
                "messages": [{ "role": "user", "content": content }],
            }))
    }

    async fn send(&self, content: serde_json::Value) -> Result<String, VisionError> {
        let response = self
            .build_request(content)
            .send()
            .await
            .map_err(|e| VisionError::Network(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| VisionError::Parse(e.to_string()))?;

        first_choice_text(body)
    }
}

fn image_content(image: &ChartImage, prompt: &str) -> serde_json::Value {
    json!([
        { "type": "text", "text": prompt },
        {
            "type": "image_url",
            "image_url": { "url": format!("data:{};base64,{}", image.mime, encode_image(image)) }
        }
    ])
}

fn first_choice_text(body: ChatResponse) -> Result<String, VisionError> {
    body.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or(VisionError::EmptyResponse)
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl VisionProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &'static str {
        "openai-compatible"
    }

    fn analyze<'a>(
        &'a self,
        image: &'a ChartImage,
        prompt: &'a str,
    ) -> BoxFuture<'a, Result<String, VisionError>> {
        Box::pin(async move { self.send(image_content(image, prompt)).await })
    }

    fn complete_text<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, VisionError>> {
        Box::pin(async move { self.send(json!(prompt)).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_content_uses_data_url() {
        let image = ChartImage::new("c.jpg", "image/jpeg", b"hi".to_vec());
        let content = image_content(&image, "classify");
        assert_eq!(content[0]["text"], "classify");
        assert_eq!(content[1]["image_url"]["url"], "data:image/jpeg;base64,aGk=");
    }

    #[test]
    fn test_first_choice_text() {
        let body: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"4h"}}]}"#).unwrap();
        assert_eq!(first_choice_text(body).unwrap(), "4h");

        let body: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert_eq!(first_choice_text(body), Err(VisionError::EmptyResponse));
    }
}
