//! Vision service abstraction
//!
//! Every call to the external AI goes through [`VisionProvider`]. The rest of
//! the crate only sees two operations:
//!
//! ```text
//! VisionProvider trait
//! ├── analyze(image, prompt)                          classifier + pipeline
//! └── analyze_with_context(question, selected, ctx)   chat sessions
//!
//! Implementations
//! ├── GeminiProvider        (generateContent, inline_data)
//! ├── OpenAiCompatibleProvider (chat completions, data: URL)
//! ├── DemoProvider          (canned offline replies)
//! └── UnconfiguredProvider  (every call fails with NotConfigured)
//! ```
//!
//! Providers are `Send + Sync` and shared as `Arc<dyn VisionProvider>`, so a
//! single instance serves the pipeline task and any in-flight chat request.

use crate::analysis::ChartImage;
use crate::config::{ProviderConfig, ProviderKind};
use base64::Engine;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

pub mod demo;
pub mod gemini;
pub mod openai;
pub mod prompts;

pub use demo::DemoProvider;
pub use gemini::GeminiProvider;
pub use openai::OpenAiCompatibleProvider;

/// Errors that can occur while talking to the vision service
///
/// `Display` output is shown to the user verbatim (pipeline failure banner,
/// chat failure notices), so messages are short and self-contained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisionError {
    /// No API key or provider available
    NotConfigured(String),
    /// Transport failure (DNS, TLS, timeout, connection reset)
    Network(String),
    /// Non-success HTTP status from the service
    Api { status: u16, message: String },
    /// The service answered but produced no text
    EmptyResponse,
    /// The response body did not have the expected shape
    Parse(String),
}

impl fmt::Display for VisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConfigured(hint) => write!(f, "Vision provider not configured: {}", hint),
            Self::Network(msg) => write!(f, "Network error: {}", msg),
            Self::Api { status, message } => write!(f, "API error ({}): {}", status, message),
            Self::EmptyResponse => write!(f, "No response text from vision service"),
            Self::Parse(msg) => write!(f, "Failed to parse response: {}", msg),
        }
    }
}

impl std::error::Error for VisionError {}

/// Contract for the external vision-capable AI service
pub trait VisionProvider: Send + Sync {
    /// Human-readable name for logging and the status bar
    fn name(&self) -> &'static str;

    /// Send one image plus a prompt, return the reply text
    fn analyze<'a>(
        &'a self,
        image: &'a ChartImage,
        prompt: &'a str,
    ) -> BoxFuture<'a, Result<String, VisionError>>;

    /// Answer a follow-up question about a fragment of a previous analysis
    ///
    /// Default implementation has no image: it sends the context prompt as a
    /// text-only request through [`VisionProvider::complete_text`].
    fn analyze_with_context<'a>(
        &'a self,
        question: &'a str,
        selected_text: &'a str,
        full_context: &'a str,
    ) -> BoxFuture<'a, Result<String, VisionError>> {
        let prompt = prompts::context_prompt(question, selected_text, full_context);
        Box::pin(async move { self.complete_text(&prompt).await })
    }

    /// Text-only completion used by the default context implementation
    fn complete_text<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, VisionError>>;
}

/// Provider used when the configured backend cannot be constructed
///
/// Keeps the application usable (uploads, navigation, logs) while every
/// external call fails through the normal error paths.
#[derive(Debug, Clone)]
pub struct UnconfiguredProvider {
    reason: String,
}

impl UnconfiguredProvider {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl VisionProvider for UnconfiguredProvider {
    fn name(&self) -> &'static str {
        "unconfigured"
    }

    fn analyze<'a>(
        &'a self,
        _image: &'a ChartImage,
        _prompt: &'a str,
    ) -> BoxFuture<'a, Result<String, VisionError>> {
        let err = VisionError::NotConfigured(self.reason.clone());
        Box::pin(async move { Err(err) })
    }

    fn complete_text<'a>(&'a self, _prompt: &'a str) -> BoxFuture<'a, Result<String, VisionError>> {
        let err = VisionError::NotConfigured(self.reason.clone());
        Box::pin(async move { Err(err) })
    }
}

/// Base64-encode image bytes for inline transport
pub(crate) fn encode_image(image: &ChartImage) -> String {
    base64::engine::general_purpose::STANDARD.encode(&image.bytes)
}

/// Build a reqwest client with the configured timeout
pub(crate) fn http_client(config: &ProviderConfig) -> Result<reqwest::Client, VisionError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| VisionError::Network(format!("Failed to create HTTP client: {}", e)))
}

/// Turn a non-success response into `VisionError::Api`
pub(crate) async fn api_error(response: reqwest::Response) -> VisionError {
    let status = response.status().as_u16();
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    VisionError::Api { status, message }
}

/// Create a vision provider from configuration
///
/// Construction failures (typically a missing API key) fall back to an
/// [`UnconfiguredProvider`] so the failure surfaces on first use.
pub fn create_provider(config: &ProviderConfig) -> Arc<dyn VisionProvider> {
    let result = match config.kind {
        ProviderKind::Demo => return Arc::new(DemoProvider::from_config(config)),
        ProviderKind::Gemini => {
            GeminiProvider::new(config).map(|p| Arc::new(p) as Arc<dyn VisionProvider>)
        }
        ProviderKind::OpenAi => {
            OpenAiCompatibleProvider::new(config).map(|p| Arc::new(p) as Arc<dyn VisionProvider>)
        }
    };

    match result {
        Ok(provider) => provider,
        Err(e) => {
            tracing::error!("Failed to create {} provider: {}", config.kind, e);
            Arc::new(UnconfiguredProvider::new(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_is_user_facing() {
        let err = VisionError::Api {
            status: 429,
            message: "quota exceeded".to_string(),
        };
        assert_eq!(err.to_string(), "API error (429): quota exceeded");
        assert_eq!(
            VisionError::Network("timed out".to_string()).to_string(),
            "Network error: timed out"
        );
    }

    #[test]
    fn test_missing_key_falls_back_to_unconfigured() {
        let config = ProviderConfig {
            kind: ProviderKind::Gemini,
            api_key: None,
            ..ProviderConfig::default()
        };
        let provider = create_provider(&config);
        assert_eq!(provider.name(), "unconfigured");
    }

    #[test]
    fn test_demo_kind_needs_no_key() {
        let config = ProviderConfig {
            kind: ProviderKind::Demo,
            api_key: None,
            ..ProviderConfig::default()
        };
        assert_eq!(create_provider(&config).name(), "demo");
    }

    #[tokio::test]
    async fn test_unconfigured_provider_fails_every_call() {
        let provider = UnconfiguredProvider::new("set GEMINI_API_KEY");
        let image = ChartImage::new("chart.png", "image/png", vec![1u8, 2, 3]);

        let err = provider.analyze(&image, "prompt").await.unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));

        let err = provider
            .analyze_with_context("why?", "selected", "context")
            .await
            .unwrap_err();
        assert!(matches!(err, VisionError::NotConfigured(_)));
    }

    #[test]
    fn test_encode_image_is_standard_base64() {
        let image = ChartImage::new("x.png", "image/png", b"hello".to_vec());
        assert_eq!(encode_image(&image), "aGVsbG8=");
    }
}
