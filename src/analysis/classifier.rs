//! Timeframe classifier
//!
//! One image in, one [`Classification`] out. Unrecognized replies and
//! transport failures become `Classification::Failed` values, never errors:
//! the caller keeps going with the next image. No retries.

use super::{ChartImage, Classification, Timeframe};
use crate::vision::{prompts::CLASSIFICATION_PROMPT, VisionProvider};

/// Map a raw model reply onto a timeframe
///
/// Trims and lowercases before lookup, so `" 15MIN\n"` resolves to `15m`.
/// Anything outside the alias set (including "unknown") is `None`.
pub fn normalize_reply(reply: &str) -> Option<Timeframe> {
    Timeframe::from_alias(reply)
}

/// Classify one image by asking the vision service for its timeframe
pub async fn classify(provider: &dyn VisionProvider, image: &ChartImage) -> Classification {
    match provider.analyze(image, CLASSIFICATION_PROMPT).await {
        Ok(reply) => match normalize_reply(&reply) {
            Some(tf) => {
                tracing::info!(image = %image.name, timeframe = %tf, "Detected timeframe");
                Classification::Detected(tf)
            }
            None => {
                tracing::warn!(image = %image.name, reply = %reply.trim(), "Unrecognized timeframe reply");
                Classification::Failed(format!("Could not detect timeframe: {}", reply))
            }
        },
        Err(e) => {
            tracing::warn!(image = %image.name, error = %e, "Timeframe detection failed");
            Classification::Failed(format!("Failed to detect timeframe: {}", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::VisionError;
    use futures::future::BoxFuture;

    struct FixedReply(Result<String, VisionError>);

    impl VisionProvider for FixedReply {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn analyze<'a>(
            &'a self,
            _image: &'a ChartImage,
            prompt: &'a str,
        ) -> BoxFuture<'a, Result<String, VisionError>> {
            assert_eq!(prompt, CLASSIFICATION_PROMPT);
            let reply = self.0.clone();
            Box::pin(async move { reply })
        }

        fn complete_text<'a>(
            &'a self,
            _prompt: &'a str,
        ) -> BoxFuture<'a, Result<String, VisionError>> {
            Box::pin(async { Err(VisionError::EmptyResponse) })
        }
    }

    fn chart() -> ChartImage {
        ChartImage::new("chart.png", "image/png", vec![1u8, 2, 3])
    }

    #[tokio::test]
    async fn test_alias_reply_is_detected() {
        let provider = FixedReply(Ok("15MIN".to_string()));
        assert_eq!(
            classify(&provider, &chart()).await,
            Classification::Detected(Timeframe::M15)
        );
    }

    #[tokio::test]
    async fn test_unrecognized_reply_keeps_raw_text() {
        let provider = FixedReply(Ok("daily".to_string()));
        match classify(&provider, &chart()).await {
            Classification::Failed(msg) => {
                assert!(msg.contains("daily"));
                assert!(msg.starts_with("Could not detect timeframe"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_reply_is_a_failure() {
        let provider = FixedReply(Ok("unknown".to_string()));
        assert!(matches!(
            classify(&provider, &chart()).await,
            Classification::Failed(_)
        ));
    }

    #[tokio::test]
    async fn test_transport_error_is_recorded() {
        let provider = FixedReply(Err(VisionError::Network("connection reset".to_string())));
        match classify(&provider, &chart()).await {
            Classification::Failed(msg) => assert!(msg.contains("connection reset")),
            other => panic!("expected failure, got {:?}", other),
        }
    }
}
