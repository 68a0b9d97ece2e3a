// Demo provider: deterministic canned replies so the whole app runs offline
//
// Classification reads timeframe hints from the file name (btc_4h.png,
// eth-15min.jpg). Analysis prompts get a canned markdown write-up per
// timeframe; the aggregation prompt gets a report with Reasoning and Position
// Details sections so the Overall tab renders all three regions.
//
// Run with: TRADELENS_PROVIDER=demo tradelens charts/*.png

use super::prompts::{self, CLASSIFICATION_PROMPT};
use super::{VisionError, VisionProvider};
use crate::analysis::{ChartImage, Timeframe};
use crate::config::ProviderConfig;
use futures::future::BoxFuture;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone)]
pub struct DemoProvider {
    latency: Duration,
}

impl DemoProvider {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    pub fn from_config(config: &ProviderConfig) -> Self {
        Self::new(Duration::from_millis(config.demo_latency_ms))
    }

    fn reply_for(&self, image: &ChartImage, prompt: &str) -> String {
        if prompt == CLASSIFICATION_PROMPT {
            return filename_hint(&image.name).unwrap_or_else(|| "unknown".to_string());
        }

        for tf in Timeframe::ALL {
            if prompt == prompts::timeframe_prompt(tf) {
                return timeframe_write_up(tf);
            }
        }

        FINAL_REPORT.to_string()
    }
}

/// Timeframe token embedded in a file name, echoed as the model would
fn filename_hint(name: &str) -> Option<String> {
    name.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .find(|token| Timeframe::from_alias(token).is_some())
        .map(str::to_string)
}

fn timeframe_write_up(tf: Timeframe) -> String {
    let (trend, support, resistance) = match tf {
        Timeframe::H4 => ("Bullish, higher highs since the weekly open", "41,200", "44,800"),
        Timeframe::H1 => ("Bullish pullback into the 50 EMA", "42,350", "43,900"),
        Timeframe::M15 => ("Range-bound, compressing under resistance", "42,900", "43,400"),
        Timeframe::M5 => ("Choppy, momentum fading into the session close", "43,050", "43,250"),
    };

    format!(
        "### {heading} Overview\n\n\
         **Trend**: {trend}.\n\n\
         - **Support**: {support}\n\
         - **Resistance**: {resistance}\n\
         - **RSI**: mid-range, no divergence\n\n\
         Volume is steady. A close above {resistance} would confirm continuation; \
         losing {support} invalidates the setup.",
        heading = tf.heading(),
    )
}

const FINAL_REPORT: &str = "\
### Trading Summary
- **Overall Market Bias**: Bullish (medium confidence)
- **Recommended Action**: WAIT for a retest of 42,350
- **Trade Type**: Intraday
- **Confidence Level**: Medium

## Reasoning
- **Multi-timeframe Confluence**: 4H and 1H trends agree; lower timeframes are ranging.
- **Key Technical Factors**: Higher lows on 4H, 50 EMA holding on 1H.
- **Risk Factors**: A 4H close below 41,200 breaks structure.

## Position Details
- **Entry Zone**: 42,300 - 42,400
- **Stop Loss**: 41,150 (below 4H support)
- **Take Profit**: 43,900 (50%), 44,800 (50%)
- **Position Size**: 1% account risk
- **Time Horizon**: 1-2 days

### Waiting Points
- Watch for a 15M bullish engulfing candle at the entry zone.
- Reassess if price closes above 43,400 without a pullback.
";

impl VisionProvider for DemoProvider {
    fn name(&self) -> &'static str {
        "demo"
    }

    fn analyze<'a>(
        &'a self,
        image: &'a ChartImage,
        prompt: &'a str,
    ) -> BoxFuture<'a, Result<String, VisionError>> {
        Box::pin(async move {
            sleep(self.latency).await;
            Ok(self.reply_for(image, prompt))
        })
    }

    fn analyze_with_context<'a>(
        &'a self,
        question: &'a str,
        selected_text: &'a str,
        _full_context: &'a str,
    ) -> BoxFuture<'a, Result<String, VisionError>> {
        Box::pin(async move {
            sleep(self.latency).await;
            Ok(format!(
                "Regarding \"{}\": {} In short, treat it as one input and wait for \
                 confirmation on the lower timeframes before acting.",
                selected_text.trim(),
                if question.trim_end().ends_with('?') {
                    "that level matters because it lines up with the 4H structure."
                } else {
                    "it reflects where buyers defended price most recently."
                }
            ))
        })
    }

    fn complete_text<'a>(&'a self, _prompt: &'a str) -> BoxFuture<'a, Result<String, VisionError>> {
        Box::pin(async move {
            sleep(self.latency).await;
            Ok(FINAL_REPORT.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(name: &str) -> ChartImage {
        ChartImage::new(name, "image/png", vec![0u8; 4])
    }

    #[test]
    fn test_filename_hints() {
        assert_eq!(filename_hint("btc_15min.png").as_deref(), Some("15min"));
        assert_eq!(filename_hint("ETH-4H.jpg").as_deref(), Some("4h"));
        assert_eq!(filename_hint("screenshot.png"), None);
    }

    #[tokio::test]
    async fn test_classification_reply_from_name() {
        let provider = DemoProvider::new(Duration::ZERO);
        let reply = provider
            .analyze(&image("sol_5m.png"), CLASSIFICATION_PROMPT)
            .await
            .unwrap();
        assert_eq!(reply, "5m");

        let reply = provider
            .analyze(&image("chart.png"), CLASSIFICATION_PROMPT)
            .await
            .unwrap();
        assert_eq!(reply, "unknown");
    }

    #[tokio::test]
    async fn test_final_report_has_section_headings() {
        let provider = DemoProvider::new(Duration::ZERO);
        let reply = provider
            .analyze(&image("a_4h.png"), "aggregate please")
            .await
            .unwrap();
        assert!(reply.contains("## Reasoning"));
        assert!(reply.contains("## Position Details"));
    }
}
