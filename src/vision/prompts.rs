// Prompt templates sent to the vision service
//
// The classification prompt constrains replies to the alias set understood by
// `Timeframe::from_alias`. The final prompt asks for the section headings that
// `analysis::report` splits on (Reasoning, Position Details).

use crate::analysis::{AnalysisResultSet, Timeframe};

pub const CLASSIFICATION_PROMPT: &str = "\
Analyze this trading chart image and identify the timeframe. Look for timeframe indicators in the chart interface.

Respond with ONLY one of these exact timeframes:
- 4h (for 4 hour charts)
- 1h (for 1 hour charts)
- 15m (for 15 minute charts)
- 5m (for 5 minute charts)

If you cannot clearly identify the timeframe, respond with \"unknown\".
";

const ANALYSIS_4H: &str = "\
You are an expert trading analyst. Analyze this 4-hour chart and provide detailed technical analysis.

Focus on:
1. **Trend Analysis**: Current trend direction and strength
2. **Support/Resistance**: Key levels and price action around them
3. **Technical Indicators**: RSI, moving averages, volume, any visible indicators
4. **Chart Patterns**: Any recognizable patterns (triangles, flags, head & shoulders, etc.)
5. **Market Structure**: Higher highs/lows, market phases
6. **Risk Assessment**: Potential risks and invalidation levels

Provide your analysis in a structured format with clear sections. Be specific about price levels when visible.
";

const ANALYSIS_1H: &str = "\
You are an expert trading analyst. Analyze this 1-hour chart and provide detailed technical analysis.

Focus on:
1. **Short-term Trend**: Current momentum and direction
2. **Entry/Exit Zones**: Potential trade entry and exit points
3. **Support/Resistance**: Immediate key levels
4. **Technical Indicators**: RSI, moving averages, volume patterns
5. **Price Action**: Recent candlestick patterns and market behavior
6. **Confluence**: Areas where multiple factors align

Provide actionable insights for short-term trading decisions. Be specific about timing and levels.
";

const ANALYSIS_15M: &str = "\
You are an expert trading analyst. Analyze this 15-minute chart for precise entry timing.

Focus on:
1. **Micro Trends**: Very short-term price movements
2. **Entry Timing**: Precise entry signals and confirmations
3. **Scalping Opportunities**: Quick profit-taking levels
4. **Volume Analysis**: Volume spikes and patterns
5. **Price Action**: Recent candle formations and momentum
6. **Risk Management**: Stop-loss placement for short-term trades

Provide specific timing guidance for intraday trading strategies.
";

const ANALYSIS_5M: &str = "\
You are an expert trading analyst. Analyze this 5-minute chart for scalping and precise timing.

Focus on:
1. **Immediate Price Action**: Current momentum and micro-movements
2. **Scalping Setups**: Quick entry/exit opportunities
3. **Volume Confirmation**: Volume supporting price moves
4. **Support/Resistance**: Immediate levels for quick trades
5. **Market Noise**: Filtering out false signals
6. **Execution Timing**: Optimal entry and exit timing

Provide ultra-short-term trading insights with specific timing recommendations.
";

const FINAL_INSTRUCTIONS: &str = "\
## Instructions:
Provide a structured final recommendation with these sections:

### Trading Summary
- **Overall Market Bias**: Bullish/Bearish/Neutral with confidence level
- **Recommended Action**: BUY/SELL/WAIT with clear reasoning
- **Trade Type**: Swing/Intraday/Scalp based on the setup quality
- **Confidence Level**: High/Medium/Low

### Reasoning
- **Multi-timeframe Confluence**: How different timeframes align
- **Key Technical Factors**: Most important signals supporting the decision
- **Risk Factors**: What could invalidate this analysis
- **Market Context**: Current market conditions and their impact

### Position Details
- **Entry Zone**: Specific price levels for entry
- **Stop Loss**: Exact stop-loss levels with reasoning
- **Take Profit**: Multiple TP levels with percentages
- **Position Size**: Recommended risk percentage
- **Time Horizon**: Expected trade duration
- **Alternative Scenarios**: What to do if price moves differently

### Waiting Points
- If the recommendation is WAIT, specify:
  - What levels to watch for entry
  - What confirmations to wait for
  - Alternative shorter-term opportunities
  - When to reassess the situation

Be specific with price levels, percentages, and actionable guidance. Focus on practical trading decisions.
";

/// Analysis prompt for one timeframe stage
pub fn timeframe_prompt(timeframe: Timeframe) -> &'static str {
    match timeframe {
        Timeframe::H4 => ANALYSIS_4H,
        Timeframe::H1 => ANALYSIS_1H,
        Timeframe::M15 => ANALYSIS_15M,
        Timeframe::M5 => ANALYSIS_5M,
    }
}

/// Labeled per-timeframe sections, fixed order, missing results omitted
pub fn labeled_sections(results: &AnalysisResultSet) -> String {
    results
        .timeframes()
        .map(|(tf, text)| format!("## {} Analysis:\n{}", tf.heading(), text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Aggregation prompt over every per-timeframe result produced so far
pub fn final_prompt(results: &AnalysisResultSet) -> String {
    format!(
        "You are an expert trading analyst. Based on the multi-timeframe analysis provided below, \
         create a comprehensive trading recommendation.\n\n{}\n\n{}",
        labeled_sections(results),
        FINAL_INSTRUCTIONS
    )
}

/// Prompt for follow-up questions scoped to a selected fragment
pub fn context_prompt(question: &str, selected_text: &str, full_context: &str) -> String {
    format!(
        "You are an expert trading analyst helping a trader understand a previous chart analysis.\n\n\
         ## Full Analysis Context:\n{full_context}\n\n\
         ## Selected Text:\n\"{selected_text}\"\n\n\
         ## Question:\n{question}\n\n\
         Answer the question with a focus on the selected text, using the full analysis for \
         context. Be concise, specific about price levels where relevant, and practical."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Stage;

    #[test]
    fn test_final_prompt_labels_present_sections_only() {
        let mut results = AnalysisResultSet::default();
        results.insert(Stage::Timeframe(Timeframe::H4), "uptrend".to_string());
        results.insert(Stage::Timeframe(Timeframe::M5), "chop".to_string());

        let prompt = final_prompt(&results);
        assert!(prompt.contains("## 4H Analysis:\nuptrend\n\n## 5M Analysis:\nchop"));
        assert!(!prompt.contains("## 1H Analysis:"));
        assert!(!prompt.contains("## 15M Analysis:"));
        assert!(prompt.contains("### Position Details"));
    }

    #[test]
    fn test_timeframe_prompts_are_distinct() {
        let prompts: Vec<_> = Timeframe::ALL.iter().map(|tf| timeframe_prompt(*tf)).collect();
        for (i, a) in prompts.iter().enumerate() {
            for b in prompts.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
        assert!(timeframe_prompt(Timeframe::M15).contains("15-minute"));
    }

    #[test]
    fn test_context_prompt_embeds_all_inputs() {
        let prompt = context_prompt("Why this stop?", "stop at 41k", "4H Analysis: long");
        assert!(prompt.contains("Why this stop?"));
        assert!(prompt.contains("\"stop at 41k\""));
        assert!(prompt.contains("4H Analysis: long"));
    }
}
