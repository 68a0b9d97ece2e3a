// Display sections of a finished analysis
//
// The final recommendation is split into Summary / Reasoning / Position
// Details on its headings. Every displayed block becomes a selectable region
// carrying the full context a follow-up question should see.

use super::{AnalysisResultSet, Stage, Timeframe};
use regex::Regex;
use std::sync::OnceLock;

fn reasoning_heading() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)#{2,}\s*Reasoning|\*\*Reasoning").expect("valid regex"))
}

fn position_heading() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)#{2,}\s*Position Details|\*\*Position Details").expect("valid regex")
    })
}

/// Final recommendation split for display
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverallSections {
    pub summary: String,
    pub reasoning: String,
    pub position_details: String,
}

impl OverallSections {
    /// Split on the Reasoning and Position Details headings
    ///
    /// Without a Reasoning heading the whole text is the summary.
    pub fn parse(text: &str) -> Self {
        let Some(reasoning) = reasoning_heading().find(text) else {
            return Self {
                summary: text.trim().to_string(),
                ..Self::default()
            };
        };

        let summary = text[..reasoning.start()].trim().to_string();
        let rest = &text[reasoning.end()..];

        match position_heading().find(rest) {
            Some(position) => Self {
                summary,
                reasoning: trim_heading_tail(&rest[..position.start()]),
                position_details: trim_heading_tail(&rest[position.end()..]),
            },
            None => Self {
                summary,
                reasoning: trim_heading_tail(rest),
                position_details: String::new(),
            },
        }
    }
}

/// Drop the closing `**` of a bold heading left at the start of a section
fn trim_heading_tail(section: &str) -> String {
    let trimmed = section.trim_start();
    let trimmed = trimmed.strip_prefix("**").unwrap_or(trimmed);
    let trimmed = trimmed.strip_prefix(':').unwrap_or(trimmed);
    trimmed.trim().to_string()
}

/// A block of rendered output that may originate a contextual query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectableRegion {
    pub title: &'static str,
    pub text: String,
    /// Context sent alongside follow-up questions about this region
    pub full_context: String,
}

/// Regions rendered for one results tab
///
/// Overall: one region per non-empty section, each carrying the whole final
/// recommendation as context. Timeframe tabs: a single region whose context
/// is `"<4H|1H|15M|5M> Analysis: <text>"`.
pub fn regions_for(results: &AnalysisResultSet, stage: Stage) -> Vec<SelectableRegion> {
    match stage {
        Stage::Final => {
            let Some(text) = results.final_recommendation() else {
                return Vec::new();
            };
            let sections = OverallSections::parse(text);
            [
                ("Trading Summary", sections.summary),
                ("Analysis Reasoning", sections.reasoning),
                ("Position Details", sections.position_details),
            ]
            .into_iter()
            .filter(|(_, body)| !body.is_empty())
            .map(|(title, body)| SelectableRegion {
                title,
                text: body,
                full_context: text.to_string(),
            })
            .collect()
        }
        Stage::Timeframe(tf) => match results.get(stage) {
            Some(text) => vec![SelectableRegion {
                title: tab_title(tf),
                text: text.to_string(),
                full_context: format!("{} Analysis: {}", tf.heading(), text),
            }],
            None => Vec::new(),
        },
    }
}

fn tab_title(tf: Timeframe) -> &'static str {
    match tf {
        Timeframe::H4 => "4 Hour Analysis",
        Timeframe::H1 => "1 Hour Analysis",
        Timeframe::M15 => "15 Minute Analysis",
        Timeframe::M5 => "5 Minute Analysis",
    }
}

/// Render a result set as one markdown document (headless output)
pub fn to_markdown(results: &AnalysisResultSet) -> String {
    let mut out = String::new();
    for (tf, text) in results.timeframes() {
        out.push_str(&format!("## {} Analysis\n\n{}\n\n", tf.heading(), text.trim()));
    }
    if let Some(text) = results.final_recommendation() {
        out.push_str("## Final Recommendation\n\n");
        out.push_str(text.trim());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "### Trading Summary\n- WAIT\n\n## Reasoning\n- 4H up\n\n## Position Details\n- Entry 100\n";

    #[test]
    fn test_three_sections() {
        let sections = OverallSections::parse(REPORT);
        assert_eq!(sections.summary, "### Trading Summary\n- WAIT");
        assert_eq!(sections.reasoning, "- 4H up");
        assert_eq!(sections.position_details, "- Entry 100");
    }

    #[test]
    fn test_triple_hash_and_bold_headings() {
        let text = "Bias: long\n### reasoning\nconfluence\n**Position Details**: entry 5";
        let sections = OverallSections::parse(text);
        assert_eq!(sections.summary, "Bias: long");
        assert_eq!(sections.reasoning, "confluence");
        assert_eq!(sections.position_details, "entry 5");
    }

    #[test]
    fn test_no_reasoning_heading_is_all_summary() {
        let sections = OverallSections::parse("just buy\n## Position Details\nentry");
        assert_eq!(sections.summary, "just buy\n## Position Details\nentry");
        assert!(sections.reasoning.is_empty());
        assert!(sections.position_details.is_empty());
    }

    #[test]
    fn test_regions_carry_full_context() {
        let mut results = AnalysisResultSet::default();
        results.insert(Stage::Final, REPORT.to_string());
        results.insert(Stage::Timeframe(Timeframe::M15), "range".to_string());

        let overall = regions_for(&results, Stage::Final);
        assert_eq!(overall.len(), 3);
        assert!(overall.iter().all(|r| r.full_context == REPORT));

        let m15 = regions_for(&results, Stage::Timeframe(Timeframe::M15));
        assert_eq!(m15.len(), 1);
        assert_eq!(m15[0].full_context, "15M Analysis: range");

        assert!(regions_for(&results, Stage::Timeframe(Timeframe::H4)).is_empty());
    }
}
