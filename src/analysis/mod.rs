//! Chart analysis domain: timeframes, uploaded images, and result sets
//!
//! This module owns the data model shared by the classifier and the
//! pipeline orchestrator:
//!
//! ```text
//! UploadBatch ──classify──▶ UploadedImage{status} ──▶ TimeframeImageSet
//!                                                          │
//!                                          AnalysisPipeline::run
//!                                                          ▼
//!                                  PipelineSnapshot{state, progress, results}
//! ```
//!
//! Timeframes always iterate in the fixed order `4h, 1h, 15m, 5m`. That order
//! drives both the stage sequence and the representative-image priority.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod classifier;
pub mod pipeline;
pub mod report;
pub mod upload;

// ─────────────────────────────────────────────────────────────────────────────
// Timeframe and Stage
// ─────────────────────────────────────────────────────────────────────────────

/// A fixed chart granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "5m")]
    M5,
}

impl Timeframe {
    /// All timeframes in pipeline order
    pub const ALL: [Timeframe; 4] = [Timeframe::H4, Timeframe::H1, Timeframe::M15, Timeframe::M5];

    /// Slot index in fixed-size per-timeframe arrays
    pub fn index(self) -> usize {
        match self {
            Timeframe::H4 => 0,
            Timeframe::H1 => 1,
            Timeframe::M15 => 2,
            Timeframe::M5 => 3,
        }
    }

    /// Canonical lowercase label ("4h", "15m", ...)
    pub fn label(self) -> &'static str {
        match self {
            Timeframe::H4 => "4h",
            Timeframe::H1 => "1h",
            Timeframe::M15 => "15m",
            Timeframe::M5 => "5m",
        }
    }

    /// Uppercase heading used in prompts and tabs ("4H", "15M", ...)
    pub fn heading(self) -> &'static str {
        match self {
            Timeframe::H4 => "4H",
            Timeframe::H1 => "1H",
            Timeframe::M15 => "15M",
            Timeframe::M5 => "5M",
        }
    }

    /// Resolve a textual alias, case-insensitively
    ///
    /// Accepted: `4h`, `1h`, `15m`/`15min`, `5m`/`5min`. Surrounding
    /// whitespace is ignored; anything else (including "unknown") is `None`.
    pub fn from_alias(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "4h" => Some(Timeframe::H4),
            "1h" => Some(Timeframe::H1),
            "15m" | "15min" => Some(Timeframe::M15),
            "5m" | "5min" => Some(Timeframe::M5),
            _ => None,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One unit of orchestrated work: a timeframe analysis or the final aggregation
///
/// Doubles as the key type of [`AnalysisResultSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Timeframe(Timeframe),
    Final,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Timeframe(tf) => tf.label(),
            Stage::Final => "final",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Timeframe(tf) => write!(f, "{} analysis", tf.label()),
            Stage::Final => f.write_str("final aggregation"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Images
// ─────────────────────────────────────────────────────────────────────────────

/// Raw chart image handed to the vision service
///
/// `Bytes` keeps clones cheap: the same buffer is shared between the upload
/// batch, the timeframe slot, and in-flight requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartImage {
    /// Display name (file name for uploads)
    pub name: String,
    /// MIME type, e.g. "image/png"
    pub mime: &'static str,
    pub bytes: Bytes,
}

impl ChartImage {
    pub fn new(name: impl Into<String>, mime: &'static str, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime,
            bytes: bytes.into(),
        }
    }

    /// Size in megabytes for display
    pub fn size_mb(&self) -> f64 {
        self.bytes.len() as f64 / 1024.0 / 1024.0
    }
}

/// Outcome of classifying one image
///
/// An upload is either still pending, detected, or failed; never both
/// detected and failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Pending,
    Detected(Timeframe),
    Failed(String),
}

/// An image the user added, plus its classification outcome
#[derive(Debug, Clone)]
pub struct UploadedImage {
    /// Stable id within the batch (survives reordering, invalidated by clear)
    pub id: u64,
    pub image: ChartImage,
    status: Classification,
}

impl UploadedImage {
    pub fn new(id: u64, image: ChartImage) -> Self {
        Self {
            id,
            image,
            status: Classification::Pending,
        }
    }

    pub fn status(&self) -> &Classification {
        &self.status
    }

    pub fn is_pending(&self) -> bool {
        self.status == Classification::Pending
    }

    pub fn detected_timeframe(&self) -> Option<Timeframe> {
        match self.status {
            Classification::Detected(tf) => Some(tf),
            _ => None,
        }
    }

    pub fn classification_error(&self) -> Option<&str> {
        match &self.status {
            Classification::Failed(msg) => Some(msg.as_str()),
            _ => None,
        }
    }

    /// Record the classifier's outcome
    ///
    /// Only the first outcome sticks; returns false if the image was already
    /// classified or the outcome is `Pending`.
    pub fn record(&mut self, outcome: Classification) -> bool {
        if !self.is_pending() || outcome == Classification::Pending {
            return false;
        }
        self.status = outcome;
        true
    }
}

/// Mapping from each timeframe to at most one image
///
/// Later inserts for the same timeframe overwrite the earlier slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeframeImageSet {
    slots: [Option<ChartImage>; 4],
}

impl TimeframeImageSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, timeframe: Timeframe, image: ChartImage) {
        self.slots[timeframe.index()] = Some(image);
    }

    pub fn get(&self, timeframe: Timeframe) -> Option<&ChartImage> {
        self.slots[timeframe.index()].as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Present slots in fixed pipeline order
    pub fn present(&self) -> impl Iterator<Item = (Timeframe, &ChartImage)> {
        Timeframe::ALL
            .into_iter()
            .filter_map(move |tf| self.get(tf).map(|img| (tf, img)))
    }

    /// Image sent alongside the aggregation prompt: 4h > 1h > 15m > 5m
    pub fn representative(&self) -> Option<&ChartImage> {
        self.present().next().map(|(_, img)| img)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Results and progress
// ─────────────────────────────────────────────────────────────────────────────

/// Per-stage result texts of one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisResultSet {
    #[serde(rename = "timeframes")]
    timeframe_results: [Option<String>; 4],
    #[serde(rename = "final")]
    final_result: Option<String>,
}

impl AnalysisResultSet {
    pub fn get(&self, stage: Stage) -> Option<&str> {
        match stage {
            Stage::Timeframe(tf) => self.timeframe_results[tf.index()].as_deref(),
            Stage::Final => self.final_result.as_deref(),
        }
    }

    pub fn insert(&mut self, stage: Stage, text: String) {
        match stage {
            Stage::Timeframe(tf) => self.timeframe_results[tf.index()] = Some(text),
            Stage::Final => self.final_result = Some(text),
        }
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.final_result.is_none() && self.timeframe_results.iter().all(Option::is_none)
    }

    /// Timeframe results in fixed order, skipping missing ones
    pub fn timeframes(&self) -> impl Iterator<Item = (Timeframe, &str)> {
        Timeframe::ALL.into_iter().filter_map(move |tf| {
            self.timeframe_results[tf.index()]
                .as_deref()
                .map(|text| (tf, text))
        })
    }

    pub fn final_recommendation(&self) -> Option<&str> {
        self.final_result.as_deref()
    }
}

/// Progress of the current (or last) pipeline run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineProgress {
    /// Stage being executed; `None` when idle or finished
    pub current_stage: Option<Stage>,
    pub completed: usize,
    /// Present timeframes + 1 for the final aggregation
    pub total: usize,
}

impl PipelineProgress {
    /// Fractional progress as a percentage (0-100)
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.completed as f64 / self.total as f64) * 100.0
    }
}
