//! Analysis pipeline orchestrator
//!
//! Runs one analysis call per present timeframe in fixed order, then a single
//! aggregation call over every text produced. State is published as whole
//! [`PipelineSnapshot`] values on a `watch` channel so observers (the TUI, the
//! headless progress printer, tests) always read a fully-formed value.
//!
//! # State machine
//!
//! ```text
//! Idle ──run──▶ Running(4h) ─▶ Running(1h) ─▶ ... ─▶ Running(final) ──▶ Completed
//!                    │              │                       │
//!                    └──────────────┴───── any failure ─────┴──────────▶ Failed(msg)
//! ```
//!
//! Stages whose image slot is empty are never entered. A failure aborts the
//! rest of the run; results already stored stay in the snapshot.

use super::{AnalysisResultSet, PipelineProgress, Stage, TimeframeImageSet};
use crate::vision::{prompts, VisionError, VisionProvider};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Shown when `run` is attempted without any classified image
pub const NO_IMAGES_MESSAGE: &str = "Please upload at least one chart with a detected timeframe.";

/// Lifecycle of the pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "lowercase")]
pub enum RunState {
    #[default]
    Idle,
    Running(Stage),
    Completed,
    Failed(String),
}

impl RunState {
    pub fn is_running(&self) -> bool {
        matches!(self, RunState::Running(_))
    }
}

/// Everything an observer needs to render the pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineSnapshot {
    pub state: RunState,
    pub progress: PipelineProgress,
    pub results: AnalysisResultSet,
}

/// Errors returned by [`AnalysisPipeline::run`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Validation: no image has a detected timeframe
    NoClassifiedImages,
    /// A run is already in progress
    AlreadyRunning,
    /// A stage's external call failed; the run was aborted
    Stage { stage: Stage, source: VisionError },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoClassifiedImages => f.write_str(NO_IMAGES_MESSAGE),
            Self::AlreadyRunning => f.write_str("An analysis is already running"),
            // Surfaced verbatim
            Self::Stage { source, .. } => write!(f, "{}", source),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Stage { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Ordered task list for one run with a single active-stage cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    stages: Vec<Stage>,
    cursor: usize,
}

impl RunPlan {
    /// Present timeframes in fixed order, then `Final`
    pub fn for_images(images: &TimeframeImageSet) -> Self {
        let mut stages: Vec<Stage> = images
            .present()
            .map(|(tf, _)| Stage::Timeframe(tf))
            .collect();
        stages.push(Stage::Final);
        Self { stages, cursor: 0 }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn total(&self) -> usize {
        self.stages.len()
    }

    pub fn current(&self) -> Option<Stage> {
        self.stages.get(self.cursor).copied()
    }

    /// Move to the next stage, returning it
    pub fn advance(&mut self) -> Option<Stage> {
        if self.cursor < self.stages.len() {
            self.cursor += 1;
        }
        self.current()
    }
}

/// Sequential orchestrator over a shared vision provider
pub struct AnalysisPipeline {
    provider: Arc<dyn VisionProvider>,
    snapshot: watch::Sender<PipelineSnapshot>,
}

impl AnalysisPipeline {
    pub fn new(provider: Arc<dyn VisionProvider>) -> Self {
        let (snapshot, _) = watch::channel(PipelineSnapshot::default());
        Self { provider, snapshot }
    }

    /// Observe snapshots; every mutation replaces the whole value
    pub fn subscribe(&self) -> watch::Receiver<PipelineSnapshot> {
        self.snapshot.subscribe()
    }

    /// Latest snapshot (cloned)
    pub fn snapshot(&self) -> PipelineSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Fail fast before any network call
    pub fn validate(images: &TimeframeImageSet) -> Result<(), PipelineError> {
        if images.is_empty() {
            return Err(PipelineError::NoClassifiedImages);
        }
        Ok(())
    }

    /// Return to `Idle` with empty results
    ///
    /// Refused while a run is in progress; returns whether the reset happened.
    pub fn reset(&self) -> bool {
        self.snapshot.send_if_modified(|snap| {
            if snap.state.is_running() {
                return false;
            }
            *snap = PipelineSnapshot::default();
            true
        })
    }

    /// Execute one full run over `images`
    ///
    /// Returns the complete result set on success. On a stage failure the
    /// snapshot moves to `Failed` and keeps whatever results were stored.
    pub async fn run(&self, images: &TimeframeImageSet) -> Result<AnalysisResultSet, PipelineError> {
        self.run_observed(images, |_, _| {}).await
    }

    /// [`run`](Self::run), calling `on_stage` as each stage starts
    ///
    /// Unlike a snapshot subscriber, which may miss stages that finish
    /// between wakeups, `on_stage` sees every stage.
    pub async fn run_observed(
        &self,
        images: &TimeframeImageSet,
        mut on_stage: impl FnMut(Stage, PipelineProgress) + Send,
    ) -> Result<AnalysisResultSet, PipelineError> {
        Self::validate(images)?;

        let mut plan = RunPlan::for_images(images);
        let total = plan.total();
        let Some(first) = plan.current() else {
            return Err(PipelineError::NoClassifiedImages);
        };

        let started = self.snapshot.send_if_modified(|snap| {
            if snap.state.is_running() {
                return false;
            }
            *snap = PipelineSnapshot {
                state: RunState::Running(first),
                progress: PipelineProgress {
                    current_stage: Some(first),
                    completed: 0,
                    total,
                },
                results: AnalysisResultSet::default(),
            };
            true
        });
        if !started {
            return Err(PipelineError::AlreadyRunning);
        }

        tracing::info!(
            stages = ?plan.stages(),
            provider = self.provider.name(),
            "Starting analysis run"
        );

        let mut results = AnalysisResultSet::default();
        let mut stage = Some(first);

        while let Some(current) = stage {
            let mut progress = PipelineProgress::default();
            self.snapshot.send_modify(|snap| {
                snap.state = RunState::Running(current);
                snap.progress.current_stage = Some(current);
                progress = snap.progress;
            });
            on_stage(current, progress);

            match self.execute(current, images, &results).await {
                Ok(text) => {
                    tracing::info!(stage = %current, chars = text.len(), "Stage complete");
                    results.insert(current, text.clone());
                    self.snapshot.send_modify(|snap| {
                        snap.results.insert(current, text);
                        snap.progress.completed += 1;
                    });
                }
                Err(source) => {
                    tracing::error!(stage = %current, error = %source, "Stage failed, aborting run");
                    let message = source.to_string();
                    self.snapshot.send_modify(|snap| {
                        snap.state = RunState::Failed(message);
                        snap.progress.current_stage = None;
                    });
                    return Err(PipelineError::Stage {
                        stage: current,
                        source,
                    });
                }
            }

            stage = plan.advance();
        }

        self.snapshot.send_modify(|snap| {
            snap.state = RunState::Completed;
            snap.progress.current_stage = None;
        });
        tracing::info!("Analysis run completed");

        Ok(results)
    }

    async fn execute(
        &self,
        stage: Stage,
        images: &TimeframeImageSet,
        results: &AnalysisResultSet,
    ) -> Result<String, VisionError> {
        match stage {
            Stage::Timeframe(tf) => {
                // Plan only contains present timeframes
                let image = images
                    .get(tf)
                    .ok_or_else(|| VisionError::Parse(format!("no image for {}", tf)))?;
                self.provider
                    .analyze(image, prompts::timeframe_prompt(tf))
                    .await
            }
            Stage::Final => {
                let image = images
                    .representative()
                    .ok_or_else(|| VisionError::Parse("no representative image".to_string()))?;
                let prompt = prompts::final_prompt(results);
                self.provider.analyze(image, &prompt).await
            }
        }
    }
}
