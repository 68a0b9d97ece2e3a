// Headless mode: `tradelens analyze IMAGES... [--json]`
//
// Loads and classifies the images, runs the pipeline, and prints the
// results. Progress goes to stderr (one line per stage, reported from the
// run loop) so stdout carries only the report. Partial results are printed
// on failure.

use crate::analysis::pipeline::{AnalysisPipeline, RunState};
use crate::analysis::report::to_markdown;
use crate::analysis::upload::{load_images, UploadBatch};
use crate::analysis::{AnalysisResultSet, ChartImage, Stage, Timeframe};
use crate::config::Config;
use crate::vision::{create_provider, VisionProvider};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct UploadSummary {
    pub name: String,
    pub timeframe: Option<Timeframe>,
    pub error: Option<String>,
}

/// Everything a headless run produced
#[derive(Debug, Serialize)]
pub struct HeadlessReport {
    pub uploads: Vec<UploadSummary>,
    pub state: RunState,
    pub error: Option<String>,
    /// Keyed by stage label ("4h", "1h", "15m", "5m", "final")
    pub results: BTreeMap<&'static str, String>,
    /// The same results, as the pipeline produced them
    #[serde(skip)]
    pub result_set: AnalysisResultSet,
}

impl HeadlessReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

fn result_map(results: &AnalysisResultSet) -> BTreeMap<&'static str, String> {
    Timeframe::ALL
        .into_iter()
        .map(Stage::Timeframe)
        .chain([Stage::Final])
        .filter_map(|stage| Some((stage.label(), results.get(stage)?.to_string())))
        .collect()
}

/// Classify `images` and run the pipeline over them
///
/// `on_stage` is called once for every stage as it starts, with the
/// completed and total stage counts.
pub async fn analyze_images(
    provider: Arc<dyn VisionProvider>,
    images: Vec<ChartImage>,
    mut on_stage: impl FnMut(Stage, usize, usize) + Send,
) -> HeadlessReport {
    let mut batch = UploadBatch::new();
    for image in images {
        batch.add(image);
    }
    batch.classify_pending(provider.as_ref()).await;

    let uploads = batch
        .uploads()
        .iter()
        .map(|upload| UploadSummary {
            name: upload.image.name.clone(),
            timeframe: upload.detected_timeframe(),
            error: upload.classification_error().map(str::to_string),
        })
        .collect();

    let pipeline = AnalysisPipeline::new(provider);
    let outcome = pipeline
        .run_observed(&batch.image_set(), |stage, progress| {
            on_stage(stage, progress.completed, progress.total)
        })
        .await;
    let snapshot = pipeline.snapshot();

    let (results, error) = match outcome {
        Ok(results) => (results, None),
        Err(e) => (snapshot.results, Some(e.to_string())),
    };

    HeadlessReport {
        uploads,
        state: snapshot.state,
        error,
        results: result_map(&results),
        result_set: results,
    }
}

/// Run `tradelens analyze`; returns whether the analysis succeeded
pub async fn run_analyze(config: &Config, paths: &[PathBuf], json: bool) -> Result<bool> {
    let provider = create_provider(&config.provider);

    let (images, errors) = load_images(paths).await;
    for error in &errors {
        eprintln!("Skipped: {}", error);
    }
    eprintln!(
        "Classifying {} chart(s) with {}...",
        images.len(),
        provider.name()
    );

    let report = analyze_images(provider, images, |stage, completed, total| {
        eprintln!("[{}/{}] {}", completed + 1, total, stage);
    })
    .await;

    for upload in &report.uploads {
        let status = match (&upload.timeframe, &upload.error) {
            (Some(tf), _) => tf.heading().to_string(),
            (None, Some(error)) => format!("ERROR: {}", error),
            (None, None) => "DETECTING...".to_string(),
        };
        eprintln!("  {:<32} {}", upload.name, status);
    }

    if json {
        let out = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", out);
    } else {
        print!("{}", to_markdown(&report.result_set));
    }

    if let Some(error) = &report.error {
        eprintln!("Analysis failed: {}", error);
    }
    Ok(report.succeeded())
}
