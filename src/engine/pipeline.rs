//! Stage pipeline — uniform stage contract, result model, isolated execution
//!
//! Each forensic detector is wrapped by an adapter implementing
//! [`AnalysisStage`], returning one [`StageResult`] per run. The pipeline
//! executes all stages against an immutable [`StageContext`] and joins the
//! results back into the fixed stage order, so the assembled
//! [`PipelineReport`] is identical regardless of execution order or
//! concurrency degree.
//!
//! Stages are:
//! - **Self-contained**: each owns its detector wiring
//! - **Immutable**: `run()` takes `&self` and `&StageContext`
//! - **Parallelizable**: stages run concurrently via rayon
//! - **Failure-isolated**: errors and panics become `failed` results

use crate::detection::classifier_model::{ClassLabel, ClassifierHandle};
use crate::VeridocResult;
use super::{EngineConfig, StageStats};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

// ─── Stage Identity ────────────────────────────────────────────────

/// The six fixed analysis stages, in pipeline order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    TamperTrace,
    TextExtraction,
    CodeSymbol,
    Watermark,
    Layout,
    Classifier,
}

impl StageKind {
    /// Every stage in the fixed pipeline order. Reports, rationales and
    /// audit records all follow this order.
    pub const ALL: [StageKind; 6] = [
        StageKind::TamperTrace,
        StageKind::TextExtraction,
        StageKind::CodeSymbol,
        StageKind::Watermark,
        StageKind::Layout,
        StageKind::Classifier,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StageKind::TamperTrace => "tamper_trace",
            StageKind::TextExtraction => "text_extraction",
            StageKind::CodeSymbol => "code_symbol",
            StageKind::Watermark => "watermark",
            StageKind::Layout => "layout",
            StageKind::Classifier => "classifier",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Terminal state of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// The detector ran and produced a normalized result.
    Ok,
    /// The detector errored or panicked; only an error description remains.
    Failed,
    /// The stage's external resource is deliberately not configured.
    Skipped,
}

// ─── Geometry & Detail Payloads ────────────────────────────────────

/// Axis-aligned pixel rectangle in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Pixel point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

/// One recognized text line with its position on the page.
///
/// `bounds` is bulk pixel geometry: the transport serializer drops it,
/// the audit log keeps it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedLine {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<PixelRect>,
}

/// One decoded machine-readable code symbol.
///
/// `corners` is bulk pixel geometry: the transport serializer drops it,
/// the audit log keeps it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedSymbol {
    /// Symbology identifier, e.g. `"qr"`.
    pub symbol_type: String,
    /// Decoded payload.
    pub data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corners: Option<Vec<PixelPoint>>,
}

/// Structure metrics computed by the layout stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StructureMetrics {
    /// Width / height of the page.
    pub aspect_ratio: f64,
    /// Mean luminance of the outer border frame, 0 (black) to 1 (white).
    pub border_whiteness: f64,
    /// Fraction of pixels that are edge pixels.
    pub edge_density: f64,
    /// Number of horizontal text bands found by projection profiling.
    pub text_band_count: usize,
}

/// Kind-specific stage payload. Tagged by stage so heterogeneous details
/// (text vs. geometry vs. class label) serialize under one shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageDetail {
    TamperTrace {
        /// Mean per-pixel recompression difference, 0–255 scale.
        mean_difference: f64,
        /// Maximum per-pixel recompression difference, 0–255 scale.
        max_difference: f64,
        recompression_quality: u8,
    },
    TextExtraction {
        /// Full recognized text, lines joined with `\n`.
        text: String,
        word_count: usize,
        /// Document-keyword hits found in the recognized text.
        keywords: Vec<String>,
        lines: Vec<ExtractedLine>,
    },
    CodeSymbol {
        detected: bool,
        symbols: Vec<DecodedSymbol>,
        /// Symbol grids located but not decodable — a forgery tell.
        undecodable: usize,
    },
    Watermark {
        template_found: bool,
        /// Normalized cross-correlation of the best match, 0–1.
        match_score: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        region: Option<PixelRect>,
    },
    Layout {
        valid: bool,
        metrics: StructureMetrics,
    },
    Classifier {
        label: ClassLabel,
        /// Probability assigned to the reported label.
        probability: f64,
    },
    /// Error description for a `failed` or `skipped` stage.
    Error { message: String },
}

// ─── Stage Result ──────────────────────────────────────────────────

/// Uniform result of one analysis stage.
///
/// Invariant: a stage with `status != ok` carries no `score` and its
/// `detail` is an error description only. Construct through
/// [`StageResult::ok`] / [`StageResult::failed`] / [`StageResult::skipped`]
/// to keep the invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: StageKind,
    pub status: StageStatus,
    /// Normalized anomaly score: 0 = fully authentic signal,
    /// 1 = maximal anomaly. Absent for failed/skipped stages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    pub detail: StageDetail,
    /// Path to a visualization artifact produced as a side effect.
    /// Written once by the stage, never mutated afterwards.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_ref: Option<PathBuf>,
}

impl StageResult {
    /// A successful stage result. `score` is clamped to [0, 1].
    pub fn ok(
        stage: StageKind,
        score: Option<f64>,
        detail: StageDetail,
        artifact_ref: Option<PathBuf>,
    ) -> Self {
        Self {
            stage,
            status: StageStatus::Ok,
            score: score.map(|s| s.clamp(0.0, 1.0)),
            detail,
            artifact_ref,
        }
    }

    /// A failed stage: no score, error detail only.
    pub fn failed(stage: StageKind, message: impl Into<String>) -> Self {
        Self {
            stage,
            status: StageStatus::Failed,
            score: None,
            detail: StageDetail::Error {
                message: message.into(),
            },
            artifact_ref: None,
        }
    }

    /// A deliberately skipped stage (external resource not configured).
    pub fn skipped(stage: StageKind, message: impl Into<String>) -> Self {
        Self {
            stage,
            status: StageStatus::Skipped,
            score: None,
            detail: StageDetail::Error {
                message: message.into(),
            },
            artifact_ref: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == StageStatus::Ok
    }
}

// ─── Pipeline Report ───────────────────────────────────────────────

/// The assembled output of one pipeline run: exactly one [`StageResult`]
/// per stage, in the fixed stage order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    stages: Vec<StageResult>,
}

impl PipelineReport {
    /// Assemble a report from raw stage results.
    ///
    /// Results are reordered into [`StageKind::ALL`] order. The first
    /// result per stage wins; a stage with no result at all is recorded
    /// as `failed` so the six-entry guarantee holds unconditionally.
    pub fn from_results(results: Vec<StageResult>) -> Self {
        let stages = StageKind::ALL
            .iter()
            .map(|kind| {
                results
                    .iter()
                    .find(|r| r.stage == *kind)
                    .cloned()
                    .unwrap_or_else(|| {
                        StageResult::failed(*kind, "stage produced no result")
                    })
            })
            .collect();
        Self { stages }
    }

    pub fn stages(&self) -> &[StageResult] {
        &self.stages
    }

    pub fn stage(&self, kind: StageKind) -> &StageResult {
        // from_results guarantees one entry per kind in ALL order
        &self.stages[StageKind::ALL
            .iter()
            .position(|k| *k == kind)
            .expect("StageKind::ALL covers every kind")]
    }

    /// Stages that reported `ok`, in fixed order.
    pub fn ok_stages(&self) -> impl Iterator<Item = &StageResult> {
        self.stages.iter().filter(|s| s.is_ok())
    }
}

// ─── Stage Context ─────────────────────────────────────────────────

/// Immutable shared context handed to every stage.
///
/// Stages get read-only access to the same decoded image; the classifier
/// model handle is shared and lazily initialized exactly once per process
/// lifetime.
pub struct StageContext {
    pub config: EngineConfig,
    pub image: Arc<RgbImage>,
    /// Originating file path, when the image came from disk.
    pub source_path: Option<PathBuf>,
    pub classifier: Arc<ClassifierHandle>,
}

impl StageContext {
    pub fn new(
        config: EngineConfig,
        image: Arc<RgbImage>,
        source_path: Option<PathBuf>,
        classifier: Arc<ClassifierHandle>,
    ) -> Self {
        Self {
            config,
            image,
            source_path,
            classifier,
        }
    }

    /// Output location for a stage's visualization artifact.
    pub fn artifact_path(&self, stage: StageKind, file_name: &str) -> PathBuf {
        self.config.output_root.join(stage.name()).join(file_name)
    }
}

// ─── Stage Trait ───────────────────────────────────────────────────

/// One analysis stage wrapping an opaque detector.
///
/// `run` may return `Err` for any internal failure; the pipeline absorbs
/// it into a `failed` [`StageResult`]. A stage must clamp any continuous
/// detector output into a [0, 1] anomaly score before reporting it
/// (0 = authentic signal, 1 = maximal anomaly).
pub trait AnalysisStage: Send + Sync {
    fn kind(&self) -> StageKind;

    fn run(&self, ctx: &StageContext) -> VeridocResult<StageResult>;
}

// ─── Pipeline Execution ────────────────────────────────────────────

/// Execute a single stage with timing, logging, and fault isolation.
///
/// Errors and panics never escape: both become a `failed` result.
pub fn run_stage_guarded(
    stage: &dyn AnalysisStage,
    ctx: &StageContext,
) -> (StageStats, StageResult) {
    let kind = stage.kind();
    let start = std::time::Instant::now();
    tracing::info!("→ {}", kind);

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| stage.run(ctx)));

    let duration_ms = start.elapsed().as_millis() as u64;

    let result = match outcome {
        Ok(Ok(result)) => {
            tracing::info!(
                "  ✓ {} completed in {}ms (status={:?}, score={:?})",
                kind,
                duration_ms,
                result.status,
                result.score
            );
            result
        }
        Ok(Err(e)) => {
            tracing::error!("  ✗ {} failed: {} ({}ms)", kind, e, duration_ms);
            StageResult::failed(kind, e.to_string())
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "stage panicked".to_string());
            tracing::error!("  ✗ {} panicked: {} ({}ms)", kind, message, duration_ms);
            StageResult::failed(kind, format!("panic: {message}"))
        }
    };

    (
        StageStats {
            stage: kind,
            status: result.status,
            duration_ms,
        },
        result,
    )
}

/// Execute all stages concurrently and join results back into the fixed
/// stage order. Each stage's fault is isolated to its own task; a failing
/// stage never cancels its siblings.
pub fn run_stages_parallel(
    stages: &[Box<dyn AnalysisStage>],
    ctx: &StageContext,
) -> Vec<(StageStats, StageResult)> {
    use rayon::prelude::*;

    let mut results: Vec<(StageStats, StageResult)> = stages
        .par_iter()
        .map(|stage| run_stage_guarded(stage.as_ref(), ctx))
        .collect();

    // Deterministic join: fixed stage order regardless of scheduling.
    results.sort_by_key(|(stats, _)| {
        StageKind::ALL
            .iter()
            .position(|k| *k == stats.stage)
            .expect("StageKind::ALL covers every kind")
    });
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;

    struct PanickingStage(StageKind);

    impl AnalysisStage for PanickingStage {
        fn kind(&self) -> StageKind {
            self.0
        }
        fn run(&self, _ctx: &StageContext) -> VeridocResult<StageResult> {
            panic!("detector blew up");
        }
    }

    struct ConstStage(StageKind, f64);

    impl AnalysisStage for ConstStage {
        fn kind(&self) -> StageKind {
            self.0
        }
        fn run(&self, _ctx: &StageContext) -> VeridocResult<StageResult> {
            Ok(StageResult::ok(
                self.0,
                Some(self.1),
                StageDetail::TamperTrace {
                    mean_difference: 0.0,
                    max_difference: 0.0,
                    recompression_quality: 90,
                },
                None,
            ))
        }
    }

    fn test_ctx() -> StageContext {
        StageContext::new(
            EngineConfig::default(),
            Arc::new(RgbImage::from_pixel(16, 16, image::Rgb([255, 255, 255]))),
            None,
            Arc::new(ClassifierHandle::new(None)),
        )
    }

    #[test]
    fn panic_is_isolated_into_failed_result() {
        let ctx = test_ctx();
        let stage = PanickingStage(StageKind::Watermark);
        let (stats, result) = run_stage_guarded(&stage, &ctx);
        assert_eq!(stats.status, StageStatus::Failed);
        assert_eq!(result.status, StageStatus::Failed);
        assert!(result.score.is_none());
        assert!(matches!(result.detail, StageDetail::Error { ref message } if message.contains("detector blew up")));
    }

    #[test]
    fn parallel_results_join_in_fixed_order() {
        let ctx = test_ctx();
        // Deliberately out of pipeline order.
        let stages: Vec<Box<dyn AnalysisStage>> = vec![
            Box::new(ConstStage(StageKind::Classifier, 0.5)),
            Box::new(PanickingStage(StageKind::TamperTrace)),
            Box::new(ConstStage(StageKind::Watermark, 0.1)),
        ];
        let results = run_stages_parallel(&stages, &ctx);
        let kinds: Vec<StageKind> = results.iter().map(|(s, _)| s.stage).collect();
        assert_eq!(
            kinds,
            vec![StageKind::TamperTrace, StageKind::Watermark, StageKind::Classifier]
        );
    }

    #[test]
    fn report_always_has_six_entries() {
        let report = PipelineReport::from_results(vec![StageResult::ok(
            StageKind::Layout,
            Some(0.2),
            StageDetail::Layout {
                valid: true,
                metrics: StructureMetrics {
                    aspect_ratio: 0.7,
                    border_whiteness: 0.9,
                    edge_density: 0.05,
                    text_band_count: 5,
                },
            },
            None,
        )]);
        assert_eq!(report.stages().len(), 6);
        assert_eq!(report.stage(StageKind::Layout).status, StageStatus::Ok);
        assert_eq!(
            report.stage(StageKind::Classifier).status,
            StageStatus::Failed
        );
    }

    #[test]
    fn ok_constructor_clamps_score() {
        let r = StageResult::ok(
            StageKind::TamperTrace,
            Some(3.5),
            StageDetail::Error {
                message: String::new(),
            },
            None,
        );
        assert_eq!(r.score, Some(1.0));
    }
}
