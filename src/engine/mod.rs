//! # Veridoc Engine — Pipeline Orchestrator
//!
//! Runs one document image through all six analysis stages and fuses the
//! results into a verdict:
//!
//! - `pipeline` — stage contract, result model, isolated parallel execution
//! - `fusion` — deterministic verdict fusion policy
//! - `stages/` — the six stage adapter modules
//!
//! The orchestrator owns the [`PipelineReport`] for the duration of one
//! run and hands it read-only to fusion, the serializer, and the audit
//! writer. Fusion never runs on a partial report: all six stages reach a
//! terminal state first.

pub mod fusion;
pub mod pipeline;
pub mod stages;

use crate::audit::{AuditLogWriter, AuditRecord};
use crate::detection::classifier_model::ClassifierHandle;
use crate::{VeridocError, VeridocResult};
use fusion::{fuse, FusionPolicy, Verdict};
use pipeline::{PipelineReport, StageContext, StageKind, StageStatus};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ─── Configuration ─────────────────────────────────────────────────

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Root directory for stage artifacts and the audit log.
    pub output_root: PathBuf,
    /// Reference watermark image; watermark stage skips when absent.
    pub watermark_template: Option<PathBuf>,
    /// ONNX classifier model; classifier stage skips when absent.
    pub classifier_model: Option<PathBuf>,
    /// Directory holding the two OCR models; text stage skips when absent.
    pub ocr_model_dir: Option<PathBuf>,
    /// JPEG quality used for error-level recompression.
    pub recompression_quality: u8,
    /// Minimum normalized match score to count the watermark as found.
    pub watermark_acceptance: f64,
    /// Fusion weights, thresholds, and dissent margin.
    pub fusion: FusionPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("outputs"),
            watermark_template: None,
            classifier_model: None,
            ocr_model_dir: None,
            recompression_quality: 90,
            watermark_acceptance: 0.60,
            fusion: FusionPolicy::default(),
        }
    }
}

// ─── Stage Statistics ──────────────────────────────────────────────

/// Timing and terminal state for a single stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageStats {
    pub stage: StageKind,
    pub status: StageStatus,
    pub duration_ms: u64,
}

// ─── Analysis Outcome ──────────────────────────────────────────────

/// Everything one run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    /// Human-readable description of the input (file path or caller tag).
    pub source: String,
    pub report: PipelineReport,
    pub verdict: Verdict,
    pub stage_stats: Vec<StageStats>,
    pub duration_ms: u64,
    pub engine_version: String,
}

// ─── Engine ────────────────────────────────────────────────────────

/// The veridoc analysis engine.
pub struct VeridocEngine {
    config: EngineConfig,
    classifier: Arc<ClassifierHandle>,
}

impl VeridocEngine {
    pub fn new(config: EngineConfig) -> Self {
        let classifier = Arc::new(ClassifierHandle::new(config.classifier_model.clone()));
        Self { config, classifier }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Analyze a document image from disk.
    ///
    /// An unreadable or undecodable input is the one fatal fault: it
    /// aborts the run before any stage starts.
    pub fn analyze_file(&self, path: &Path) -> VeridocResult<AnalysisOutcome> {
        let image = image::open(path).map_err(VeridocError::ImageDecode)?.to_rgb8();
        self.analyze_image(image, path.display().to_string(), Some(path.to_path_buf()))
    }

    /// Analyze an already-decoded document image.
    pub fn analyze_image(
        &self,
        image: image::RgbImage,
        source: String,
        source_path: Option<PathBuf>,
    ) -> VeridocResult<AnalysisOutcome> {
        let start = std::time::Instant::now();
        tracing::info!("═══════════════════════════════════════════════════════");
        tracing::info!("veridoc analysis: {}", source);
        tracing::info!("═══════════════════════════════════════════════════════");

        let ctx = StageContext::new(
            self.config.clone(),
            Arc::new(image),
            source_path,
            Arc::clone(&self.classifier),
        );

        // All six stages, fault-isolated, joined in fixed order.
        let analysis_stages = stages::build_analysis_stages();
        let results = pipeline::run_stages_parallel(&analysis_stages, &ctx);

        let mut stage_stats = Vec::with_capacity(results.len());
        let mut stage_results = Vec::with_capacity(results.len());
        for (stats, result) in results {
            stage_stats.push(stats);
            stage_results.push(result);
        }
        let report = PipelineReport::from_results(stage_results);

        // Fusion runs only on the complete report.
        let verdict = fuse(&report, &self.config.fusion);

        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            "verdict: {} (confidence {:.2}, composite {:?}) in {}ms",
            verdict.label,
            verdict.confidence,
            verdict.composite_score,
            duration_ms
        );

        let outcome = AnalysisOutcome {
            source,
            report,
            verdict,
            stage_stats,
            duration_ms,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
        };

        // Persistence failure is logged, never fatal: the caller still
        // gets its verdict.
        let writer = AuditLogWriter::new(&self.config.output_root);
        match writer.write_last_run(&AuditRecord::new(&outcome)) {
            Ok(path) => tracing::info!("audit record written to {}", path.display()),
            Err(e) => tracing::warn!("audit log write failed: {e}"),
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn analyze_missing_file_is_fatal() {
        let engine = VeridocEngine::new(EngineConfig::default());
        let err = engine
            .analyze_file(Path::new("/nonexistent/document.png"))
            .unwrap_err();
        assert!(matches!(err, VeridocError::ImageDecode(_)));
    }

    #[test]
    fn analyze_image_always_yields_six_stage_results() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig {
            output_root: dir.path().to_path_buf(),
            ..EngineConfig::default()
        };
        let engine = VeridocEngine::new(config);
        let image = RgbImage::from_pixel(64, 64, image::Rgb([255, 255, 255]));
        let outcome = engine
            .analyze_image(image, "test".to_string(), None)
            .unwrap();
        assert_eq!(outcome.report.stages().len(), 6);
        assert_eq!(outcome.stage_stats.len(), 6);
        // Unconfigured resources skip, configured-free stages run.
        assert_eq!(
            outcome.report.stage(StageKind::Watermark).status,
            StageStatus::Skipped
        );
        assert_eq!(
            outcome.report.stage(StageKind::TamperTrace).status,
            StageStatus::Ok
        );
    }
}
