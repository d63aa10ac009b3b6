//! Stage 1: tamper traces via error-level analysis

use crate::detection::error_level;
use crate::engine::pipeline::{
    AnalysisStage, StageContext, StageDetail, StageKind, StageResult,
};
use crate::VeridocResult;
use image::DynamicImage;

/// Mean recompression difference (0–255 scale) at which the anomaly
/// score saturates. Clean scans sit well below this.
const SCORE_SATURATION: f64 = 24.0;

pub struct TamperTraceStage;

impl TamperTraceStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TamperTraceStage {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisStage for TamperTraceStage {
    fn kind(&self) -> StageKind {
        StageKind::TamperTrace
    }

    fn run(&self, ctx: &StageContext) -> VeridocResult<StageResult> {
        let analysis =
            error_level::compute_error_levels(&ctx.image, ctx.config.recompression_quality)?;

        let score = (analysis.mean_difference / SCORE_SATURATION).min(1.0);
        let artifact = super::save_image_artifact(
            ctx,
            self.kind(),
            "ela_heatmap.png",
            &DynamicImage::ImageLuma8(analysis.heatmap.clone()),
        );

        Ok(StageResult::ok(
            self.kind(),
            Some(score),
            StageDetail::TamperTrace {
                mean_difference: analysis.mean_difference,
                max_difference: analysis.max_difference,
                recompression_quality: ctx.config.recompression_quality,
            },
            artifact,
        ))
    }
}
