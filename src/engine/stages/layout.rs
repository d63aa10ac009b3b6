//! Stage 5: document layout structure checks

use crate::detection::structure;
use crate::engine::pipeline::{
    AnalysisStage, StageContext, StageDetail, StageKind, StageResult,
};
use crate::VeridocResult;
use image::DynamicImage;

pub struct LayoutStage;

impl LayoutStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LayoutStage {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisStage for LayoutStage {
    fn kind(&self) -> StageKind {
        StageKind::Layout
    }

    fn run(&self, ctx: &StageContext) -> VeridocResult<StageResult> {
        let analysis = structure::analyze_structure(&ctx.image);
        let score = structure::structure_anomaly(&analysis);

        let artifact = if analysis.valid {
            let overlay = structure::draw_structure_overlay(&ctx.image, &analysis);
            super::save_image_artifact(
                ctx,
                self.kind(),
                "layout_overlay.png",
                &DynamicImage::ImageRgb8(overlay),
            )
        } else {
            None
        };

        Ok(StageResult::ok(
            self.kind(),
            Some(score),
            StageDetail::Layout {
                valid: analysis.valid,
                metrics: analysis.metrics,
            },
            artifact,
        ))
    }
}
