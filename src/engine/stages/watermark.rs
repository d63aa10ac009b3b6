//! Stage 4: watermark template verification

use crate::detection::watermark_match;
use crate::engine::pipeline::{
    AnalysisStage, StageContext, StageDetail, StageKind, StageResult,
};
use crate::{VeridocError, VeridocResult};
use image::DynamicImage;

pub struct WatermarkStage;

impl WatermarkStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WatermarkStage {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisStage for WatermarkStage {
    fn kind(&self) -> StageKind {
        StageKind::Watermark
    }

    fn run(&self, ctx: &StageContext) -> VeridocResult<StageResult> {
        let Some(template_path) = &ctx.config.watermark_template else {
            return Ok(StageResult::skipped(
                self.kind(),
                "no watermark template configured",
            ));
        };

        let template = image::open(template_path)
            .map_err(|e| {
                VeridocError::Watermark(format!(
                    "could not load template {}: {e}",
                    template_path.display()
                ))
            })?
            .to_luma8();
        let page = DynamicImage::ImageRgb8(ctx.image.as_ref().clone()).to_luma8();

        let matched = watermark_match::locate_watermark(&page, &template)?;
        let template_found = matched.score >= ctx.config.watermark_acceptance;

        // A weak best match means the expected watermark is missing.
        let score = (1.0 - matched.score).clamp(0.0, 1.0);

        Ok(StageResult::ok(
            self.kind(),
            Some(score),
            StageDetail::Watermark {
                template_found,
                match_score: matched.score,
                region: Some(matched.region),
            },
            None,
        ))
    }
}
