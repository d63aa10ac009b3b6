//! Stage 3: QR code location and decoding

use crate::detection::symbol_codes;
use crate::engine::pipeline::{
    AnalysisStage, StageContext, StageDetail, StageKind, StageResult,
};
use crate::VeridocResult;
use image::DynamicImage;

pub struct CodeSymbolStage;

impl CodeSymbolStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CodeSymbolStage {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisStage for CodeSymbolStage {
    fn kind(&self) -> StageKind {
        StageKind::CodeSymbol
    }

    fn run(&self, ctx: &StageContext) -> VeridocResult<StageResult> {
        let scan = symbol_codes::scan_symbols(&ctx.image);

        // A grid that refuses to decode is a forgery tell; a cleanly
        // decoded payload is the authentic pattern; no symbol at all is
        // neutral — many genuine documents simply have none.
        let score = if scan.undecodable > 0 {
            0.8
        } else if !scan.symbols.is_empty() {
            0.1
        } else {
            0.5
        };

        let artifact = if scan.symbols.is_empty() {
            None
        } else {
            let annotated = symbol_codes::annotate_symbols(&ctx.image, &scan);
            super::save_image_artifact(
                ctx,
                self.kind(),
                "qr_annotated.png",
                &DynamicImage::ImageRgb8(annotated),
            )
        };

        Ok(StageResult::ok(
            self.kind(),
            Some(score),
            StageDetail::CodeSymbol {
                detected: scan.detected(),
                symbols: scan.symbols,
                undecodable: scan.undecodable,
            },
            artifact,
        ))
    }
}
