//! Stage 2: OCR text extraction

use crate::detection::text_extract::{OcrModelPaths, TextExtractor};
use crate::engine::pipeline::{
    AnalysisStage, StageContext, StageDetail, StageKind, StageResult,
};
use crate::VeridocResult;

pub struct TextExtractionStage;

impl TextExtractionStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TextExtractionStage {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisStage for TextExtractionStage {
    fn kind(&self) -> StageKind {
        StageKind::TextExtraction
    }

    fn run(&self, ctx: &StageContext) -> VeridocResult<StageResult> {
        let Some(model_dir) = &ctx.config.ocr_model_dir else {
            return Ok(StageResult::skipped(
                self.kind(),
                "no OCR model directory configured",
            ));
        };

        let extractor = TextExtractor::new(&OcrModelPaths::from_dir(model_dir))?;
        let extracted = extractor.extract(&ctx.image)?;

        let score = text_anomaly(extracted.word_count, extracted.keywords.len());
        let artifact =
            super::save_text_artifact(ctx, self.kind(), "ocr_result.txt", &extracted.text);

        Ok(StageResult::ok(
            self.kind(),
            Some(score),
            StageDetail::TextExtraction {
                text: extracted.text,
                word_count: extracted.word_count,
                keywords: extracted.keywords,
                lines: extracted.lines,
            },
            artifact,
        ))
    }
}

/// A document page with no recognizable text is anomalous; dense text
/// with document keywords is the authentic pattern.
fn text_anomaly(word_count: usize, keyword_hits: usize) -> f64 {
    if word_count == 0 {
        return 0.7;
    }
    let mut score = (1.0 / (1.0 + word_count as f64 / 20.0)).min(0.7);
    if keyword_hits > 0 {
        score *= 0.5;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::text_anomaly;

    #[test]
    fn empty_page_is_anomalous() {
        assert_eq!(text_anomaly(0, 0), 0.7);
    }

    #[test]
    fn more_text_is_less_anomalous() {
        assert!(text_anomaly(200, 0) < text_anomaly(10, 0));
    }

    #[test]
    fn keywords_halve_the_score() {
        let without = text_anomaly(50, 0);
        let with = text_anomaly(50, 2);
        assert!((with - without * 0.5).abs() < 1e-12);
    }
}
