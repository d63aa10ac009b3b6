//! Stage 6: learned classification

use crate::engine::pipeline::{
    AnalysisStage, StageContext, StageDetail, StageKind, StageResult,
};
use crate::VeridocResult;

pub struct ClassifierStage;

impl ClassifierStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ClassifierStage {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisStage for ClassifierStage {
    fn kind(&self) -> StageKind {
        StageKind::Classifier
    }

    fn run(&self, ctx: &StageContext) -> VeridocResult<StageResult> {
        if !ctx.classifier.configured() {
            return Ok(StageResult::skipped(
                self.kind(),
                "no classifier model configured",
            ));
        }

        // Loaded once per process lifetime, reused across calls.
        let model = ctx.classifier.get_or_load()?;
        let classification = model.classify(&ctx.image)?;

        Ok(StageResult::ok(
            self.kind(),
            Some(classification.fake_probability),
            StageDetail::Classifier {
                label: classification.label,
                probability: classification.probability,
            },
            None,
        ))
    }
}
