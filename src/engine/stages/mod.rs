//! Stage adapters — each detector as an independent pipeline stage

pub mod classifier;
pub mod code_symbol;
pub mod layout;
pub mod tamper_trace;
pub mod text_extraction;
pub mod watermark;

use super::pipeline::{AnalysisStage, StageContext, StageKind};
use image::DynamicImage;
use std::path::PathBuf;

/// Build all six stages in the fixed pipeline order.
pub fn build_analysis_stages() -> Vec<Box<dyn AnalysisStage>> {
    vec![
        Box::new(tamper_trace::TamperTraceStage::new()),
        Box::new(text_extraction::TextExtractionStage::new()),
        Box::new(code_symbol::CodeSymbolStage::new()),
        Box::new(watermark::WatermarkStage::new()),
        Box::new(layout::LayoutStage::new()),
        Box::new(classifier::ClassifierStage::new()),
    ]
}

/// Save a visualization image under the stage's output directory.
///
/// Artifact writing is a side effect: on failure the stage still
/// succeeds, the reference just stays absent.
pub(crate) fn save_image_artifact(
    ctx: &StageContext,
    stage: StageKind,
    file_name: &str,
    image: &DynamicImage,
) -> Option<PathBuf> {
    let path = ctx.artifact_path(stage, file_name);
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("{stage}: could not create artifact directory: {e}");
            return None;
        }
    }
    match image.save(&path) {
        Ok(()) => Some(path),
        Err(e) => {
            tracing::warn!("{stage}: could not write artifact {}: {e}", path.display());
            None
        }
    }
}

/// Save a text artifact under the stage's output directory.
pub(crate) fn save_text_artifact(
    ctx: &StageContext,
    stage: StageKind,
    file_name: &str,
    contents: &str,
) -> Option<PathBuf> {
    let path = ctx.artifact_path(stage, file_name);
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("{stage}: could not create artifact directory: {e}");
            return None;
        }
    }
    match std::fs::write(&path, contents) {
        Ok(()) => Some(path),
        Err(e) => {
            tracing::warn!("{stage}: could not write artifact {}: {e}", path.display());
            None
        }
    }
}
