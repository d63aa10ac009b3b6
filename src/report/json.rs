//! JSON document renderer

use super::{AnalysisDocument, ErrorDocument};
use crate::VeridocResult;

/// Render the analysis document as pretty-printed JSON.
pub fn render(document: &AnalysisDocument) -> VeridocResult<String> {
    serde_json::to_string_pretty(document).map_err(crate::VeridocError::Serde)
}

/// Render a fatal-failure document as JSON.
pub fn render_error(document: &ErrorDocument) -> VeridocResult<String> {
    serde_json::to_string_pretty(document).map_err(crate::VeridocError::Serde)
}

/// Write the analysis document to a file.
pub fn write(document: &AnalysisDocument, path: &std::path::Path) -> VeridocResult<()> {
    let body = render(document)?;
    std::fs::write(path, body).map_err(crate::VeridocError::Io)
}
