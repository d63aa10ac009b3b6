//! Report generation — transport-safe analysis documents
//!
//! Transforms an [`AnalysisOutcome`] into the structured document handed
//! to callers: `stage_results` (the pipeline report) and `final_verdict`
//! (the fused verdict).
//!
//! The transport form is lossless for every scalar and textual field.
//! Exactly two documented bulk-geometry fields are dropped:
//!
//! - `text_extraction` detail: per-line pixel `bounds`
//! - `code_symbol` detail: per-symbol pixel `corners`
//!
//! The audit log keeps the full, unstripped record; only the transport
//! document is lossy.

pub mod json;

use crate::engine::pipeline::{PipelineReport, StageDetail, StageResult};
use crate::engine::fusion::Verdict;
use crate::engine::AnalysisOutcome;
use serde::{Deserialize, Serialize};

/// The caller-facing analysis document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisDocument {
    pub stage_results: PipelineReport,
    pub final_verdict: Verdict,
}

impl AnalysisDocument {
    /// Build the transport document, stripping bulk pixel geometry.
    pub fn from_outcome(outcome: &AnalysisOutcome) -> Self {
        Self {
            stage_results: strip_bulk_geometry(&outcome.report),
            final_verdict: outcome.verdict.clone(),
        }
    }
}

/// The fatal-failure document: a single error field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDocument {
    pub error: String,
}

impl ErrorDocument {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

fn strip_bulk_geometry(report: &PipelineReport) -> PipelineReport {
    let stages = report
        .stages()
        .iter()
        .map(|stage| {
            let mut stripped: StageResult = stage.clone();
            match &mut stripped.detail {
                StageDetail::TextExtraction { lines, .. } => {
                    for line in lines.iter_mut() {
                        line.bounds = None;
                    }
                }
                StageDetail::CodeSymbol { symbols, .. } => {
                    for symbol in symbols.iter_mut() {
                        symbol.corners = None;
                    }
                }
                _ => {}
            }
            stripped
        })
        .collect();
    PipelineReport::from_results(stages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::pipeline::{
        DecodedSymbol, ExtractedLine, PixelPoint, PixelRect, StageKind,
    };

    fn geometry_heavy_report() -> PipelineReport {
        PipelineReport::from_results(vec![
            StageResult::ok(
                StageKind::TextExtraction,
                Some(0.2),
                StageDetail::TextExtraction {
                    text: "CERTIFICATE".to_string(),
                    word_count: 1,
                    keywords: vec!["certificate".to_string()],
                    lines: vec![ExtractedLine {
                        text: "CERTIFICATE".to_string(),
                        bounds: Some(PixelRect {
                            x: 5,
                            y: 10,
                            width: 200,
                            height: 24,
                        }),
                    }],
                },
                None,
            ),
            StageResult::ok(
                StageKind::CodeSymbol,
                Some(0.1),
                StageDetail::CodeSymbol {
                    detected: true,
                    symbols: vec![DecodedSymbol {
                        symbol_type: "qr".to_string(),
                        data: "https://example.test/v/1".to_string(),
                        corners: Some(vec![PixelPoint { x: 1, y: 2 }]),
                    }],
                    undecodable: 0,
                },
                None,
            ),
        ])
    }

    #[test]
    fn transport_drops_geometry_keeps_text() {
        let report = geometry_heavy_report();
        let stripped = strip_bulk_geometry(&report);

        match &stripped.stage(StageKind::TextExtraction).detail {
            StageDetail::TextExtraction { text, lines, .. } => {
                assert_eq!(text, "CERTIFICATE");
                assert!(lines.iter().all(|l| l.bounds.is_none()));
                assert_eq!(lines[0].text, "CERTIFICATE");
            }
            other => panic!("unexpected detail: {other:?}"),
        }
        match &stripped.stage(StageKind::CodeSymbol).detail {
            StageDetail::CodeSymbol { symbols, .. } => {
                assert_eq!(symbols[0].data, "https://example.test/v/1");
                assert!(symbols[0].corners.is_none());
            }
            other => panic!("unexpected detail: {other:?}"),
        }
    }

    #[test]
    fn scores_and_statuses_survive_stripping() {
        let report = geometry_heavy_report();
        let stripped = strip_bulk_geometry(&report);
        for (a, b) in report.stages().iter().zip(stripped.stages()) {
            assert_eq!(a.stage, b.stage);
            assert_eq!(a.status, b.status);
            assert_eq!(a.score, b.score);
        }
    }
}
