//! Verdict scenario test suite
//!
//! Fixed end-to-end fusion scenarios: a clean document, a classifier
//! sounding the alarm alone, and a partially-degraded pipeline that
//! still convicts a forgery.

use std::collections::BTreeMap;
use veridoc::engine::pipeline::StructureMetrics;
use veridoc::{
    fuse, FusionPolicy, PipelineReport, StageDetail, StageKind, StageResult, VerdictLabel,
};

fn ok_result(kind: StageKind, score: f64) -> StageResult {
    StageResult::ok(
        kind,
        Some(score),
        StageDetail::Layout {
            valid: true,
            metrics: StructureMetrics {
                aspect_ratio: 0.7,
                border_whiteness: 0.9,
                edge_density: 0.05,
                text_band_count: 4,
            },
        },
        None,
    )
}

fn policy(weights: [(StageKind, f64); 6], t_low: f64, t_high: f64) -> FusionPolicy {
    FusionPolicy {
        weights: BTreeMap::from(weights),
        t_low,
        t_high,
        dissent_margin: 0.25,
    }
}

#[test]
fn clean_document_reads_authentic() {
    // All six stages succeed with low anomaly; equal weights sideline
    // the classifier.
    let scores = [0.1, 0.05, 0.0, 0.2, 0.1, 0.15];
    let report = PipelineReport::from_results(
        StageKind::ALL
            .iter()
            .zip(scores.iter())
            .map(|(kind, score)| ok_result(*kind, *score))
            .collect(),
    );
    let equal = 1.0 / 6.0;
    let policy = policy(
        [
            (StageKind::TamperTrace, equal),
            (StageKind::TextExtraction, equal),
            (StageKind::CodeSymbol, equal),
            (StageKind::Watermark, equal),
            (StageKind::Layout, equal),
            (StageKind::Classifier, equal),
        ],
        0.3,
        0.6,
    );

    let verdict = fuse(&report, &policy);
    let composite = verdict.composite_score.unwrap();
    assert!(composite < 0.3, "composite {composite} should be below T_low");
    assert_eq!(verdict.label, VerdictLabel::Authentic);
    assert_eq!(verdict.contributing_stages.len(), 6);
}

#[test]
fn lone_screaming_classifier_lands_suspicious() {
    // Classifier at 0.9 with half the weight, everything else near zero:
    // the composite sits mid-band.
    let report = PipelineReport::from_results(
        StageKind::ALL
            .iter()
            .map(|kind| {
                if *kind == StageKind::Classifier {
                    ok_result(*kind, 0.9)
                } else {
                    ok_result(*kind, 0.01)
                }
            })
            .collect(),
    );
    let policy = policy(
        [
            (StageKind::TamperTrace, 0.1),
            (StageKind::TextExtraction, 0.1),
            (StageKind::CodeSymbol, 0.1),
            (StageKind::Watermark, 0.1),
            (StageKind::Layout, 0.1),
            (StageKind::Classifier, 0.5),
        ],
        0.3,
        0.6,
    );

    let verdict = fuse(&report, &policy);
    let composite = verdict.composite_score.unwrap();
    assert!(
        (0.45..0.55).contains(&composite),
        "composite {composite} should land mid-band"
    );
    assert_eq!(verdict.label, VerdictLabel::Suspicious);
}

#[test]
fn degraded_pipeline_still_convicts_a_forgery() {
    // Watermark and layout die; the four remaining stages all report
    // high anomaly. The verdict is fake and the dead stages are named.
    let report = PipelineReport::from_results(vec![
        ok_result(StageKind::TamperTrace, 0.75),
        ok_result(StageKind::TextExtraction, 0.8),
        ok_result(StageKind::CodeSymbol, 0.7),
        StageResult::failed(StageKind::Watermark, "template matcher crashed"),
        StageResult::failed(StageKind::Layout, "structure analyzer crashed"),
        ok_result(StageKind::Classifier, 0.9),
    ]);
    let policy = policy(
        [
            (StageKind::TamperTrace, 0.20),
            (StageKind::TextExtraction, 0.10),
            (StageKind::CodeSymbol, 0.10),
            (StageKind::Watermark, 0.15),
            (StageKind::Layout, 0.15),
            (StageKind::Classifier, 0.30),
        ],
        0.3,
        0.6,
    );

    let verdict = fuse(&report, &policy);
    assert_eq!(verdict.label, VerdictLabel::Fake);
    assert!(!verdict.contributing_stages.contains(&StageKind::Watermark));
    assert!(!verdict.contributing_stages.contains(&StageKind::Layout));

    let joined = verdict.rationale.join("\n");
    assert!(joined.contains("watermark: stage unavailable"));
    assert!(joined.contains("layout: stage unavailable"));
}
