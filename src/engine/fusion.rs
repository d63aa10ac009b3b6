//! Verdict fusion — deterministic policy turning a pipeline report into
//! one authenticity verdict
//!
//! Every `ok` stage contributes its normalized anomaly score under a
//! fixed per-stage weight. Weights are renormalized over the stages that
//! actually succeeded, so an unavailable signal biases the composite
//! toward neither extreme. Stages that did not succeed are surfaced in
//! the rationale as "stage unavailable" — absence never silently reads
//! as authentic.

use super::pipeline::{PipelineReport, StageKind, StageStatus};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ─── Labels ────────────────────────────────────────────────────────

/// Final classification of the analyzed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictLabel {
    Authentic,
    Suspicious,
    Fake,
}

impl std::fmt::Display for VerdictLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authentic => write!(f, "authentic"),
            Self::Suspicious => write!(f, "suspicious"),
            Self::Fake => write!(f, "fake"),
        }
    }
}

// ─── Policy ────────────────────────────────────────────────────────

/// Fusion constants: per-stage weights, label thresholds, dissent margin.
///
/// Defaults weight the learned classifier highest and the two
/// text-derived stages lowest. Thresholds split the composite anomaly
/// score into `authentic` (< `t_low`), `suspicious`, and `fake`
/// (≥ `t_high`) bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionPolicy {
    pub weights: BTreeMap<StageKind, f64>,
    pub t_low: f64,
    pub t_high: f64,
    /// An `ok` stage whose own band disagrees with the final label and
    /// whose score differs from the composite by more than this margin
    /// is called out as "dissenting" in the rationale.
    pub dissent_margin: f64,
}

impl Default for FusionPolicy {
    fn default() -> Self {
        let weights = BTreeMap::from([
            (StageKind::TamperTrace, 0.20),
            (StageKind::TextExtraction, 0.10),
            (StageKind::CodeSymbol, 0.10),
            (StageKind::Watermark, 0.15),
            (StageKind::Layout, 0.15),
            (StageKind::Classifier, 0.30),
        ]);
        Self {
            weights,
            t_low: 0.35,
            t_high: 0.65,
            dissent_margin: 0.25,
        }
    }
}

impl FusionPolicy {
    pub fn weight(&self, kind: StageKind) -> f64 {
        self.weights.get(&kind).copied().unwrap_or(0.0)
    }

    /// Map a composite anomaly score to its label band.
    pub fn classify(&self, composite: f64) -> VerdictLabel {
        if composite < self.t_low {
            VerdictLabel::Authentic
        } else if composite < self.t_high {
            VerdictLabel::Suspicious
        } else {
            VerdictLabel::Fake
        }
    }

    /// Confidence: distance of the composite from the nearest band
    /// boundary, normalized by that band's maximum attainable distance.
    /// Saturates at 1 when the composite sits at 0 or 1; scores near a
    /// threshold are low-confidence.
    fn band_confidence(&self, composite: f64) -> f64 {
        let c = composite.clamp(0.0, 1.0);
        match self.classify(c) {
            VerdictLabel::Authentic => ((self.t_low - c) / self.t_low).clamp(0.0, 1.0),
            VerdictLabel::Fake => ((c - self.t_high) / (1.0 - self.t_high)).clamp(0.0, 1.0),
            VerdictLabel::Suspicious => {
                let half_band = (self.t_high - self.t_low) / 2.0;
                let to_nearest = (c - self.t_low).min(self.t_high - c);
                (to_nearest / half_band).clamp(0.0, 1.0)
            }
        }
    }
}

// ─── Verdict ───────────────────────────────────────────────────────

/// Final fused decision for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub label: VerdictLabel,
    /// 0–1; 0 means the fusion had nothing to go on.
    pub confidence: f64,
    /// Weighted composite anomaly score; absent when no stage succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub composite_score: Option<f64>,
    /// Stages whose scores entered the composite.
    pub contributing_stages: BTreeSet<StageKind>,
    /// One human-readable reason per stage, in fixed stage order.
    pub rationale: Vec<String>,
}

// ─── Fusion ────────────────────────────────────────────────────────

/// Deterministic fusion of a complete pipeline report.
///
/// Degenerate input (zero `ok` stages with scores, or a zero weight sum
/// over the available subset) yields `suspicious` with confidence 0 —
/// never `authentic` by default, and never an error.
pub fn fuse(report: &PipelineReport, policy: &FusionPolicy) -> Verdict {
    let contributing: Vec<(StageKind, f64)> = report
        .ok_stages()
        .filter_map(|s| s.score.map(|score| (s.stage, score)))
        .collect();

    let weight_sum: f64 = contributing
        .iter()
        .map(|(kind, _)| policy.weight(*kind))
        .sum();

    if contributing.is_empty() || weight_sum <= 0.0 {
        let mut rationale = vec!["no analysis stage succeeded".to_string()];
        rationale.extend(
            report
                .stages()
                .iter()
                .map(|s| unavailable_reason(s.stage, s.status, &error_of(s))),
        );
        return Verdict {
            label: VerdictLabel::Suspicious,
            confidence: 0.0,
            composite_score: None,
            contributing_stages: BTreeSet::new(),
            rationale,
        };
    }

    // Renormalized weighted sum over the available subset.
    let composite: f64 = contributing
        .iter()
        .map(|(kind, score)| policy.weight(*kind) / weight_sum * score)
        .sum();
    let composite = composite.clamp(0.0, 1.0);

    let label = policy.classify(composite);
    let confidence = policy.band_confidence(composite);

    let mut rationale = Vec::with_capacity(report.stages().len());
    for result in report.stages() {
        match result.status {
            StageStatus::Ok => match result.score {
                Some(score) => {
                    let effective = policy.weight(result.stage) / weight_sum;
                    let dissenting = policy.classify(score) != label
                        && (score - composite).abs() > policy.dissent_margin;
                    let mut reason = format!(
                        "{}: anomaly {:.2} (weight {:.2})",
                        result.stage, score, effective
                    );
                    if dissenting {
                        reason.push_str(" — dissenting");
                    }
                    rationale.push(reason);
                }
                None => rationale.push(format!("{}: no score reported", result.stage)),
            },
            status => rationale.push(unavailable_reason(
                result.stage,
                status,
                &error_of(result),
            )),
        }
    }

    Verdict {
        label,
        confidence,
        composite_score: Some(composite),
        contributing_stages: contributing.iter().map(|(kind, _)| *kind).collect(),
        rationale,
    }
}

fn error_of(result: &super::pipeline::StageResult) -> String {
    match &result.detail {
        super::pipeline::StageDetail::Error { message } => message.clone(),
        _ => String::new(),
    }
}

fn unavailable_reason(stage: StageKind, status: StageStatus, message: &str) -> String {
    let what = match status {
        StageStatus::Skipped => "stage unavailable (skipped)",
        _ => "stage unavailable",
    };
    if message.is_empty() {
        format!("{stage}: {what}")
    } else {
        format!("{stage}: {what}: {message}")
    }
}
