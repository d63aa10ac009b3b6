//! Audit log — durable, immutable record of every analysis run
//!
//! One [`AuditRecord`] is produced per run: the full pipeline report,
//! the fused verdict, stage timings, and a SHA-256 integrity digest over
//! the report + verdict body so later tampering is detectable. The
//! record is written to a well-known "last run" location under the
//! engine's output root; writing never blocks or fails the run.

use crate::engine::fusion::Verdict;
use crate::engine::pipeline::PipelineReport;
use crate::engine::{AnalysisOutcome, StageStats};
use crate::{VeridocError, VeridocResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// The durable record of one analysis run. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub engine_version: String,
    pub source: String,
    pub duration_ms: u64,
    pub stage_stats: Vec<StageStats>,
    pub report: PipelineReport,
    pub verdict: Verdict,
    /// SHA-256 over the serialized report + verdict, hex-encoded.
    pub digest: String,
}

impl AuditRecord {
    pub fn new(outcome: &AnalysisOutcome) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            engine_version: outcome.engine_version.clone(),
            source: outcome.source.clone(),
            duration_ms: outcome.duration_ms,
            stage_stats: outcome.stage_stats.clone(),
            report: outcome.report.clone(),
            verdict: outcome.verdict.clone(),
            digest: body_digest(&outcome.report, &outcome.verdict),
        }
    }

    /// Recompute the integrity digest and compare against the stored one.
    pub fn verify_digest(&self) -> bool {
        body_digest(&self.report, &self.verdict) == self.digest
    }
}

fn body_digest(report: &PipelineReport, verdict: &Verdict) -> String {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(report).unwrap_or_default());
    hasher.update(serde_json::to_vec(verdict).unwrap_or_default());
    hex::encode(hasher.finalize())
}

/// Writes audit records under `<root>/logs/`.
pub struct AuditLogWriter {
    log_dir: PathBuf,
}

impl AuditLogWriter {
    pub fn new(output_root: &Path) -> Self {
        Self {
            log_dir: output_root.join("logs"),
        }
    }

    /// Overwrite the well-known "last run" record.
    pub fn write_last_run(&self, record: &AuditRecord) -> VeridocResult<PathBuf> {
        std::fs::create_dir_all(&self.log_dir).map_err(|e| {
            VeridocError::Audit(format!(
                "could not create log directory {}: {e}",
                self.log_dir.display()
            ))
        })?;
        let path = self.log_dir.join("last_run.json");
        let body = serde_json::to_string_pretty(record)?;
        std::fs::write(&path, body).map_err(|e| {
            VeridocError::Audit(format!("could not write {}: {e}", path.display()))
        })?;
        Ok(path)
    }

    /// Read back the last-run record, if any.
    pub fn read_last_run(&self) -> VeridocResult<AuditRecord> {
        let path = self.log_dir.join("last_run.json");
        let body = std::fs::read_to_string(&path).map_err(|e| {
            VeridocError::Audit(format!("could not read {}: {e}", path.display()))
        })?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fusion::{fuse, FusionPolicy};
    use crate::engine::pipeline::{StageKind, StageResult};

    fn outcome() -> AnalysisOutcome {
        let report = PipelineReport::from_results(
            StageKind::ALL
                .iter()
                .map(|k| StageResult::failed(*k, "not run"))
                .collect(),
        );
        let verdict = fuse(&report, &FusionPolicy::default());
        AnalysisOutcome {
            source: "test.png".to_string(),
            report,
            verdict,
            stage_stats: Vec::new(),
            duration_ms: 1,
            engine_version: "0.0.0".to_string(),
        }
    }

    #[test]
    fn digest_verifies_after_round_trip() {
        let record = AuditRecord::new(&outcome());
        assert!(record.verify_digest());

        let json = serde_json::to_string(&record).unwrap();
        let restored: AuditRecord = serde_json::from_str(&json).unwrap();
        assert!(restored.verify_digest());
        assert_eq!(restored, record);
    }

    #[test]
    fn tampered_record_fails_digest_check() {
        let mut record = AuditRecord::new(&outcome());
        record.verdict.confidence = 0.99;
        assert!(!record.verify_digest());
    }

    #[test]
    fn last_run_record_is_overwritten_per_run() {
        let dir = tempfile::tempdir().unwrap();
        let writer = AuditLogWriter::new(dir.path());

        let first = AuditRecord::new(&outcome());
        let second = AuditRecord::new(&outcome());
        writer.write_last_run(&first).unwrap();
        let path = writer.write_last_run(&second).unwrap();
        assert!(path.ends_with("logs/last_run.json"));

        let read_back = writer.read_last_run().unwrap();
        assert_eq!(read_back.run_id, second.run_id);
    }

    #[test]
    fn unwritable_location_is_an_error_not_a_panic() {
        let writer = AuditLogWriter::new(Path::new("/dev/null/not-a-dir"));
        assert!(writer.write_last_run(&AuditRecord::new(&outcome())).is_err());
    }
}
