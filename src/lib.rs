//! # veridoc — Document Authenticity Forensics Engine
//!
//! Runs a battery of independent forensic analyses against one document
//! image and fuses their outputs into a single authenticity verdict with
//! a confidence score and a per-stage rationale.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      VeridocEngine                          │
//! │  ┌───────────┐ ┌───────────┐ ┌───────────┐ ┌────────────┐   │
//! │  │Image      │ │Pipeline   │ │Fusion     │ │Classifier  │   │
//! │  │decode     │ │(parallel) │ │policy     │ │handle (1x) │   │
//! │  └─────┬─────┘ └─────┬─────┘ └─────┬─────┘ └─────┬──────┘   │
//! │        │             │             │             │          │
//! │  ┌─────▼─────────────▼─────────────▼─────────────▼────────┐ │
//! │  │  6 Independent Analysis Stages (rayon parallel)        │ │
//! │  │  TamperTrace │ Text │ CodeSymbol │ Watermark │ Layout  │ │
//! │  │              │ Classifier                              │ │
//! │  └──────────────────────────┬─────────────────────────────┘ │
//! │                             │                               │
//! │  ┌──────────────────────────▼─────────────────────────────┐ │
//! │  │  PipelineReport → Verdict Fusion → Report + Audit Log  │ │
//! │  └────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Stages
//!
//! - **Tamper trace**: JPEG recompression error-level analysis; localized
//!   error spikes betray spliced or retouched regions.
//! - **Text extraction**: OCR over the full page — text content, line
//!   positions, document keyword hits.
//! - **Code symbol**: QR code location and payload decoding.
//! - **Watermark**: normalized template matching against a configured
//!   reference watermark.
//! - **Layout**: document structure metrics (text bands, margins, aspect).
//! - **Classifier**: learned ONNX model scoring authentic vs. fake.
//!
//! Every stage is failure-isolated: a crashing or erroring detector is
//! recorded as a `failed` stage and never aborts the pipeline. Fusion is
//! deterministic and renormalizes its fixed weights over the stages that
//! actually succeeded, so a missing signal never silently reads as
//! "authentic".

pub mod audit;
pub mod detection;
pub mod engine;
pub mod report;

// Re-exports for convenience
pub use audit::{AuditLogWriter, AuditRecord};
pub use detection::classifier_model::{ClassLabel, Classification, ClassifierHandle};
pub use engine::fusion::{fuse, FusionPolicy, Verdict, VerdictLabel};
pub use engine::pipeline::{
    AnalysisStage, PipelineReport, StageContext, StageDetail, StageKind, StageResult, StageStatus,
};
pub use engine::{AnalysisOutcome, EngineConfig, StageStats, VeridocEngine};
pub use report::{AnalysisDocument, ErrorDocument};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VeridocError {
    #[error("image decode failed: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("text extraction error: {0}")]
    Ocr(String),

    #[error("code symbol error: {0}")]
    Symbol(String),

    #[error("watermark matching error: {0}")]
    Watermark(String),

    #[error("structure analysis error: {0}")]
    Structure(String),

    #[error("classifier error: {0}")]
    Classifier(String),

    #[error("stage error: {0}")]
    Stage(String),

    #[error("audit log error: {0}")]
    Audit(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type VeridocResult<T> = Result<T, VeridocError>;
