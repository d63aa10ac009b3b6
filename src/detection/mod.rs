//! Detector internals — the opaque analyses behind the stage adapters
//!
//! Each module owns one forensic technique and knows nothing about the
//! pipeline: it takes image data (plus its own external resources) and
//! returns a technique-specific result. The stage adapters in
//! `engine::stages` normalize these results into the common
//! `StageResult` shape.

pub mod classifier_model;
pub mod error_level;
pub mod structure;
pub mod symbol_codes;
pub mod text_extract;
pub mod watermark_match;

pub use classifier_model::{ClassLabel, Classification, ClassifierHandle, ClassifierModel};
pub use error_level::ErrorLevelAnalysis;
pub use structure::StructureAnalysis;
pub use symbol_codes::SymbolScan;
pub use text_extract::{ExtractedText, OcrModelPaths, TextExtractor};
pub use watermark_match::WatermarkMatch;
