//! Text extraction — OCR over the document page
//!
//! Wraps the `ocrs` engine (neural models executed via `rten`) behind a
//! small extractor that returns the full recognized text plus per-line
//! positions and document-keyword hits.
//!
//! The engine needs two model files:
//!
//! - `text-detection.rten` — locates text regions
//! - `text-recognition.rten` — decodes characters from detected regions
//!
//! Both are resolved from a configured model directory; model loading is
//! the expensive step, so an extractor is built once per run and reused
//! for the page.

use crate::engine::pipeline::{ExtractedLine, PixelRect};
use crate::{VeridocError, VeridocResult};
use image::RgbImage;
use ocrs::{ImageSource, OcrEngine, OcrEngineParams};
use once_cell::sync::Lazy;
use regex::Regex;
use rten::Model;
use std::path::{Path, PathBuf};

/// Well-known filenames for the detection and recognition models.
const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// Document-type keywords surfaced in the extraction detail.
static DOCUMENT_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(certificate|government|official|seal|registrar|university|degree|issued|authority)\b",
    )
    .expect("keyword pattern is valid")
});

/// Locations of the two OCR model files.
#[derive(Debug, Clone)]
pub struct OcrModelPaths {
    pub detection_model_path: PathBuf,
    pub recognition_model_path: PathBuf,
}

impl OcrModelPaths {
    /// Resolve both models inside one directory.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model_path: dir.join(DETECTION_MODEL_FILENAME),
            recognition_model_path: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    /// Verify that both model files exist.
    pub fn validate(&self) -> VeridocResult<()> {
        for path in [&self.detection_model_path, &self.recognition_model_path] {
            if !path.exists() {
                return Err(VeridocError::Ocr(format!(
                    "OCR model not found at {}",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

/// Text recognized from one page.
pub struct ExtractedText {
    /// All recognized lines joined with `\n`.
    pub text: String,
    pub lines: Vec<ExtractedLine>,
    pub word_count: usize,
    /// Unique lowercase document-keyword hits, in order of appearance.
    pub keywords: Vec<String>,
}

/// OCR engine wrapper — build once, extract per page.
pub struct TextExtractor {
    engine: OcrEngine,
}

impl TextExtractor {
    /// Load both models and initialise the engine.
    pub fn new(paths: &OcrModelPaths) -> VeridocResult<Self> {
        paths.validate()?;

        let detection_model = Model::load_file(&paths.detection_model_path).map_err(|err| {
            VeridocError::Ocr(format!(
                "failed to load detection model from {}: {}",
                paths.detection_model_path.display(),
                err
            ))
        })?;
        let recognition_model =
            Model::load_file(&paths.recognition_model_path).map_err(|err| {
                VeridocError::Ocr(format!(
                    "failed to load recognition model from {}: {}",
                    paths.recognition_model_path.display(),
                    err
                ))
            })?;

        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| VeridocError::Ocr(format!("failed to initialise OCR engine: {err}")))?;

        Ok(Self { engine })
    }

    /// Recognize all text on the page, with line positions.
    pub fn extract(&self, image: &RgbImage) -> VeridocResult<ExtractedText> {
        let (width, height) = image.dimensions();

        let source = ImageSource::from_bytes(image.as_raw(), (width, height)).map_err(|err| {
            VeridocError::Ocr(format!("failed to create image source ({width}x{height}): {err}"))
        })?;
        let input = self
            .engine
            .prepare_input(source)
            .map_err(|err| VeridocError::Ocr(format!("OCR preprocessing failed: {err}")))?;

        let word_rects = self
            .engine
            .detect_words(&input)
            .map_err(|err| VeridocError::Ocr(format!("word detection failed: {err}")))?;
        let line_rects = self.engine.find_text_lines(&input, &word_rects);
        let line_texts = self
            .engine
            .recognize_text(&input, &line_rects)
            .map_err(|err| VeridocError::Ocr(format!("line recognition failed: {err}")))?;

        let mut lines = Vec::new();
        for (words, recognized) in line_rects.iter().zip(line_texts.iter()) {
            let Some(line) = recognized else { continue };
            let text = line.to_string();
            if text.trim().is_empty() {
                continue;
            }
            lines.push(ExtractedLine {
                text,
                bounds: line_bounds(words),
            });
        }

        let text = lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let word_count = text.split_whitespace().count();
        let keywords = keyword_hits(&text);

        Ok(ExtractedText {
            text,
            lines,
            word_count,
            keywords,
        })
    }
}

/// Axis-aligned bounds of a line from its word rectangles.
fn line_bounds(words: &[rten_imageproc::RotatedRect]) -> Option<PixelRect> {
    let mut min_x = f32::MAX;
    let mut min_y = f32::MAX;
    let mut max_x = f32::MIN;
    let mut max_y = f32::MIN;
    let mut any = false;
    for word in words {
        for corner in word.corners() {
            min_x = min_x.min(corner.x);
            min_y = min_y.min(corner.y);
            max_x = max_x.max(corner.x);
            max_y = max_y.max(corner.y);
            any = true;
        }
    }
    if !any {
        return None;
    }
    Some(PixelRect {
        x: min_x.floor() as i32,
        y: min_y.floor() as i32,
        width: (max_x - min_x).ceil().max(0.0) as u32,
        height: (max_y - min_y).ceil().max(0.0) as u32,
    })
}

/// Unique lowercase keyword hits in order of first appearance.
fn keyword_hits(text: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for hit in DOCUMENT_KEYWORDS.find_iter(text) {
        let word = hit.as_str().to_lowercase();
        if !seen.contains(&word) {
            seen.push(word);
        }
    }
    seen
}
