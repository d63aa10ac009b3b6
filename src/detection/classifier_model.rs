//! Learned classifier — ONNX model scoring authentic vs. fake
//!
//! Wraps an ONNX Runtime session around a binary document classifier.
//! The model takes one NCHW float tensor (224x224, scaled to 0–1) and
//! returns two logits ordered `[authentic, fake]`; a softmax turns them
//! into the probabilities reported upstream.
//!
//! Model loading is expensive and happens exactly once per process
//! lifetime through [`ClassifierHandle`] — an explicitly passed,
//! lazily-initialized shared handle, not a module-level singleton.

use crate::{VeridocError, VeridocResult};
use image::imageops::FilterType;
use image::RgbImage;
use ndarray::Array4;
use once_cell::sync::OnceCell;
use ort::session::Session;
use ort::value::TensorRef;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Input edge length expected by the classifier.
const INPUT_SIZE: u32 = 224;

/// Class labels in model output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassLabel {
    Authentic,
    Fake,
}

impl std::fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authentic => write!(f, "authentic"),
            Self::Fake => write!(f, "fake"),
        }
    }
}

/// One classification outcome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    /// The winning class.
    pub label: ClassLabel,
    /// Probability of the winning class.
    pub probability: f64,
    /// Probability of the `fake` class — the stage's anomaly signal.
    pub fake_probability: f64,
}

/// A loaded ONNX classifier session.
pub struct ClassifierModel {
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
}

impl ClassifierModel {
    /// Create the ONNX session and detect tensor names.
    pub fn load(model_path: impl AsRef<Path>) -> VeridocResult<Self> {
        let path = model_path.as_ref();
        let session = Session::builder()
            .and_then(|mut b| b.commit_from_file(path))
            .map_err(|e| {
                VeridocError::Classifier(format!(
                    "failed to create ONNX session for {}: {e}",
                    path.display()
                ))
            })?;

        let common_names = ["x", "input", "images", "data", "image"];
        let available: Vec<String> = session.inputs().iter().map(|i| i.name().to_string()).collect();
        let input_name = common_names
            .iter()
            .find(|name| available.iter().any(|i| i == *name))
            .map(|s| s.to_string())
            .or_else(|| available.first().cloned())
            .ok_or_else(|| {
                VeridocError::Classifier(format!("model {} has no inputs", path.display()))
            })?;
        let output_name = session
            .outputs()
            .first()
            .map(|o| o.name().to_string())
            .ok_or_else(|| {
                VeridocError::Classifier(format!("model {} has no outputs", path.display()))
            })?;

        tracing::info!(
            "classifier model loaded from {} (input={}, output={})",
            path.display(),
            input_name,
            output_name
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
        })
    }

    /// Score one page.
    pub fn classify(&self, image: &RgbImage) -> VeridocResult<Classification> {
        let input = preprocess(image);
        let tensor = TensorRef::from_array_view(input.view())
            .map_err(|e| VeridocError::Classifier(format!("input tensor conversion: {e}")))?;
        let inputs = ort::inputs![self.input_name.as_str() => tensor];

        let mut session = self
            .session
            .lock()
            .map_err(|_| VeridocError::Classifier("classifier session lock poisoned".into()))?;
        let outputs = session
            .run(inputs)
            .map_err(|e| VeridocError::Classifier(format!("inference failed: {e}")))?;

        let (_, logits) = outputs[self.output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| VeridocError::Classifier(format!("output extraction: {e}")))?;

        if logits.len() < 2 {
            return Err(VeridocError::Classifier(format!(
                "expected 2 class logits, got {}",
                logits.len()
            )));
        }
        let probabilities = softmax(&logits[..2]);
        Ok(classification_from_probabilities(probabilities))
    }
}

/// Resize to the model input size and scale into an NCHW 0–1 tensor.
fn preprocess(image: &RgbImage) -> Array4<f32> {
    let resized = image::imageops::resize(image, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);
    let mut tensor = Array4::<f32>::zeros((1, 3, INPUT_SIZE as usize, INPUT_SIZE as usize));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = f32::from(pixel.0[c]) / 255.0;
        }
    }
    tensor
}

fn softmax(logits: &[f32]) -> [f64; 2] {
    let max = logits.iter().cloned().fold(f32::MIN, f32::max);
    let exp: Vec<f64> = logits.iter().map(|l| f64::from(l - max).exp()).collect();
    let sum: f64 = exp.iter().sum();
    [exp[0] / sum, exp[1] / sum]
}

fn classification_from_probabilities(probabilities: [f64; 2]) -> Classification {
    let [authentic, fake] = probabilities;
    if fake >= authentic {
        Classification {
            label: ClassLabel::Fake,
            probability: fake,
            fake_probability: fake,
        }
    } else {
        Classification {
            label: ClassLabel::Authentic,
            probability: authentic,
            fake_probability: fake,
        }
    }
}

// ─── Shared Handle ─────────────────────────────────────────────────

/// Load-once handle for the classifier model.
///
/// Created at engine construction and passed by reference into the
/// classifier stage; the underlying session is initialized on first use
/// and reused for the rest of the process lifetime.
pub struct ClassifierHandle {
    model_path: Option<PathBuf>,
    cell: OnceCell<ClassifierModel>,
}

impl ClassifierHandle {
    pub fn new(model_path: Option<PathBuf>) -> Self {
        Self {
            model_path,
            cell: OnceCell::new(),
        }
    }

    /// Whether a model path was configured at all.
    pub fn configured(&self) -> bool {
        self.model_path.is_some()
    }

    /// The loaded model, initializing it on first call.
    pub fn get_or_load(&self) -> VeridocResult<&ClassifierModel> {
        let path = self.model_path.as_ref().ok_or_else(|| {
            VeridocError::Classifier("no classifier model configured".into())
        })?;
        self.cell.get_or_try_init(|| ClassifierModel::load(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn softmax_sums_to_one_and_orders_correctly() {
        let p = softmax(&[2.0, 0.5]);
        assert!((p[0] + p[1] - 1.0).abs() < 1e-12);
        assert!(p[0] > p[1]);
    }

    #[test]
    fn fake_wins_ties() {
        let c = classification_from_probabilities([0.5, 0.5]);
        assert_eq!(c.label, ClassLabel::Fake);
        assert_eq!(c.fake_probability, 0.5);
    }

    #[test]
    fn preprocess_produces_unit_range_nchw() {
        let img = RgbImage::from_pixel(50, 80, image::Rgb([255, 0, 128]));
        let tensor = preprocess(&img);
        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
        assert!((tensor[[0, 0, 0, 0]] - 1.0).abs() < 1e-6);
        assert!(tensor[[0, 1, 0, 0]].abs() < 1e-6);
    }

    #[test]
    fn unconfigured_handle_reports_not_configured() {
        let handle = ClassifierHandle::new(None);
        assert!(!handle.configured());
        assert!(handle.get_or_load().is_err());
    }

    #[test]
    fn handle_with_bad_path_fails_to_load() {
        let handle = ClassifierHandle::new(Some(PathBuf::from("/nonexistent/model.onnx")));
        assert!(handle.configured());
        assert!(handle.get_or_load().is_err());
    }
}
