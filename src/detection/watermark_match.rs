//! Watermark verification — normalized template matching
//!
//! Slides the configured reference watermark over the page and reports
//! the best normalized cross-correlation together with its location.
//! A weak best match means the expected watermark is absent or damaged.

use crate::engine::pipeline::PixelRect;
use crate::{VeridocError, VeridocResult};
use image::GrayImage;
use imageproc::template_matching::{find_extremes, match_template, MatchTemplateMethod};

/// Best watermark match on one page.
pub struct WatermarkMatch {
    /// Normalized cross-correlation of the best match, 0–1.
    pub score: f64,
    /// Region of the best match, template-sized.
    pub region: PixelRect,
}

/// Match `template` against `page` and return the best location.
///
/// Fails when the template does not fit inside the page — a template
/// larger than the page cannot be located on it.
pub fn locate_watermark(page: &GrayImage, template: &GrayImage) -> VeridocResult<WatermarkMatch> {
    let (pw, ph) = page.dimensions();
    let (tw, th) = template.dimensions();
    if tw == 0 || th == 0 {
        return Err(VeridocError::Watermark("empty watermark template".into()));
    }
    if tw > pw || th > ph {
        return Err(VeridocError::Watermark(format!(
            "template {tw}x{th} larger than page {pw}x{ph}"
        )));
    }

    let scores = match_template(
        page,
        template,
        MatchTemplateMethod::CrossCorrelationNormalized,
    );
    let extremes = find_extremes(&scores);
    let (x, y) = extremes.max_value_location;

    Ok(WatermarkMatch {
        score: f64::from(extremes.max_value).clamp(0.0, 1.0),
        region: PixelRect {
            x: x as i32,
            y: y as i32,
            width: tw,
            height: th,
        },
    })
}
