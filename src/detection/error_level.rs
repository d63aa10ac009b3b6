//! Error-level analysis — tamper traces via JPEG recompression
//!
//! A once-compressed image recompresses almost losslessly; regions that
//! were pasted in or retouched after the original compression pass leave
//! elevated error levels. The analysis re-encodes the page at a fixed
//! JPEG quality, diffs it against the input, and reports difference
//! statistics plus a grayscale heatmap of the per-pixel error.

use crate::{VeridocError, VeridocResult};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use std::io::Cursor;

/// Result of one error-level pass.
pub struct ErrorLevelAnalysis {
    /// Mean per-pixel difference on the 0–255 scale.
    pub mean_difference: f64,
    /// Maximum per-pixel difference on the 0–255 scale.
    pub max_difference: f64,
    /// Per-pixel error map, stretched to full range for visualization.
    pub heatmap: GrayImage,
}

/// Re-encode `image` at `quality` and measure per-pixel error levels.
pub fn compute_error_levels(image: &RgbImage, quality: u8) -> VeridocResult<ErrorLevelAnalysis> {
    let mut encoded = Vec::new();
    JpegEncoder::new_with_quality(Cursor::new(&mut encoded), quality)
        .encode_image(image)
        .map_err(VeridocError::ImageDecode)?;

    let recompressed = image::load_from_memory_with_format(&encoded, ImageFormat::Jpeg)
        .map_err(VeridocError::ImageDecode)?
        .to_rgb8();

    let (width, height) = image.dimensions();
    let mut diff = GrayImage::new(width, height);
    let mut sum: u64 = 0;
    let mut max: u8 = 0;

    for (original, reencoded) in image.pixels().zip(recompressed.pixels()) {
        let x = diff_pixel(original.0, reencoded.0);
        sum += x as u64;
        max = max.max(x);
    }
    for ((_, _, out), (original, reencoded)) in diff
        .enumerate_pixels_mut()
        .zip(image.pixels().zip(recompressed.pixels()))
    {
        let x = diff_pixel(original.0, reencoded.0);
        // Stretch to full range so faint error structure stays visible.
        let stretched = if max > 0 {
            ((x as u32 * 255) / max as u32) as u8
        } else {
            0
        };
        *out = image::Luma([stretched]);
    }

    let pixel_count = (width as u64 * height as u64).max(1);
    Ok(ErrorLevelAnalysis {
        mean_difference: sum as f64 / pixel_count as f64,
        max_difference: max as f64,
        heatmap: diff,
    })
}

/// Maximum channel-wise absolute difference of one pixel pair.
fn diff_pixel(a: [u8; 3], b: [u8; 3]) -> u8 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| x.abs_diff(*y))
        .max()
        .unwrap_or(0)
}

/// Convenience wrapper accepting any decoded image.
pub fn compute_error_levels_dynamic(
    image: &DynamicImage,
    quality: u8,
) -> VeridocResult<ErrorLevelAnalysis> {
    compute_error_levels(&image.to_rgb8(), quality)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_image_has_low_error_levels() {
        let img = RgbImage::from_pixel(64, 64, image::Rgb([200, 200, 200]));
        let analysis = compute_error_levels(&img, 90).unwrap();
        assert!(
            analysis.mean_difference < 8.0,
            "flat image should recompress cleanly, mean {}",
            analysis.mean_difference
        );
        assert_eq!(analysis.heatmap.dimensions(), (64, 64));
    }

    #[test]
    fn noisy_image_has_higher_error_levels_than_flat() {
        let flat = RgbImage::from_pixel(64, 64, image::Rgb([128, 128, 128]));
        // Deterministic high-frequency checker pattern — worst case for JPEG.
        let noisy = RgbImage::from_fn(64, 64, |x, y| {
            if (x + y) % 2 == 0 {
                image::Rgb([255, 0, 255])
            } else {
                image::Rgb([0, 255, 0])
            }
        });
        let flat_mean = compute_error_levels(&flat, 90).unwrap().mean_difference;
        let noisy_mean = compute_error_levels(&noisy, 90).unwrap().mean_difference;
        assert!(
            noisy_mean > flat_mean,
            "checker pattern should show more recompression error: {noisy_mean} vs {flat_mean}"
        );
    }
}
