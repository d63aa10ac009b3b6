//! Layout structure analysis — does the page look like a document?
//!
//! Computes cheap global structure metrics from the grayscale page:
//! aspect ratio, border whiteness, edge density, and the number of
//! horizontal text bands found by projection profiling. The combination
//! separates document-shaped pages from photos and from pages whose
//! structure was destroyed by heavy manipulation.

use crate::engine::pipeline::{PixelRect, StructureMetrics};
use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::edges::canny;
use imageproc::rect::Rect;

const BAND_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Fraction of each dimension treated as the border frame.
const BORDER_FRACTION: f64 = 0.05;
/// A row belongs to a text band when at least this fraction of its
/// pixels is dark.
const ROW_INK_THRESHOLD: f64 = 0.02;
/// Luminance below this counts as ink.
const INK_LUMA: u8 = 128;

/// Result of one structure pass.
pub struct StructureAnalysis {
    pub metrics: StructureMetrics,
    pub valid: bool,
    /// Horizontal text bands, for the overlay artifact.
    pub bands: Vec<PixelRect>,
}

/// Analyze the global structure of one page.
pub fn analyze_structure(image: &RgbImage) -> StructureAnalysis {
    let gray = DynamicImage::ImageRgb8(image.clone()).to_luma8();
    let (width, height) = gray.dimensions();

    let aspect_ratio = f64::from(width) / f64::from(height.max(1));
    let border_whiteness = border_whiteness(&gray);
    let edge_density = edge_density(&gray);
    let bands = text_bands(&gray);

    let metrics = StructureMetrics {
        aspect_ratio,
        border_whiteness,
        edge_density,
        text_band_count: bands.len(),
    };

    // A document page: light margins and several distinct text bands.
    let valid = border_whiteness >= 0.5 && bands.len() >= 3;

    StructureAnalysis {
        metrics,
        valid,
        bands,
    }
}

/// Anomaly score for the structure result: quality components averaged,
/// inverted into the common 0 = authentic, 1 = anomalous orientation.
pub fn structure_anomaly(analysis: &StructureAnalysis) -> f64 {
    let band_quality = (analysis.metrics.text_band_count as f64 / 6.0).min(1.0);
    let margin_quality = analysis.metrics.border_whiteness.clamp(0.0, 1.0);
    // Documents sit in a moderate edge-density range; both extremes are off.
    let edge_quality = 1.0 - (analysis.metrics.edge_density - 0.08).abs().min(1.0);
    let quality = (band_quality + margin_quality + edge_quality) / 3.0;
    (1.0 - quality).clamp(0.0, 1.0)
}

/// Draw the detected text bands on a copy of the page.
pub fn draw_structure_overlay(image: &RgbImage, analysis: &StructureAnalysis) -> RgbImage {
    let mut overlay = image.clone();
    for band in &analysis.bands {
        let rect = Rect::at(band.x, band.y).of_size(band.width.max(1), band.height.max(1));
        draw_hollow_rect_mut(&mut overlay, rect, BAND_COLOR);
    }
    overlay
}

/// Mean luminance of the outer border frame, normalized to 0–1.
fn border_whiteness(gray: &GrayImage) -> f64 {
    let (width, height) = gray.dimensions();
    let bx = ((f64::from(width) * BORDER_FRACTION) as u32).max(1);
    let by = ((f64::from(height) * BORDER_FRACTION) as u32).max(1);

    let mut sum: u64 = 0;
    let mut count: u64 = 0;
    for (x, y, p) in gray.enumerate_pixels() {
        let in_border = x < bx || x >= width - bx || y < by || y >= height - by;
        if in_border {
            sum += u64::from(p.0[0]);
            count += 1;
        }
    }
    if count == 0 {
        return 0.0;
    }
    sum as f64 / count as f64 / 255.0
}

/// Fraction of pixels the Canny detector marks as edges.
fn edge_density(gray: &GrayImage) -> f64 {
    let edges = canny(gray, 50.0, 100.0);
    let edge_pixels = edges.pixels().filter(|p| p.0[0] > 0).count();
    let total = (edges.width() as usize * edges.height() as usize).max(1);
    edge_pixels as f64 / total as f64
}

/// Horizontal projection profile: consecutive inked rows grouped into bands.
fn text_bands(gray: &GrayImage) -> Vec<PixelRect> {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let mut bands = Vec::new();
    let mut band_start: Option<u32> = None;
    for y in 0..height {
        let ink = (0..width)
            .filter(|&x| gray.get_pixel(x, y).0[0] < INK_LUMA)
            .count();
        let inked = ink as f64 / width as f64 >= ROW_INK_THRESHOLD;
        match (inked, band_start) {
            (true, None) => band_start = Some(y),
            (false, Some(start)) => {
                bands.push(PixelRect {
                    x: 0,
                    y: start as i32,
                    width,
                    height: y - start,
                });
                band_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = band_start {
        bands.push(PixelRect {
            x: 0,
            y: start as i32,
            width,
            height: height - start,
        });
    }
    bands
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    /// White page with dark horizontal stripes standing in for text rows.
    fn striped_page(stripes: u32) -> RgbImage {
        let mut img = RgbImage::from_pixel(100, 120, Rgb([255, 255, 255]));
        for s in 0..stripes {
            let top = 12 + s * 14;
            for y in top..top + 4 {
                for x in 10..90 {
                    img.put_pixel(x, y, Rgb([20, 20, 20]));
                }
            }
        }
        img
    }

    #[test]
    fn striped_page_yields_one_band_per_stripe() {
        let analysis = analyze_structure(&striped_page(5));
        assert_eq!(analysis.metrics.text_band_count, 5);
        assert!(analysis.valid);
        assert!(analysis.metrics.border_whiteness > 0.9);
    }

    #[test]
    fn blank_page_is_not_a_valid_document() {
        let img = RgbImage::from_pixel(100, 120, Rgb([255, 255, 255]));
        let analysis = analyze_structure(&img);
        assert_eq!(analysis.metrics.text_band_count, 0);
        assert!(!analysis.valid);
    }

    #[test]
    fn dark_photo_fails_border_check() {
        let img = RgbImage::from_pixel(100, 120, Rgb([30, 30, 30]));
        let analysis = analyze_structure(&img);
        assert!(analysis.metrics.border_whiteness < 0.5);
        assert!(!analysis.valid);
    }

    #[test]
    fn structured_page_scores_less_anomalous_than_blank() {
        let structured = analyze_structure(&striped_page(6));
        let blank = analyze_structure(&RgbImage::from_pixel(100, 120, Rgb([255, 255, 255])));
        assert!(structure_anomaly(&structured) < structure_anomaly(&blank));
    }

    #[test]
    fn overlay_marks_band_rows() {
        let page = striped_page(3);
        let analysis = analyze_structure(&page);
        let overlay = draw_structure_overlay(&page, &analysis);
        assert_eq!(overlay.dimensions(), page.dimensions());
    }
}
