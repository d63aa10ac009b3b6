//! Code-symbol detection — locate and decode QR codes on the page
//!
//! Genuine issued documents carry verifiable QR payloads; a located grid
//! that refuses to decode is a strong forgery tell (re-printed or
//! composited at too low a fidelity).

use crate::engine::pipeline::{DecodedSymbol, PixelPoint};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

const ANNOTATION_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Result of scanning one page for code symbols.
pub struct SymbolScan {
    pub symbols: Vec<DecodedSymbol>,
    /// Grids located but not decodable.
    pub undecodable: usize,
}

impl SymbolScan {
    pub fn detected(&self) -> bool {
        !self.symbols.is_empty() || self.undecodable > 0
    }
}

/// Locate and decode every QR grid on the page.
pub fn scan_symbols(image: &RgbImage) -> SymbolScan {
    let gray = DynamicImage::ImageRgb8(image.clone()).to_luma8();
    let mut prepared = rqrr::PreparedImage::prepare(gray);

    let mut symbols = Vec::new();
    let mut undecodable = 0usize;
    for grid in prepared.detect_grids() {
        let corners: Vec<PixelPoint> = grid
            .bounds
            .iter()
            .map(|p| PixelPoint {
                x: p.x as i32,
                y: p.y as i32,
            })
            .collect();
        match grid.decode() {
            Ok((_meta, content)) => symbols.push(DecodedSymbol {
                symbol_type: "qr".to_string(),
                data: content,
                corners: Some(corners),
            }),
            Err(err) => {
                tracing::debug!("QR grid located but not decodable: {err:?}");
                undecodable += 1;
            }
        }
    }

    SymbolScan {
        symbols,
        undecodable,
    }
}

/// Draw a hollow rectangle around each decoded symbol.
pub fn annotate_symbols(image: &RgbImage, scan: &SymbolScan) -> RgbImage {
    let mut annotated = image.clone();
    for symbol in &scan.symbols {
        let Some(corners) = &symbol.corners else {
            continue;
        };
        if let Some(rect) = bounding_rect(corners) {
            draw_hollow_rect_mut(&mut annotated, rect, ANNOTATION_COLOR);
        }
    }
    annotated
}

fn bounding_rect(corners: &[PixelPoint]) -> Option<Rect> {
    let min_x = corners.iter().map(|p| p.x).min()?;
    let min_y = corners.iter().map(|p| p.y).min()?;
    let max_x = corners.iter().map(|p| p.x).max()?;
    let max_y = corners.iter().map(|p| p.y).max()?;
    let width = (max_x - min_x).max(1) as u32;
    let height = (max_y - min_y).max(1) as u32;
    Some(Rect::at(min_x, min_y).of_size(width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_page_has_no_symbols() {
        let img = RgbImage::from_pixel(64, 64, Rgb([255, 255, 255]));
        let scan = scan_symbols(&img);
        assert!(!scan.detected());
        assert_eq!(scan.undecodable, 0);
    }

    #[test]
    fn annotation_leaves_dimensions_untouched() {
        let img = RgbImage::from_pixel(32, 32, Rgb([255, 255, 255]));
        let scan = SymbolScan {
            symbols: vec![DecodedSymbol {
                symbol_type: "qr".to_string(),
                data: "test".to_string(),
                corners: Some(vec![
                    PixelPoint { x: 4, y: 4 },
                    PixelPoint { x: 20, y: 4 },
                    PixelPoint { x: 20, y: 20 },
                    PixelPoint { x: 4, y: 20 },
                ]),
            }],
            undecodable: 0,
        };
        let annotated = annotate_symbols(&img, &scan);
        assert_eq!(annotated.dimensions(), img.dimensions());
        // The rectangle edge actually got drawn.
        assert_eq!(annotated.get_pixel(4, 4), &ANNOTATION_COLOR);
    }
}
