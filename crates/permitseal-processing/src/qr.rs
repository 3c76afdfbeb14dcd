//! QR code generation.
//!
//! Produces a PNG encoding the given URL at error-correction level M with
//! black-on-white modules and a 4-module quiet zone. Output is
//! deterministic for a given input; scanning it decodes back to exactly
//! the input string.

use std::io::Cursor;

use image::{ImageBuffer, Luma};
use permitseal_core::constants::{QR_MODULE_SCALE, QR_QUIET_ZONE_MODULES};
use qrcode::{Color, EcLevel, QrCode};

#[derive(Debug, thiserror::Error)]
pub enum QrError {
    /// The input cannot be encoded in the symbology (empty, or exceeds
    /// the maximum payload length).
    #[error("QR encoding failed: {0}")]
    Encoding(String),
}

/// Render `url` as a QR code PNG. The caller is expected to pass a
/// well-formed URL; no URL validation happens here.
pub fn generate_qr(url: &str) -> Result<Vec<u8>, QrError> {
    if url.is_empty() {
        return Err(QrError::Encoding("empty input".to_string()));
    }

    let code = QrCode::with_error_correction_level(url.as_bytes(), EcLevel::M)
        .map_err(|e| QrError::Encoding(e.to_string()))?;

    let modules = code.width() as u32;
    let colors = code.to_colors();
    let scale = QR_MODULE_SCALE;
    let margin = QR_QUIET_ZONE_MODULES;
    let dim = (modules + 2 * margin) * scale;

    let mut img = ImageBuffer::from_pixel(dim, dim, Luma([255u8]));
    for y in 0..modules {
        for x in 0..modules {
            if colors[(y * modules + x) as usize] == Color::Dark {
                for dy in 0..scale {
                    for dx in 0..scale {
                        img.put_pixel((x + margin) * scale + dx, (y + margin) * scale + dy, Luma([0u8]));
                    }
                }
            }
        }
    }

    let mut out = Vec::new();
    image::DynamicImage::ImageLuma8(img)
        .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .map_err(|e| QrError::Encoding(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_qr(png: &[u8]) -> String {
        let img = image::load_from_memory(png).unwrap().to_luma8();
        let (w, h) = img.dimensions();
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            w as usize,
            h as usize,
            |x, y| img.get_pixel(x as u32, y as u32).0[0],
        );
        let grids = prepared.detect_grids();
        assert_eq!(grids.len(), 1, "expected exactly one QR symbol");
        let (_meta, content) = grids[0].decode().unwrap();
        content
    }

    #[test]
    fn test_round_trip() {
        let url = "https://permits.example.com/document/PERMIT-042";
        let png = generate_qr(url).unwrap();
        assert_eq!(decode_qr(&png), url);
    }

    #[test]
    fn test_deterministic_output() {
        let url = "https://permits.example.com/document/PERMIT-001";
        assert_eq!(generate_qr(url).unwrap(), generate_qr(url).unwrap());
    }

    #[test]
    fn test_output_is_square_png() {
        let png = generate_qr("https://x.test/document/PERMIT-001").unwrap();
        let img = image::load_from_memory(&png).unwrap();
        assert_eq!(img.width(), img.height());
        // Quiet zone present: the corner pixel is white
        assert_eq!(img.to_luma8().get_pixel(0, 0).0[0], 255);
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(matches!(generate_qr(""), Err(QrError::Encoding(_))));
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let huge = "x".repeat(5000);
        assert!(matches!(generate_qr(&huge), Err(QrError::Encoding(_))));
    }
}
