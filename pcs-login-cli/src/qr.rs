//! Decoding of the provider's QR code image and terminal rendering.

use image::ImageError;
use qrcode::QrCode;
use qrcode::render::unicode::Dense1x2;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QrError {
    #[error("failed to load QR code image: {0}")]
    Image(#[from] ImageError),

    #[error("no QR symbol found in image")]
    NotFound,

    #[error("failed to decode QR symbol: {0}")]
    Decode(String),

    #[error("failed to encode QR symbol: {0}")]
    Encode(String),
}

/// Reads the content of the first QR symbol found in an encoded image.
pub fn decode(bytes: &[u8]) -> Result<String, QrError> {
    let luma = image::load_from_memory(bytes)?.to_luma8();
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        luma.width() as usize,
        luma.height() as usize,
        |x, y| luma.get_pixel(x as u32, y as u32).0[0],
    );
    let grids = prepared.detect_grids();
    let grid = grids.first().ok_or(QrError::NotFound)?;
    let (_, content) = grid.decode().map_err(|e| QrError::Decode(format!("{e:?}")))?;
    Ok(content)
}

/// Renders `content` as a QR symbol made of half-block characters.
///
/// Colors are inverted so the symbol scans on dark terminal backgrounds.
pub fn render(content: &str) -> Result<String, QrError> {
    let code = QrCode::new(content.as_bytes()).map_err(|e| QrError::Encode(e.to_string()))?;
    Ok(code
        .render::<Dense1x2>()
        .dark_color(Dense1x2::Light)
        .light_color(Dense1x2::Dark)
        .quiet_zone(true)
        .build())
}
