use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageReader};
use std::io::Cursor;

#[derive(Debug, Clone)]
pub struct CompressedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub original_width: u32,
    pub original_height: u32,
}

/// Target dimensions for a `width`×`height` image capped at `max_width`, aspect preserved.
pub fn fit_to_width(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width || width == 0 {
        return (width, height);
    }
    let scaled = (height as u64 * max_width as u64 + width as u64 / 2) / width as u64;
    (max_width, scaled.max(1) as u32)
}

/// Decode `data` (format guessed from content), cap its width and re-encode as JPEG.
pub fn compress_to_jpeg(
    data: &[u8],
    max_width: u32,
    quality: u8,
) -> Result<CompressedImage, image::ImageError> {
    let img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()?
        .decode()?;
    let (original_width, original_height) = img.dimensions();
    let (width, height) = fit_to_width(original_width, original_height, max_width);

    let img = if (width, height) != (original_width, original_height) {
        img.resize_exact(width, height, FilterType::Lanczos3)
    } else {
        img
    };

    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut out = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))?;

    Ok(CompressedImage {
        data: out,
        width,
        height,
        original_width,
        original_height,
    })
}
