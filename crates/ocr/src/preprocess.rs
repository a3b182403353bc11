use image::{imageops, DynamicImage, GrayImage, ImageReader, Luma};
use std::path::Path;
use thiserror::Error;

/// Contrast multiplier applied to the red channel.
pub const CONTRAST_FACTOR: f32 = 2.0;

/// 3×3 sharpening kernel `[-2 -2 -2; -2 32 -2; -2 -2 -2] / 16`, already
/// normalised to a sum of 1.
pub const SHARPEN_KERNEL: [f32; 9] = [
    -0.125, -0.125, -0.125, //
    -0.125, 2.0, -0.125, //
    -0.125, -0.125, -0.125,
];

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Failed to open image: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to load image: {0}")]
    Load(#[from] image::ImageError),
}

/// Load an image file and return the enhanced red channel, ready for OCR.
pub fn preprocess(path: &Path) -> Result<GrayImage, PreprocessError> {
    // Content sniffing first: a PNG may already carry a `.jpg` name from an earlier run.
    let img = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    Ok(preprocess_image(img))
}

/// Red channel → contrast ×2 → sharpen. Ticket numbers are printed in red, which
/// turns light in the red channel while black print stays dark.
pub fn preprocess_image(img: DynamicImage) -> GrayImage {
    let red = red_channel(&img);
    let contrasted = enhance_contrast(&red, CONTRAST_FACTOR);
    sharpen(&contrasted)
}

fn red_channel(img: &DynamicImage) -> GrayImage {
    let rgb = img.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| Luma([rgb.get_pixel(x, y)[0]]))
}

/// Scale every pixel's distance from the rounded mean by `factor`.
fn enhance_contrast(gray: &GrayImage, factor: f32) -> GrayImage {
    let count = u64::from(gray.width()) * u64::from(gray.height());
    if count == 0 {
        return gray.clone();
    }
    let sum: u64 = gray.pixels().map(|p| u64::from(p[0])).sum();
    let mean = (sum as f64 / count as f64 + 0.5).floor() as f32;

    let mut out = gray.clone();
    for p in out.pixels_mut() {
        let v = mean + factor * (f32::from(p[0]) - mean);
        p[0] = v.round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// Apply [`SHARPEN_KERNEL`]. `filter3x3` leaves the one-pixel border black, so the
/// border is copied over from the input.
fn sharpen(gray: &GrayImage) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w < 3 || h < 3 {
        return gray.clone();
    }
    let mut out: GrayImage = imageops::filter3x3(gray, &SHARPEN_KERNEL);
    for x in 0..w {
        out.put_pixel(x, 0, *gray.get_pixel(x, 0));
        out.put_pixel(x, h - 1, *gray.get_pixel(x, h - 1));
    }
    for y in 0..h {
        out.put_pixel(0, y, *gray.get_pixel(0, y));
        out.put_pixel(w - 1, y, *gray.get_pixel(w - 1, y));
    }
    out
}
