//! Image preparation for local label recognition.
//!
//! Phone photos of packaging are small, colourful and often washed out.
//! The local recognizer reads them better as a larger, high-contrast
//! grayscale PNG, so every image passes through the same fixed steps:
//!
//! 1. Validate byte size bounds
//! 2. Decode
//! 3. Convert to grayscale (ITU-R BT.601)
//! 4. Upscale 2x with CatmullRom when the largest side is under 1200 px
//! 5. Stretch contrast when RMS contrast is below 25
//! 6. Encode PNG

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, GrayImage, ImageOutputFormat, Luma, RgbImage};

use super::ExtractionError;

// ═══════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════

/// Maximum input image size (in bytes) before rejecting.
const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024; // 50 MB

/// Minimum valid image size in bytes (smallest valid PNG is ~67 bytes).
const MIN_IMAGE_BYTES: usize = 67;

/// Images whose largest side is below this are upscaled.
pub const UPSCALE_BELOW_PX: u32 = 1200;

const UPSCALE_FACTOR: u32 = 2;

/// RMS contrast below this gets a linear stretch.
pub const LOW_CONTRAST_THRESHOLD: f32 = 25.0;

// ═══════════════════════════════════════════════════════════
// Preprocessor trait
// ═══════════════════════════════════════════════════════════

/// Pure image-to-image transform ahead of local recognition.
pub trait ImagePreprocessor: Send + Sync {
    fn preprocess(&self, image_bytes: &[u8]) -> Result<PreparedImage, ExtractionError>;
}

#[derive(Debug)]
pub struct PreparedImage {
    /// Grayscale PNG handed to the recognizer.
    pub png_bytes: Vec<u8>,
    pub original_width: u32,
    pub original_height: u32,
    pub width: u32,
    pub height: u32,
    pub upscaled: bool,
    pub contrast_stretched: bool,
    /// RMS contrast measured before any stretch.
    pub contrast_score: f32,
}

/// The standard label preparation pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelPreprocessor;

impl ImagePreprocessor for LabelPreprocessor {
    fn preprocess(&self, image_bytes: &[u8]) -> Result<PreparedImage, ExtractionError> {
        validate_image_bytes(image_bytes)?;

        let img = image::load_from_memory(image_bytes).map_err(|e| {
            ExtractionError::ImageProcessing(format!("Failed to decode image: {e}"))
        })?;
        let (original_width, original_height) = img.dimensions();

        let mut gray = rgb_to_gray(&img.to_rgb8());

        let upscaled = original_width.max(original_height) < UPSCALE_BELOW_PX;
        if upscaled {
            gray = image::imageops::resize(
                &gray,
                original_width * UPSCALE_FACTOR,
                original_height * UPSCALE_FACTOR,
                FilterType::CatmullRom,
            );
        }

        let contrast_score = compute_contrast_score(&gray);
        let contrast_stretched = contrast_score < LOW_CONTRAST_THRESHOLD;
        if contrast_stretched {
            stretch_contrast(&mut gray);
        }

        let (width, height) = gray.dimensions();
        tracing::debug!(
            from = format!("{original_width}x{original_height}"),
            to = format!("{width}x{height}"),
            upscaled,
            contrast_score,
            contrast_stretched,
            "Label image prepared"
        );

        Ok(PreparedImage {
            png_bytes: encode_png(gray)?,
            original_width,
            original_height,
            width,
            height,
            upscaled,
            contrast_stretched,
            contrast_score,
        })
    }
}

// ═══════════════════════════════════════════════════════════
// Steps
// ═══════════════════════════════════════════════════════════

/// Validate image bytes before decoding.
pub fn validate_image_bytes(bytes: &[u8]) -> Result<(), ExtractionError> {
    match bytes.len() {
        n if n < MIN_IMAGE_BYTES => Err(ExtractionError::ImageProcessing(format!(
            "label image is only {n} bytes"
        ))),
        n if n > MAX_IMAGE_BYTES => Err(ExtractionError::ImageProcessing(format!(
            "label image is {n} bytes, limit is {MAX_IMAGE_BYTES}"
        ))),
        _ => Ok(()),
    }
}

/// Convert RGB image to grayscale using ITU-R BT.601 luminance.
pub fn rgb_to_gray(rgb: &RgbImage) -> GrayImage {
    let (w, h) = rgb.dimensions();
    let mut gray = GrayImage::new(w, h);
    for (x, y, p) in rgb.enumerate_pixels() {
        let luma = 0.299 * p.0[0] as f32 + 0.587 * p.0[1] as f32 + 0.114 * p.0[2] as f32;
        gray.put_pixel(x, y, Luma([luma.round().min(255.0) as u8]));
    }
    gray
}

/// RMS contrast: standard deviation of pixel intensities (0 to 127.5).
pub fn compute_contrast_score(img: &GrayImage) -> f32 {
    let n = (img.width() as u64 * img.height() as u64) as f64;
    if n == 0.0 {
        return 0.0;
    }
    let (sum, sum_sq) = img.pixels().fold((0.0f64, 0.0f64), |(s, sq), p| {
        let v = f64::from(p.0[0]);
        (s + v, sq + v * v)
    });
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0).sqrt() as f32
}

/// Linear stretch of the intensity range onto 0..=255. Uniform images are
/// left untouched.
pub fn stretch_contrast(img: &mut GrayImage) {
    let (min, max) = img
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p.0[0]), hi.max(p.0[0])));
    if max <= min {
        return;
    }
    let range = (max - min) as f32;
    for pixel in img.pixels_mut() {
        let stretched = (pixel.0[0] - min) as f32 * 255.0 / range;
        pixel.0[0] = stretched.round() as u8;
    }
}

/// Encode a grayscale image as PNG bytes.
pub fn encode_png(img: GrayImage) -> Result<Vec<u8>, ExtractionError> {
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(img)
        .write_to(&mut cursor, ImageOutputFormat::Png)
        .map_err(|e| ExtractionError::ImageProcessing(format!("PNG encoding failed: {e}")))?;
    Ok(cursor.into_inner())
}

// ═══════════════════════════════════════════════════════════
// Mock implementations (testing)
// ═══════════════════════════════════════════════════════════

/// Passes bytes through untouched, or fails on demand.
pub struct MockImagePreprocessor {
    fail: bool,
}

impl MockImagePreprocessor {
    pub fn new() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

impl Default for MockImagePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ImagePreprocessor for MockImagePreprocessor {
    fn preprocess(&self, image_bytes: &[u8]) -> Result<PreparedImage, ExtractionError> {
        if self.fail {
            return Err(ExtractionError::ImageProcessing(
                "Mock preprocessing failure".into(),
            ));
        }
        Ok(PreparedImage {
            png_bytes: image_bytes.to_vec(),
            original_width: 0,
            original_height: 0,
            width: 0,
            height: 0,
            upscaled: false,
            contrast_stretched: false,
            contrast_score: 0.0,
        })
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn make_png(img: RgbImage) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut cursor, ImageOutputFormat::Png)
            .unwrap();
        cursor.into_inner()
    }

    fn half_and_half(width: u32, height: u32, left: u8, right: u8) -> RgbImage {
        RgbImage::from_fn(width, height, |x, _| {
            let v = if x < width / 2 { left } else { right };
            Rgb([v, v, v])
        })
    }

    fn decode_gray(bytes: &[u8]) -> GrayImage {
        image::load_from_memory(bytes).unwrap().to_luma8()
    }

    #[test]
    fn rejects_too_small_input() {
        let err = LabelPreprocessor.preprocess(&[0u8; 10]).unwrap_err();
        assert!(matches!(err, ExtractionError::ImageProcessing(_)));
    }

    #[test]
    fn rejects_undecodable_input() {
        let err = LabelPreprocessor.preprocess(&[7u8; 200]).unwrap_err();
        assert!(err.to_string().contains("decode"));
    }

    #[test]
    fn small_image_upscaled_twice() {
        let png = make_png(half_and_half(300, 200, 0, 255));
        let prepared = LabelPreprocessor.preprocess(&png).unwrap();
        assert!(prepared.upscaled);
        assert_eq!((prepared.width, prepared.height), (600, 400));
        assert_eq!(decode_gray(&prepared.png_bytes).dimensions(), (600, 400));
    }

    #[test]
    fn large_image_keeps_size() {
        let png = make_png(half_and_half(1300, 20, 0, 255));
        let prepared = LabelPreprocessor.preprocess(&png).unwrap();
        assert!(!prepared.upscaled);
        assert_eq!((prepared.width, prepared.height), (1300, 20));
    }

    #[test]
    fn washed_out_image_stretched() {
        let png = make_png(half_and_half(100, 100, 120, 140));
        let prepared = LabelPreprocessor.preprocess(&png).unwrap();
        assert!(prepared.contrast_stretched);
        let gray = decode_gray(&prepared.png_bytes);
        let min = gray.pixels().map(|p| p.0[0]).min().unwrap();
        let max = gray.pixels().map(|p| p.0[0]).max().unwrap();
        assert_eq!((min, max), (0, 255));
    }

    #[test]
    fn high_contrast_image_not_stretched() {
        let png = make_png(half_and_half(100, 100, 0, 255));
        let prepared = LabelPreprocessor.preprocess(&png).unwrap();
        assert!(!prepared.contrast_stretched);
        assert!(prepared.contrast_score > 100.0);
    }

    #[test]
    fn grayscale_uses_bt601_weights() {
        let rgb = RgbImage::from_pixel(1, 1, Rgb([255, 0, 0]));
        assert_eq!(rgb_to_gray(&rgb).get_pixel(0, 0).0[0], 76);
        let white = RgbImage::from_pixel(2, 2, Rgb([255, 255, 255]));
        assert!(rgb_to_gray(&white).pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn uniform_image_contrast_is_zero() {
        let img = GrayImage::from_pixel(10, 10, Luma([128]));
        assert_eq!(compute_contrast_score(&img), 0.0);
        let mut copy = img.clone();
        stretch_contrast(&mut copy);
        assert_eq!(copy, img);
    }

    #[test]
    fn mock_preprocessor_modes() {
        assert_eq!(
            MockImagePreprocessor::new().preprocess(b"abc").unwrap().png_bytes,
            b"abc"
        );
        assert!(MockImagePreprocessor::failing().preprocess(b"abc").is_err());
    }
}
