//! Pixelization: nearest-neighbor downsampling, color keying and optional
//! upscaling back to the source resolution.
//!
//! Each `pixel_size x pixel_size` block collapses into the sample at its
//! top-left corner. Keying compares only the RGB channels of every pixel
//! against the top-left pixel of the downsampled image.

use image::{DynamicImage, ImageBuffer, Pixel, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::error::{Result, PixelsError};

pub const MIN_PIXEL_SIZE: u32 = 1;
pub const MAX_PIXEL_SIZE: u32 = 16;
pub const MAX_TOLERANCE: u32 = 128;

// ============================================================================
// SETTINGS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PixelizerSettings {
    /// Integer divisor applied to both dimensions (default: 8)
    pub pixel_size: u32,
    /// Per-channel keying tolerance, 0 disables keying (default: 12)
    pub tolerance: u32,
    /// Scale back to the original resolution after keying (default: false)
    pub upscale_after: bool,
}

impl Default for PixelizerSettings {
    fn default() -> Self {
        Self {
            pixel_size: 8,
            tolerance: 12,
            upscale_after: false,
        }
    }
}

impl PixelizerSettings {
    pub fn validate(&self) -> Result<()> {
        if self.pixel_size < MIN_PIXEL_SIZE || self.pixel_size > MAX_PIXEL_SIZE {
            return Err(PixelsError::InvalidConfiguration(format!(
                "pixel_size must be in {}..={}, got {}",
                MIN_PIXEL_SIZE, MAX_PIXEL_SIZE, self.pixel_size
            )));
        }
        if self.tolerance > MAX_TOLERANCE {
            return Err(PixelsError::InvalidConfiguration(format!(
                "tolerance must be in 0..={}, got {}",
                MAX_TOLERANCE, self.tolerance
            )));
        }
        Ok(())
    }
}

// ============================================================================
// NEAREST-NEIGHBOR RESAMPLING
// ============================================================================

fn resample_buffer<P, F>(
    buf: &ImageBuffer<P, Vec<P::Subpixel>>,
    width: u32,
    height: u32,
    source: &F,
) -> ImageBuffer<P, Vec<P::Subpixel>>
where
    P: Pixel,
    F: Fn(u32, u32) -> (u32, u32),
{
    ImageBuffer::from_fn(width, height, |x, y| {
        let (src_x, src_y) = source(x, y);
        *buf.get_pixel(src_x, src_y)
    })
}

/// Resample keeping the source color type where possible
fn resample<F>(img: &DynamicImage, width: u32, height: u32, source: F) -> DynamicImage
where
    F: Fn(u32, u32) -> (u32, u32),
{
    match img {
        DynamicImage::ImageLuma8(buf) => DynamicImage::ImageLuma8(resample_buffer(buf, width, height, &source)),
        DynamicImage::ImageLumaA8(buf) => DynamicImage::ImageLumaA8(resample_buffer(buf, width, height, &source)),
        DynamicImage::ImageRgb8(buf) => DynamicImage::ImageRgb8(resample_buffer(buf, width, height, &source)),
        DynamicImage::ImageRgba8(buf) => DynamicImage::ImageRgba8(resample_buffer(buf, width, height, &source)),
        DynamicImage::ImageLuma16(buf) => DynamicImage::ImageLuma16(resample_buffer(buf, width, height, &source)),
        DynamicImage::ImageLumaA16(buf) => DynamicImage::ImageLumaA16(resample_buffer(buf, width, height, &source)),
        DynamicImage::ImageRgb16(buf) => DynamicImage::ImageRgb16(resample_buffer(buf, width, height, &source)),
        DynamicImage::ImageRgba16(buf) => DynamicImage::ImageRgba16(resample_buffer(buf, width, height, &source)),
        DynamicImage::ImageRgb32F(buf) => DynamicImage::ImageRgb32F(resample_buffer(buf, width, height, &source)),
        DynamicImage::ImageRgba32F(buf) => DynamicImage::ImageRgba32F(resample_buffer(buf, width, height, &source)),
        other => DynamicImage::ImageRgba8(resample_buffer(&other.to_rgba8(), width, height, &source)),
    }
}

/// Collapse each `pixel_size` block into its top-left sample
pub fn downsample(img: &DynamicImage, pixel_size: u32) -> Result<DynamicImage> {
    let (width, height) = (img.width(), img.height());
    let scaled_width = width / pixel_size.max(1);
    let scaled_height = height / pixel_size.max(1);

    if scaled_width == 0 || scaled_height == 0 {
        return Err(PixelsError::ImageTooSmallForPixelSize {
            width,
            height,
            pixel_size,
        });
    }

    Ok(resample(img, scaled_width, scaled_height, |x, y| {
        (x * pixel_size, y * pixel_size)
    }))
}

/// Nearest-neighbor resize to an arbitrary size, sampling at pixel centers
pub fn resize_nearest(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    let (src_width, src_height) = (img.width() as u64, img.height() as u64);
    let (dst_width, dst_height) = (width as u64, height as u64);

    if src_width == 0 || src_height == 0 {
        return DynamicImage::new_rgba8(width, height);
    }

    resample(img, width, height, |x, y| {
        let src_x = ((2 * x as u64 + 1) * src_width / (2 * dst_width)).min(src_width - 1);
        let src_y = ((2 * y as u64 + 1) * src_height / (2 * dst_height)).min(src_height - 1);
        (src_x as u32, src_y as u32)
    })
}

// ============================================================================
// COLOR KEYING
// ============================================================================

/// Every RGB channel lies within `tolerance` of the reference (alpha ignored)
pub fn is_within_tolerance(pixel: &Rgba<u8>, reference: &Rgba<u8>, tolerance: u32) -> bool {
    (0..3).all(|i| (pixel[i] as i32 - reference[i] as i32).unsigned_abs() <= tolerance)
}

/// Make every pixel matching the top-left color fully transparent.
///
/// Returns the number of keyed pixels.
pub fn key_color(img: &mut RgbaImage, tolerance: u32) -> usize {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return 0;
    }

    let reference = *img.get_pixel(0, 0);
    let mut keyed = 0;

    for pixel in img.pixels_mut() {
        if is_within_tolerance(pixel, &reference, tolerance) {
            *pixel = Rgba([0, 0, 0, 0]);
            keyed += 1;
        }
    }

    keyed
}

// ============================================================================
// MAIN ENTRY POINT
// ============================================================================

/// Downsample, key out the background and optionally upscale back
pub fn pixelize(img: &DynamicImage, settings: &PixelizerSettings) -> Result<DynamicImage> {
    settings.validate()?;

    let (width, height) = (img.width(), img.height());
    let mut result = downsample(img, settings.pixel_size)?;
    debug!(
        "Downsampled {}x{} -> {}x{} (pixel size {})",
        width,
        height,
        result.width(),
        result.height(),
        settings.pixel_size
    );

    // Tolerance 0 leaves color type and alpha untouched
    if settings.tolerance != 0 {
        let mut rgba = result.to_rgba8();
        let keyed = key_color(&mut rgba, settings.tolerance);
        debug!("Keyed {} pixels to transparent (tolerance {})", keyed, settings.tolerance);
        result = DynamicImage::ImageRgba8(rgba);
    }

    if settings.upscale_after {
        result = resize_nearest(&result, width, height);
    }

    Ok(result)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, RgbImage, Rgb};
    use proptest::prelude::*;

    fn settings(pixel_size: u32, tolerance: u32, upscale_after: bool) -> PixelizerSettings {
        PixelizerSettings {
            pixel_size,
            tolerance,
            upscale_after,
        }
    }

    fn checker(width: u32, height: u32, block: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            if ((x / block) + (y / block)) % 2 == 0 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([200, 30, 30, 255])
            }
        })
    }

    #[test]
    fn test_default_settings() {
        let settings = PixelizerSettings::default();
        assert_eq!(settings.pixel_size, 8);
        assert_eq!(settings.tolerance, 12);
        assert!(!settings.upscale_after);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        assert!(matches!(
            settings(0, 0, false).validate(),
            Err(PixelsError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            settings(17, 0, false).validate(),
            Err(PixelsError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            settings(4, 129, false).validate(),
            Err(PixelsError::InvalidConfiguration(_))
        ));
        assert!(settings(16, 128, true).validate().is_ok());
    }

    #[test]
    fn test_downsample_uses_top_left_sample() {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 255]));
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img.put_pixel(2, 2, Rgba([0, 255, 0, 255]));

        let out = downsample(&DynamicImage::ImageRgba8(img), 2).unwrap();
        assert_eq!(out.dimensions(), (2, 2));
        assert_eq!(out.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
        assert_eq!(out.get_pixel(1, 1), Rgba([0, 255, 0, 255]));
        assert_eq!(out.get_pixel(1, 0), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_downsample_floors_dimensions() {
        let img = DynamicImage::ImageRgba8(checker(10, 7, 1));
        let out = downsample(&img, 3).unwrap();
        assert_eq!(out.dimensions(), (3, 2));
    }

    #[test]
    fn test_pixel_size_larger_than_image() {
        let img = DynamicImage::ImageRgba8(checker(5, 20, 1));
        let err = pixelize(&img, &settings(8, 0, false)).unwrap_err();
        assert!(matches!(
            err,
            PixelsError::ImageTooSmallForPixelSize { width: 5, height: 20, pixel_size: 8 }
        ));
    }

    #[test]
    fn test_keying_removes_background() {
        let mut img = RgbaImage::from_pixel(8, 8, Rgba([10, 200, 10, 255]));
        for y in 4..8 {
            for x in 4..8 {
                img.put_pixel(x, y, Rgba([120, 60, 20, 255]));
            }
        }

        let out = pixelize(&DynamicImage::ImageRgba8(img), &settings(2, 12, false)).unwrap();
        let out = out.to_rgba8();
        assert_eq!(out.dimensions(), (4, 4));
        assert_eq!(*out.get_pixel(0, 0), Rgba([0, 0, 0, 0]));
        assert_eq!(*out.get_pixel(1, 3), Rgba([0, 0, 0, 0]));
        assert_eq!(*out.get_pixel(3, 3), Rgba([120, 60, 20, 255]));
    }

    #[test]
    fn test_keying_tolerance_is_per_channel() {
        let mut img = RgbaImage::from_pixel(2, 1, Rgba([255, 255, 255, 255]));
        img.put_pixel(1, 0, Rgba([0, 0, 0, 255]));

        let out = pixelize(&DynamicImage::ImageRgba8(img), &settings(1, 128, false)).unwrap();
        let out = out.to_rgba8();
        assert_eq!(out.get_pixel(0, 0)[3], 0);
        assert_eq!(*out.get_pixel(1, 0), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_keying_boundary_is_inclusive() {
        let mut img = RgbaImage::from_pixel(3, 1, Rgba([100, 100, 100, 255]));
        img.put_pixel(1, 0, Rgba([112, 88, 100, 255]));
        img.put_pixel(2, 0, Rgba([113, 100, 100, 255]));

        let mut keyed = img.clone();
        assert_eq!(key_color(&mut keyed, 12), 2);
        assert_eq!(keyed.get_pixel(1, 0)[3], 0);
        assert_eq!(keyed.get_pixel(2, 0)[3], 255);
    }

    #[test]
    fn test_keying_ignores_alpha() {
        let reference = Rgba([50, 50, 50, 255]);
        let faded = Rgba([50, 50, 50, 3]);
        assert!(is_within_tolerance(&faded, &reference, 1));
    }

    #[test]
    fn test_keying_converts_rgb_to_rgba() {
        let img = RgbImage::from_pixel(4, 4, Rgb([9, 9, 9]));
        let out = pixelize(&DynamicImage::ImageRgb8(img), &settings(2, 5, false)).unwrap();
        assert!(matches!(out, DynamicImage::ImageRgba8(_)));
        assert!(out.to_rgba8().pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn test_zero_tolerance_preserves_color_type() {
        let img = RgbImage::from_pixel(4, 4, Rgb([9, 9, 9]));
        let out = pixelize(&DynamicImage::ImageRgb8(img), &settings(2, 0, false)).unwrap();
        assert!(matches!(out, DynamicImage::ImageRgb8(_)));
    }

    #[test]
    fn test_upscale_restores_dimensions_with_blocks() {
        let img = checker(9, 9, 1);
        let out = pixelize(&DynamicImage::ImageRgba8(img), &settings(3, 0, true)).unwrap();
        assert_eq!(out.dimensions(), (9, 9));

        // Each 3x3 block is a single color after the round trip
        let out = out.to_rgba8();
        for by in 0..3 {
            for bx in 0..3 {
                let first = *out.get_pixel(bx * 3, by * 3);
                for y in 0..3 {
                    for x in 0..3 {
                        assert_eq!(*out.get_pixel(bx * 3 + x, by * 3 + y), first);
                    }
                }
            }
        }
    }

    #[test]
    fn test_upscale_uneven_dimensions() {
        let img = checker(11, 5, 2);
        let out = pixelize(&DynamicImage::ImageRgba8(img), &settings(2, 0, true)).unwrap();
        assert_eq!(out.dimensions(), (11, 5));
    }

    #[test]
    fn test_upscale_maps_pixel_centers() {
        let strip = RgbaImage::from_fn(5, 1, |x, _| Rgba([x as u8, 0, 0, 255]));
        let out = resize_nearest(&DynamicImage::ImageRgba8(strip), 11, 1).to_rgba8();
        let columns: Vec<u8> = (0..11).map(|x| out.get_pixel(x, 0)[0]).collect();
        assert_eq!(columns, vec![0, 0, 1, 1, 2, 2, 2, 3, 3, 4, 4]);
    }

    #[test]
    fn test_identity_keeps_16_bit_luma() {
        let img = image::ImageBuffer::from_fn(3, 3, |x, y| image::Luma([1000u16 + x as u16 + 3 * y as u16]));
        let input = DynamicImage::ImageLuma16(img);
        let out = pixelize(&input, &settings(1, 0, false)).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_identity_keeps_float_rgba() {
        let img = image::Rgba32FImage::from_fn(2, 2, |x, y| Rgba([x as f32 * 0.25, y as f32 * 0.5, 0.125, 0.75]));
        let input = DynamicImage::ImageRgba32F(img);
        let out = pixelize(&input, &settings(1, 0, false)).unwrap();
        assert_eq!(out, input);
    }

    proptest! {
        #[test]
        fn prop_pixel_size_one_is_identity(
            width in 1u32..12,
            height in 1u32..12,
            seed in any::<u64>(),
        ) {
            let img = RgbaImage::from_fn(width, height, |x, y| {
                let v = seed.wrapping_mul(31).wrapping_add((x * 7 + y * 13) as u64);
                Rgba([v as u8, (v >> 8) as u8, (v >> 16) as u8, (v >> 24) as u8])
            });
            let input = DynamicImage::ImageRgba8(img.clone());
            let out = pixelize(&input, &settings(1, 0, false)).unwrap();
            prop_assert_eq!(out.to_rgba8(), img);
        }

        #[test]
        fn prop_zero_tolerance_keeps_alpha(
            pixel_size in 1u32..5,
            alpha in any::<u8>(),
        ) {
            let img = RgbaImage::from_fn(16, 16, |x, y| Rgba([x as u8, y as u8, 0, alpha]));
            let input = DynamicImage::ImageRgba8(img);
            let out = pixelize(&input, &settings(pixel_size, 0, false)).unwrap();
            prop_assert!(out.to_rgba8().pixels().all(|p| p[3] == alpha));
        }
    }
}
