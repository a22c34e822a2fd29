//! Image utilities for testing.
//!
//! This module provides helper functions for decoding and checking rendered maps.

use image::{DynamicImage, GenericImageView, ImageError, ImageFormat};

/// Load an image from a byte array
pub fn load_image_from_bytes(bytes: &[u8]) -> Result<DynamicImage, ImageError> {
    image::load_from_memory(bytes)
}

/// Detect image format from bytes
pub fn detect_image_format(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes).ok()
}

/// Check if an image has the expected dimensions
pub fn assert_image_dimensions(
    image: &DynamicImage,
    expected_width: u32,
    expected_height: u32,
) -> Result<(), String> {
    let (actual_width, actual_height) = image.dimensions();

    if actual_width != expected_width || actual_height != expected_height {
        return Err(format!(
            "Image dimensions differ: actual = {}x{}, expected = {}x{}",
            actual_width, actual_height, expected_width, expected_height
        ));
    }

    Ok(())
}

/// Check if an image has the expected format
pub fn assert_image_format(bytes: &[u8], expected_format: ImageFormat) -> Result<(), String> {
    let actual_format =
        detect_image_format(bytes).ok_or_else(|| "Could not detect image format".to_string())?;

    if actual_format != expected_format {
        return Err(format!(
            "Image format differs: actual = {:?}, expected = {:?}",
            actual_format, expected_format
        ));
    }

    Ok(())
}

/// Fraction of fully transparent pixels
pub fn transparent_fraction(image: &DynamicImage) -> f64 {
    let rgba = image.to_rgba8();
    let transparent = rgba.pixels().filter(|p| p.0[3] == 0).count();
    let total = (rgba.width() * rgba.height()).max(1);
    transparent as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    #[test]
    fn test_detect_image_format() {
        let img = ImageBuffer::<Rgba<u8>, Vec<u8>>::new(2, 2);
        let mut png_bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut png_bytes), ImageFormat::Png)
            .unwrap();

        assert!(assert_image_format(&png_bytes, ImageFormat::Png).is_ok());
        assert!(assert_image_format(&png_bytes, ImageFormat::Jpeg).is_err());
    }

    #[test]
    fn test_transparent_fraction() {
        let mut img = ImageBuffer::<Rgba<u8>, Vec<u8>>::new(2, 2);
        img.put_pixel(0, 0, Rgba([1, 2, 3, 255]));
        let img = DynamicImage::ImageRgba8(img);
        assert!((transparent_fraction(&img) - 0.75).abs() < 1e-9);
        assert!(assert_image_dimensions(&img, 2, 2).is_ok());
    }
}
