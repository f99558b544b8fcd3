//! Core types for background removal operations

use crate::error::{CutoutError, Result};
use image::{DynamicImage, GenericImageView, ImageBuffer, Rgba};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Grayscale segmentation mask, one byte per pixel (0 = background,
/// 255 = subject)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationMask {
    /// Mask data as grayscale values (0-255), row-major
    pub data: Vec<u8>,
    /// Mask dimensions (width, height)
    pub dimensions: (u32, u32),
}

impl SegmentationMask {
    /// Create a new segmentation mask
    #[must_use]
    pub fn new(data: Vec<u8>, dimensions: (u32, u32)) -> Self {
        Self { data, dimensions }
    }

    /// Convert the mask to a grayscale image
    ///
    /// # Errors
    /// Returns `CutoutError::Processing` when data length and dimensions
    /// disagree.
    pub fn to_image(&self) -> Result<ImageBuffer<image::Luma<u8>, Vec<u8>>> {
        let (width, height) = self.dimensions;
        ImageBuffer::from_raw(width, height, self.data.clone())
            .ok_or_else(|| CutoutError::processing("Failed to create image from mask data"))
    }

    /// Write the mask into the alpha channel of an RGBA image
    ///
    /// # Errors
    /// Returns `CutoutError::Processing` when image and mask dimensions do
    /// not match.
    pub fn apply_to_image(&self, image: &mut ImageBuffer<Rgba<u8>, Vec<u8>>) -> Result<()> {
        if image.dimensions() != self.dimensions {
            return Err(CutoutError::processing(
                "Image and mask dimensions do not match",
            ));
        }

        for (pixel, alpha) in image.pixels_mut().zip(self.data.iter()) {
            pixel[3] = *alpha;
        }

        Ok(())
    }

    /// Resize the mask to new dimensions
    ///
    /// # Errors
    /// Returns `CutoutError::Processing` when the mask data is malformed.
    pub fn resize(&self, new_width: u32, new_height: u32) -> Result<Self> {
        let current = self.to_image()?;
        let resized = image::imageops::resize(
            &current,
            new_width,
            new_height,
            image::imageops::FilterType::Lanczos3,
        );
        Ok(Self::new(resized.into_raw(), (new_width, new_height)))
    }
}

/// Result of a background removal operation
#[derive(Debug, Clone)]
pub struct RemovalResult {
    /// The processed image with background made transparent
    pub image: DynamicImage,
    /// The segmentation mask used for removal
    pub mask: SegmentationMask,
    /// Original image dimensions
    pub original_dimensions: (u32, u32),
}

impl RemovalResult {
    /// Create a new removal result
    #[must_use]
    pub fn new(
        image: DynamicImage,
        mask: SegmentationMask,
        original_dimensions: (u32, u32),
    ) -> Self {
        Self {
            image,
            mask,
            original_dimensions,
        }
    }

    /// Save the result as a PNG with alpha channel, creating parent
    /// directories as needed and overwriting any existing file
    ///
    /// # Errors
    /// - Directory creation or file write failures
    /// - PNG encoding failures
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        crate::io::save_png(&self.image, path)
    }

    /// Encode the result as PNG bytes
    ///
    /// # Errors
    /// - PNG encoding failures
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        self.image.write_to(&mut cursor, image::ImageFormat::Png)?;
        Ok(buffer)
    }

    /// Get the output image dimensions
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker_mask(width: u32, height: u32) -> SegmentationMask {
        let data = (0..width * height)
            .map(|i| if i % 2 == 0 { 255 } else { 0 })
            .collect();
        SegmentationMask::new(data, (width, height))
    }

    #[test]
    fn test_apply_to_image_sets_alpha_only() {
        let mask = checker_mask(4, 2);
        let mut image = ImageBuffer::from_pixel(4, 2, Rgba([10u8, 20, 30, 255]));

        mask.apply_to_image(&mut image).unwrap();

        for (i, pixel) in image.pixels().enumerate() {
            assert_eq!(&pixel.0[..3], &[10, 20, 30]);
            let expected = if i % 2 == 0 { 255 } else { 0 };
            assert_eq!(pixel[3], expected);
        }
    }

    #[test]
    fn test_apply_to_image_rejects_dimension_mismatch() {
        let mask = checker_mask(4, 2);
        let mut image = ImageBuffer::from_pixel(3, 3, Rgba([0u8, 0, 0, 255]));
        assert!(mask.apply_to_image(&mut image).is_err());
    }

    #[test]
    fn test_mask_resize_changes_dimensions() {
        let mask = checker_mask(8, 8);
        let resized = mask.resize(4, 2).unwrap();
        assert_eq!(resized.dimensions, (4, 2));
        assert_eq!(resized.data.len(), 8);
    }

    #[test]
    fn test_to_image_rejects_truncated_data() {
        let mask = SegmentationMask::new(vec![255; 3], (4, 2));
        assert!(mask.to_image().is_err());
    }

    #[test]
    fn test_png_bytes_roundtrip_keeps_alpha() {
        let mask = checker_mask(2, 2);
        let mut rgba = ImageBuffer::from_pixel(2, 2, Rgba([1u8, 2, 3, 255]));
        mask.apply_to_image(&mut rgba).unwrap();

        let result =
            RemovalResult::new(DynamicImage::ImageRgba8(rgba), mask, (2, 2));
        let bytes = result.to_png_bytes().unwrap();

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.color(), image::ColorType::Rgba8);
        assert_eq!(decoded.to_rgba8().get_pixel(0, 0)[3], 255);
        assert_eq!(decoded.to_rgba8().get_pixel(1, 0)[3], 0);
    }
}
