// src/config.rs

use crate::error::{EigenfaceError, Result};
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

/// Target size every source image is resized to before flattening.
///
/// One value is chosen per run and threaded through the adapter and the
/// resulting model, so datasets of different resolutions can coexist in
/// one process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl ImageDimensions {
    /// Creates dimensions, rejecting a zero width or height.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(EigenfaceError::InvalidDimensions { width, height });
        }
        Ok(Self { width, height })
    }

    /// Length `D` of a flattened image vector.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl Default for ImageDimensions {
    fn default() -> Self {
        ImageDimensions {
            width: 200,
            height: 250,
        }
    }
}

/// Resampling filter used when resizing source images.
///
/// Mirrors `image::imageops::FilterType` so the configuration stays
/// serializable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResizeFilter {
    Nearest,
    Triangle,
    #[default]
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Configuration for a full directory-to-eigenfaces run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Size every image is resized to.
    pub dimensions: ImageDimensions,
    /// File extension (without the dot) of the images to read, matched exactly.
    pub extension: String,
    /// Decode images on the rayon pool. Row order is unaffected.
    pub parallel_loading: bool,
    pub resize_filter: ResizeFilter,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            dimensions: ImageDimensions::default(),
            extension: "jpg".to_string(),
            parallel_loading: true,
            resize_filter: ResizeFilter::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_dimensions() {
        let dims = ImageDimensions::default();
        assert_eq!(dims.width, 200);
        assert_eq!(dims.height, 250);
        assert_eq!(dims.pixel_count(), 50_000);
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(matches!(
            ImageDimensions::new(0, 4),
            Err(EigenfaceError::InvalidDimensions { width: 0, height: 4 })
        ));
        assert!(ImageDimensions::new(4, 0).is_err());
        assert_eq!(ImageDimensions::new(4, 3).unwrap().pixel_count(), 12);
    }

    #[test]
    fn test_filter_mapping() {
        assert_eq!(FilterType::from(ResizeFilter::Nearest), FilterType::Nearest);
        assert_eq!(FilterType::from(ResizeFilter::default()), FilterType::CatmullRom);
    }
}
