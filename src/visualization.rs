// src/visualization.rs

use crate::config::ImageDimensions;
use crate::error::{EigenfaceError, Result};
use image::GrayImage;
use log::debug;
use ndarray::ArrayView1;
use std::path::{Path, PathBuf};

/// Accepts result vectors for display.
pub trait ResultSink {
    /// Renders a length-`width × height` vector under `label`.
    fn render(&mut self, label: &str, vector: ArrayView1<f64>, dimensions: ImageDimensions) -> Result<()>;
}

/// Reshapes a row-major vector into a grayscale image, min–max rescaled to `0..=255`.
///
/// Eigenfaces have negative entries, so every vector is stretched over the
/// full intensity range. A constant vector renders black.
///
/// # Errors
/// [`EigenfaceError::ShapeMismatch`] if the vector length is not `width × height`.
pub fn vector_to_image(vector: ArrayView1<f64>, dimensions: ImageDimensions) -> Result<GrayImage> {
    if vector.len() != dimensions.pixel_count() {
        return Err(EigenfaceError::ShapeMismatch(format!(
            "vector of length {} cannot be shown as a {}x{} image",
            vector.len(),
            dimensions.width,
            dimensions.height
        )));
    }
    let min = vector.fold(f64::INFINITY, |acc, &v| acc.min(v));
    let max = vector.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
    let range = max - min;

    let pixels: Vec<u8> = vector
        .iter()
        .map(|&v| {
            if range > 0.0 {
                ((v - min) / range * 255.0).round().clamp(0.0, 255.0) as u8
            } else {
                0
            }
        })
        .collect();
    GrayImage::from_raw(dimensions.width, dimensions.height, pixels)
        .ok_or_else(|| EigenfaceError::Render("pixel buffer does not fit the image".to_string()))
}

/// Writes every rendered vector as `<label>.png` into a directory.
#[derive(Debug, Clone)]
pub struct PngDirectorySink {
    directory: PathBuf,
    written: Vec<PathBuf>,
}

impl PngDirectorySink {
    /// Creates the output directory if it does not exist yet.
    pub fn new(directory: impl AsRef<Path>) -> Result<Self> {
        std::fs::create_dir_all(directory.as_ref())?;
        Ok(Self {
            directory: directory.as_ref().to_path_buf(),
            written: Vec::new(),
        })
    }

    /// Files written so far, in render order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

fn sanitize_label(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned
    }
}

impl ResultSink for PngDirectorySink {
    fn render(&mut self, label: &str, vector: ArrayView1<f64>, dimensions: ImageDimensions) -> Result<()> {
        let image = vector_to_image(vector, dimensions)?;
        let path = self.directory.join(format!("{}.png", sanitize_label(label)));
        image
            .save(&path)
            .map_err(|e| EigenfaceError::Render(format!("cannot write {:?}: {}", path, e)))?;
        debug!("Rendered '{}' to {:?}", label, path);
        self.written.push(path);
        Ok(())
    }
}
