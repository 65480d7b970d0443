// src/image_adapter.rs

use crate::config::{ImageDimensions, ResizeFilter};
use crate::dataset::{ImageVector, ImageVectorStream};
use crate::error::{EigenfaceError, Result};
use image::{ImageError, ImageReader};
use log::{debug, info};
use ndarray::Array1;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Turns image sources into flattened grayscale vectors.
pub trait ImageVectorAdapter: Sync {
    /// Loads one source and flattens it to an image vector of length `width × height`.
    ///
    /// # Errors
    /// [`EigenfaceError::ImageLoad`] for unreadable or corrupt input,
    /// [`EigenfaceError::ImageDecode`] for unsupported formats.
    fn produce(&self, source: &Path) -> Result<ImageVector>;

    /// Lists the files in `directory` whose name ends in `.extension`, sorted
    /// by path. Hidden files are skipped. Not recursive; each call re-reads
    /// the directory.
    fn enumerate(&self, directory: &Path, extension: &str) -> Result<Vec<PathBuf>> {
        enumerate_sources(directory, extension)
    }

    /// Loads every source, preserving input order.
    fn produce_all(&self, sources: &[PathBuf], parallel: bool) -> Result<Vec<ImageVector>> {
        if parallel {
            sources.par_iter().map(|path| self.produce(path)).collect()
        } else {
            sources.iter().map(|path| self.produce(path)).collect()
        }
    }
}

/// Lists `directory/*.extension` in sorted order.
///
/// Matches like a shell glob: the suffix may span several dots (`tar.gz`),
/// names starting with `.` never match, and names that are not valid UTF-8
/// are skipped.
pub fn enumerate_sources(directory: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let unreadable = |e: std::io::Error| EigenfaceError::ImageLoad {
        path: directory.to_path_buf(),
        message: format!("cannot read directory: {}", e),
    };
    let entries = std::fs::read_dir(directory).map_err(unreadable)?;

    let suffix = format!(".{}", extension);
    let mut sources = Vec::new();
    for entry in entries {
        let path = entry.map_err(unreadable)?.path();
        let matches = path
            .file_name()
            .and_then(|name| name.to_str())
            .map_or(false, |name| !name.starts_with('.') && name.ends_with(&suffix));
        if matches && path.is_file() {
            sources.push(path);
        }
    }
    sources.sort();
    info!(
        "Found {} '.{}' images in {:?}",
        sources.len(),
        extension,
        directory
    );
    Ok(sources)
}

/// Decodes images with the `image` crate, resizes them to a fixed size,
/// converts to 8-bit luma and scales pixels into `[0, 1]`.
///
/// Luma uses the ITU-R 601-2 weights `L = R·299/1000 + G·587/1000 + B·114/1000`
/// in the same rounded fixed-point form as PIL's `convert("L")`, so colour
/// photos give the same vectors as in PIL-based tooling. Alpha is dropped.
#[derive(Clone, Copy, Debug)]
pub struct GrayscaleImageLoader {
    dimensions: ImageDimensions,
    filter: ResizeFilter,
}

impl GrayscaleImageLoader {
    pub fn new(dimensions: ImageDimensions) -> Self {
        Self {
            dimensions,
            filter: ResizeFilter::default(),
        }
    }

    pub fn with_filter(mut self, filter: ResizeFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn dimensions(&self) -> ImageDimensions {
        self.dimensions
    }

    /// Lazily loads every matching image in `directory`, in sorted path order.
    ///
    /// The returned stream can be drained once.
    pub fn stream(
        &self,
        directory: &Path,
        extension: &str,
    ) -> Result<ImageVectorStream<impl Iterator<Item = Result<ImageVector>> + '_>> {
        let sources = self.enumerate(directory, extension)?;
        Ok(self.stream_sources(sources))
    }

    /// Lazily loads the given sources in order.
    pub fn stream_sources(
        &self,
        sources: Vec<PathBuf>,
    ) -> ImageVectorStream<impl Iterator<Item = Result<ImageVector>> + '_> {
        ImageVectorStream::new(sources.into_iter().map(move |path| self.produce(&path)))
    }
}

impl ImageVectorAdapter for GrayscaleImageLoader {
    fn produce(&self, source: &Path) -> Result<ImageVector> {
        let reader = ImageReader::open(source)
            .map_err(|e| EigenfaceError::ImageLoad {
                path: source.to_path_buf(),
                message: e.to_string(),
            })?
            .with_guessed_format()
            .map_err(|e| EigenfaceError::ImageLoad {
                path: source.to_path_buf(),
                message: e.to_string(),
            })?;
        let image = reader.decode().map_err(|e| classify_image_error(source, e))?;

        let ImageDimensions { width, height } = self.dimensions;
        let rgb = image.resize_exact(width, height, self.filter.into()).to_rgb8();
        let values: Array1<f64> = rgb
            .pixels()
            .map(|p| rec601_luma(p.0) as f64 / 255.0)
            .collect();
        debug!(
            "Loaded {:?} ({}x{} -> {}x{})",
            source,
            image.width(),
            image.height(),
            width,
            height
        );
        Ok(ImageVector::with_source(source.display().to_string(), values))
    }
}

/// 8-bit ITU-R 601-2 luma with 16-bit fixed-point weights, rounded to nearest.
/// Grey pixels (`r == g == b`) map to themselves.
fn rec601_luma([r, g, b]: [u8; 3]) -> u8 {
    let weighted = r as u32 * 19595 + g as u32 * 38470 + b as u32 * 7471;
    ((weighted + 0x8000) >> 16) as u8
}

fn classify_image_error(source: &Path, error: ImageError) -> EigenfaceError {
    let path = source.to_path_buf();
    let message = error.to_string();
    match error {
        ImageError::Unsupported(_) => EigenfaceError::ImageDecode { path, message },
        _ => EigenfaceError::ImageLoad { path, message },
    }
}
