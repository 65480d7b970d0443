// Eigenfaces: mean face and principal directions of an image collection

#![doc = include_str!("../README.md")]

pub mod config;
pub mod dataset;
pub mod eigenfaces;
pub mod error;
pub mod image_adapter;
pub mod linalg_backends;
pub mod pipeline;
pub mod visualization;


pub use config::{ImageDimensions, PipelineConfig, ResizeFilter};
pub use dataset::{DatasetMatrix, ImageVector, ImageVectorStream};
pub use eigenfaces::{EigenfaceDecomposer, EigenfaceModel};
pub use error::{EigenfaceError, Result};
pub use image_adapter::{enumerate_sources, GrayscaleImageLoader, ImageVectorAdapter};
pub use pipeline::{render_model, EigenfacePipeline};
pub use visualization::{vector_to_image, PngDirectorySink, ResultSink};
