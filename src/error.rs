// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Every way an eigenface run can fail.
///
/// None of these are recovered inside the crate: the computation is
/// deterministic, so a failed run is reported to the caller as-is.
#[derive(Error, Debug)]
pub enum EigenfaceError {
    #[error("dataset is empty: no image vectors were produced")]
    EmptyDataset,

    #[error(
        "inconsistent image vector length at row {row}{}: expected {expected}, found {found}",
        describe_source(.source_id)
    )]
    InconsistentDimension {
        row: usize,
        source_id: Option<String>,
        expected: usize,
        found: usize,
    },

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("non-finite value at row {row}, column {column}{}", describe_source(.source_id))]
    NonFiniteValue {
        row: usize,
        column: usize,
        source_id: Option<String>,
    },

    #[error("decomposition failed: {0}")]
    Decomposition(String),

    #[error("failed to load image {path:?}: {message}")]
    ImageLoad { path: PathBuf, message: String },

    #[error("failed to decode image {path:?}: {message}")]
    ImageDecode { path: PathBuf, message: String },

    #[error("image vector stream was already consumed")]
    StreamConsumed,

    #[error("invalid image dimensions {width}x{height}: both sides must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("render error: {0}")]
    Render(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, EigenfaceError>;

fn describe_source(source_id: &Option<String>) -> String {
    match source_id {
        Some(id) => format!(" ({})", id),
        None => String::new(),
    }
}

impl From<bincode::error::EncodeError> for EigenfaceError {
    fn from(e: bincode::error::EncodeError) -> Self {
        EigenfaceError::Serialization(e.to_string())
    }
}

impl From<bincode::error::DecodeError> for EigenfaceError {
    fn from(e: bincode::error::DecodeError) -> Self {
        EigenfaceError::Serialization(e.to_string())
    }
}
