// src/dataset.rs

use crate::error::{EigenfaceError, Result};
use log::{debug, info};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// One grayscale image flattened row-major into `width × height` values in `[0, 1]`.
///
/// Immutable once created. The optional source identifier (usually the file
/// path) is carried along only for diagnostics.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageVector {
    source_id: Option<String>,
    values: Array1<f64>,
}

impl ImageVector {
    pub fn new(values: Array1<f64>) -> Self {
        Self {
            source_id: None,
            values,
        }
    }

    pub fn with_source(source_id: impl Into<String>, values: Array1<f64>) -> Self {
        Self {
            source_id: Some(source_id.into()),
            values,
        }
    }

    pub fn source_id(&self) -> Option<&str> {
        self.source_id.as_deref()
    }

    pub fn values(&self) -> ArrayView1<'_, f64> {
        self.values.view()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Array1<f64> {
        self.values
    }
}

impl From<Vec<f64>> for ImageVector {
    fn from(values: Vec<f64>) -> Self {
        ImageVector::new(Array1::from(values))
    }
}

/// A lazy, finite sequence of image vectors that may be drained exactly once.
///
/// Draining a second time fails with [`EigenfaceError::StreamConsumed`]
/// instead of silently producing an empty dataset.
pub struct ImageVectorStream<I> {
    inner: Option<I>,
}

impl<I> ImageVectorStream<I>
where
    I: Iterator<Item = Result<ImageVector>>,
{
    pub fn new(inner: I) -> Self {
        Self { inner: Some(inner) }
    }

    /// Hands out the underlying sequence; only the first call succeeds.
    pub fn take(&mut self) -> Result<I> {
        self.inner.take().ok_or(EigenfaceError::StreamConsumed)
    }

    pub fn is_consumed(&self) -> bool {
        self.inner.is_none()
    }
}

/// The `N × D` matrix of stacked image vectors, one row per image.
///
/// Invariants: `N ≥ 1`, `D ≥ 1`, all entries finite.
#[derive(Clone, Debug)]
pub struct DatasetMatrix {
    data: Array2<f64>,
    source_ids: Vec<Option<String>>,
}

impl DatasetMatrix {
    /// Stacks infallible image vectors in input order.
    pub fn from_vectors<I>(vectors: I) -> Result<Self>
    where
        I: IntoIterator<Item = ImageVector>,
    {
        Self::try_from_vectors(vectors.into_iter().map(Ok))
    }

    /// Stacks image vectors in input order, aborting on the first producer error.
    ///
    /// The sequence is drained completely unless an error stops it early.
    ///
    /// # Errors
    /// - [`EigenfaceError::EmptyDataset`] if no vector is produced.
    /// - [`EigenfaceError::ShapeMismatch`] if the first vector has length 0.
    /// - [`EigenfaceError::InconsistentDimension`] if a vector's length differs from the first one.
    /// - [`EigenfaceError::NonFiniteValue`] if a vector contains NaN or infinity.
    /// - Any error yielded by the sequence itself, unchanged.
    pub fn try_from_vectors<I>(vectors: I) -> Result<Self>
    where
        I: IntoIterator<Item = Result<ImageVector>>,
    {
        let mut expected_len: Option<usize> = None;
        let mut flat: Vec<f64> = Vec::new();
        let mut source_ids: Vec<Option<String>> = Vec::new();

        for (row, item) in vectors.into_iter().enumerate() {
            let vector = item?;
            let found = vector.len();
            match expected_len {
                None => {
                    if found == 0 {
                        return Err(EigenfaceError::ShapeMismatch(format!(
                            "image vector at row 0{} has length 0",
                            vector.source_id().map(|s| format!(" ({})", s)).unwrap_or_default()
                        )));
                    }
                    expected_len = Some(found);
                }
                Some(expected) if expected != found => {
                    return Err(EigenfaceError::InconsistentDimension {
                        row,
                        source_id: vector.source_id,
                        expected,
                        found,
                    });
                }
                Some(_) => {}
            }
            if let Some(column) = vector.values.iter().position(|v| !v.is_finite()) {
                return Err(EigenfaceError::NonFiniteValue {
                    row,
                    column,
                    source_id: vector.source_id,
                });
            }
            debug!("Stacked image vector {} (len {}) from {:?}", row, found, vector.source_id);
            flat.extend(vector.values.iter().copied());
            source_ids.push(vector.source_id);
        }

        let n_cols = expected_len.ok_or(EigenfaceError::EmptyDataset)?;
        let n_rows = source_ids.len();
        let data = Array2::from_shape_vec((n_rows, n_cols), flat)
            .map_err(|e| EigenfaceError::ShapeMismatch(e.to_string()))?;
        info!("Built dataset matrix. Shape: {:?}", data.dim());
        Ok(Self { data, source_ids })
    }

    /// Drains a one-shot stream into a dataset matrix.
    pub fn from_stream<I>(stream: &mut ImageVectorStream<I>) -> Result<Self>
    where
        I: Iterator<Item = Result<ImageVector>>,
    {
        Self::try_from_vectors(stream.take()?)
    }

    /// Wraps an existing matrix whose rows are already flattened images.
    ///
    /// # Errors
    /// [`EigenfaceError::ShapeMismatch`] if the matrix has zero rows or zero
    /// columns, [`EigenfaceError::NonFiniteValue`] for NaN or infinite entries.
    pub fn from_array(data: Array2<f64>) -> Result<Self> {
        let (n_rows, n_cols) = data.dim();
        if n_rows == 0 || n_cols == 0 {
            return Err(EigenfaceError::ShapeMismatch(format!(
                "dataset matrix must be at least 1x1, got {}x{}",
                n_rows, n_cols
            )));
        }
        for ((row, column), value) in data.indexed_iter() {
            if !value.is_finite() {
                return Err(EigenfaceError::NonFiniteValue {
                    row,
                    column,
                    source_id: None,
                });
            }
        }
        Ok(Self {
            data,
            source_ids: vec![None; n_rows],
        })
    }

    pub fn num_samples(&self) -> usize {
        self.data.nrows()
    }

    pub fn num_features(&self) -> usize {
        self.data.ncols()
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    pub fn row(&self, index: usize) -> ArrayView1<'_, f64> {
        self.data.row(index)
    }

    /// Source identifier of each row, in row order.
    pub fn source_ids(&self) -> &[Option<String>] {
        &self.source_ids
    }

    pub fn into_array(self) -> Array2<f64> {
        self.data
    }
}
