// src/eigenfaces.rs

use crate::config::ImageDimensions;
use crate::dataset::DatasetMatrix;
use crate::error::{EigenfaceError, Result};
use crate::linalg_backends::{BackendThinSVD, LinAlgBackendProvider, ThinSVDOutput};
use log::{debug, info, warn};
use ndarray::{s, Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Computes the mean face and the eigenfaces of a dataset matrix.
///
/// The data is mean-centered and factored with a thin SVD,
/// `centered = U · Σ · Vᵗ`, keeping only `k = min(N, D)` singular triplets.
/// The rows of `Vᵗ` are the eigenfaces; `U` is discarded.
///
/// Orientation of each eigenface is fixed so that its entry of largest
/// absolute value is positive (the first such entry on exact ties).
#[derive(Debug, Default, Clone)]
pub struct EigenfaceDecomposer<B = LinAlgBackendProvider> {
    backend: B,
}

impl EigenfaceDecomposer<LinAlgBackendProvider> {
    /// Creates a decomposer using the backend selected by cargo features.
    pub fn new() -> Self {
        Self {
            backend: LinAlgBackendProvider::new(),
        }
    }
}

impl<B: BackendThinSVD> EigenfaceDecomposer<B> {
    pub fn with_backend(backend: B) -> Self {
        Self { backend }
    }

    /// Decomposes a validated dataset matrix.
    ///
    /// The matrix is consumed; its storage is reused for the centered copy.
    ///
    /// # Errors
    /// Returns [`EigenfaceError::Decomposition`] if the SVD backend fails or
    /// returns factors of unexpected shape.
    pub fn decompose(&self, dataset: DatasetMatrix) -> Result<EigenfaceModel> {
        self.decompose_array(dataset.into_array())
    }

    /// Same as [`decompose`](Self::decompose) but records the image size in the model.
    ///
    /// # Errors
    /// In addition to the errors of `decompose`, returns
    /// [`EigenfaceError::ShapeMismatch`] if `width × height` differs from the
    /// dataset's row length.
    pub fn decompose_images(
        &self,
        dataset: DatasetMatrix,
        dimensions: ImageDimensions,
    ) -> Result<EigenfaceModel> {
        if dimensions.pixel_count() != dataset.num_features() {
            return Err(EigenfaceError::ShapeMismatch(format!(
                "image dimensions {}x{} imply {} pixels but dataset rows have length {}",
                dimensions.width,
                dimensions.height,
                dimensions.pixel_count(),
                dataset.num_features()
            )));
        }
        let mut model = self.decompose(dataset)?;
        model.dimensions = Some(dimensions);
        Ok(model)
    }

    /// Decomposes a raw `N × D` matrix.
    ///
    /// # Errors
    /// - [`EigenfaceError::ShapeMismatch`] if `N < 1` or `D < 1`.
    /// - [`EigenfaceError::NonFiniteValue`] if an entry is NaN or infinite.
    /// - [`EigenfaceError::Decomposition`] if the factorization fails.
    pub fn decompose_array(&self, mut data_matrix: Array2<f64>) -> Result<EigenfaceModel> {
        let (n_samples, n_features) = data_matrix.dim();
        if n_samples == 0 || n_features == 0 {
            return Err(EigenfaceError::ShapeMismatch(format!(
                "dataset matrix must be at least 1x1, got {}x{}",
                n_samples, n_features
            )));
        }
        for ((row, column), value) in data_matrix.indexed_iter() {
            if !value.is_finite() {
                return Err(EigenfaceError::NonFiniteValue {
                    row,
                    column,
                    source_id: None,
                });
            }
        }

        info!(
            "Starting eigenface decomposition. Samples (N)={}, Pixels (D)={}",
            n_samples, n_features
        );
        let start_time = std::time::Instant::now();

        let mean_vector = data_matrix.mean_axis(Axis(0)).ok_or_else(|| {
            EigenfaceError::ShapeMismatch("cannot take the mean of an empty matrix".to_string())
        })?;
        data_matrix -= &mean_vector;

        let k = n_samples.min(n_features);
        let ThinSVDOutput { s, vt, .. } = self
            .backend
            .thin_svd_into(data_matrix)
            .map_err(|e| EigenfaceError::Decomposition(e.to_string()))?;
        debug!("Thin SVD returned {} singular values, V^T shape {:?}", s.len(), vt.dim());

        if s.len() != k || vt.dim() != (k, n_features) {
            return Err(EigenfaceError::Decomposition(format!(
                "backend returned {} singular values and V^T of shape {:?}; expected {} and ({}, {})",
                s.len(),
                vt.dim(),
                k,
                k,
                n_features
            )));
        }
        if s.iter().any(|v| !v.is_finite()) || vt.iter().any(|v| !v.is_finite()) {
            return Err(EigenfaceError::Decomposition(
                "backend returned non-finite singular values or vectors".to_string(),
            ));
        }

        let (singular_values, eigenfaces) = order_and_orient(s, vt);

        if singular_values.iter().all(|&v| v == 0.0) {
            warn!("All singular values are zero: the dataset has no variance to explain.");
        }
        info!(
            "Computed {} eigenfaces in {:?}",
            singular_values.len(),
            start_time.elapsed()
        );

        Ok(EigenfaceModel {
            mean: mean_vector,
            eigenfaces,
            singular_values,
            num_samples: n_samples,
            dimensions: None,
        })
    }
}

/// Clamps round-off negatives to zero, sorts by non-increasing singular value
/// (stable, so ties keep backend order) and applies the sign convention.
fn order_and_orient(s: Array1<f64>, vt: Array2<f64>) -> (Array1<f64>, Array2<f64>) {
    let k = s.len();
    let mut order: Vec<usize> = (0..k).collect();
    order.sort_by(|&a, &b| s[b].partial_cmp(&s[a]).unwrap_or(std::cmp::Ordering::Equal));

    let mut singular_values = Array1::<f64>::zeros(k);
    let mut eigenfaces = Array2::<f64>::zeros(vt.dim());
    for (dst, &src) in order.iter().enumerate() {
        singular_values[dst] = s[src].max(0.0);
        let mut row = eigenfaces.row_mut(dst);
        row.assign(&vt.row(src));
        if dominant_entry_is_negative(row.view()) {
            row.mapv_inplace(|x| -x);
        }
    }
    (singular_values, eigenfaces)
}

fn dominant_entry_is_negative(vector: ArrayView1<f64>) -> bool {
    let mut best = 0.0f64;
    let mut best_value = 0.0f64;
    for &x in vector.iter() {
        if x.abs() > best {
            best = x.abs();
            best_value = x;
        }
    }
    best_value < 0.0
}

/// Mean face plus ranked eigenfaces of one dataset.
///
/// `eigenfaces` is `k × D` with one unit-norm eigenface per row, ordered by
/// non-increasing singular value. Read-only once produced.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EigenfaceModel {
    mean: Array1<f64>,
    eigenfaces: Array2<f64>,
    singular_values: Array1<f64>,
    num_samples: usize,
    dimensions: Option<ImageDimensions>,
}

impl EigenfaceModel {
    /// Mean vector (the average face), length `D`.
    pub fn mean(&self) -> ArrayView1<'_, f64> {
        self.mean.view()
    }

    /// All eigenfaces as rows, shape `k × D`.
    pub fn eigenfaces(&self) -> &Array2<f64> {
        &self.eigenfaces
    }

    pub fn singular_values(&self) -> ArrayView1<'_, f64> {
        self.singular_values.view()
    }

    /// Eigenface at `index`; index 0 explains the most variance.
    pub fn eigenface(&self, index: usize) -> Option<ArrayView1<'_, f64>> {
        (index < self.len()).then(|| self.eigenfaces.row(index))
    }

    /// Number of eigenfaces kept.
    pub fn len(&self) -> usize {
        self.singular_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of images the model was computed from.
    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    /// Vector length `D`.
    pub fn num_features(&self) -> usize {
        self.mean.len()
    }

    pub fn dimensions(&self) -> Option<ImageDimensions> {
        self.dimensions
    }

    /// Iterates over `(singular value, eigenface)` pairs in rank order.
    pub fn iter(&self) -> impl Iterator<Item = (f64, ArrayView1<'_, f64>)> + '_ {
        self.singular_values
            .iter()
            .copied()
            .zip(self.eigenfaces.axis_iter(Axis(0)))
    }

    /// Variance of the data along each eigenface, `σᵢ² / (N − 1)`.
    ///
    /// All zeros for a single-image model.
    pub fn explained_variance(&self) -> Array1<f64> {
        if self.num_samples < 2 {
            return Array1::zeros(self.len());
        }
        let denom = (self.num_samples - 1) as f64;
        self.singular_values.mapv(|s| s * s / denom)
    }

    /// Fraction of the total variance captured by each eigenface.
    pub fn explained_variance_ratio(&self) -> Array1<f64> {
        let squared = self.singular_values.mapv(|s| s * s);
        let total = squared.sum();
        if total <= 0.0 {
            return Array1::zeros(self.len());
        }
        squared / total
    }

    /// Keeps only the top `k` eigenfaces.
    pub fn truncate(&mut self, k: usize) {
        let k = k.min(self.len());
        self.eigenfaces = self.eigenfaces.slice(s![..k, ..]).to_owned();
        self.singular_values = self.singular_values.slice(s![..k]).to_owned();
    }

    /// Weights of `vector − mean` on the top `k` eigenfaces. `k` is clamped to `len()`.
    ///
    /// # Errors
    /// [`EigenfaceError::ShapeMismatch`] if `vector` does not have length `D`.
    pub fn project(&self, vector: ArrayView1<f64>, k: usize) -> Result<Array1<f64>> {
        self.check_len(vector.len())?;
        let k = k.min(self.len());
        let centered = &vector - &self.mean;
        Ok(self.eigenfaces.slice(s![..k, ..]).dot(&centered))
    }

    /// Rebuilds a vector from eigenface weights: `mean + Σ wᵢ · eigenfaceᵢ`.
    ///
    /// # Errors
    /// [`EigenfaceError::ShapeMismatch`] if there are more weights than eigenfaces.
    pub fn reconstruct(&self, weights: ArrayView1<f64>) -> Result<Array1<f64>> {
        let k = weights.len();
        if k > self.len() {
            return Err(EigenfaceError::ShapeMismatch(format!(
                "{} weights given but the model has only {} eigenfaces",
                k,
                self.len()
            )));
        }
        Ok(&self.mean + &self.eigenfaces.slice(s![..k, ..]).t().dot(&weights))
    }

    /// Euclidean norm of the residual after projecting onto the top `k` eigenfaces.
    pub fn reconstruction_error(&self, vector: ArrayView1<f64>, k: usize) -> Result<f64> {
        let weights = self.project(vector, k)?;
        let rebuilt = self.reconstruct(weights.view())?;
        let residual = &vector - &rebuilt;
        Ok(residual.dot(&residual).sqrt())
    }

    fn check_len(&self, len: usize) -> Result<()> {
        if len != self.num_features() {
            return Err(EigenfaceError::ShapeMismatch(format!(
                "vector has length {} but the model expects {}",
                len,
                self.num_features()
            )));
        }
        Ok(())
    }

    /// Saves the model to a file using bincode.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or serialization fails.
    pub fn save_model<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        bincode::serde::encode_into_std_write(self, &mut writer, bincode::config::standard())?;
        Ok(())
    }

    /// Loads a model previously written by [`save_model`](Self::save_model).
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or decoded, or if the
    /// loaded model is internally inconsistent.
    pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let mut reader = BufReader::new(file);
        let model: EigenfaceModel =
            bincode::serde::decode_from_std_read(&mut reader, bincode::config::standard())?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<()> {
        let d = self.mean.len();
        if d == 0 || self.num_samples == 0 {
            return Err(EigenfaceError::Serialization(
                "loaded model is empty".to_string(),
            ));
        }
        if self.eigenfaces.ncols() != d {
            return Err(EigenfaceError::Serialization(format!(
                "loaded model has eigenfaces of length {} but a mean of length {}",
                self.eigenfaces.ncols(),
                d
            )));
        }
        if self.eigenfaces.nrows() != self.singular_values.len() {
            return Err(EigenfaceError::Serialization(format!(
                "loaded model has {} eigenfaces but {} singular values",
                self.eigenfaces.nrows(),
                self.singular_values.len()
            )));
        }
        if let Some(dims) = self.dimensions {
            if dims.pixel_count() != d {
                return Err(EigenfaceError::Serialization(format!(
                    "loaded model records {}x{} images but vectors of length {}",
                    dims.width, dims.height, d
                )));
            }
        }
        let values_ok = self.singular_values.iter().all(|v| v.is_finite() && *v >= 0.0);
        let ordered = self
            .singular_values
            .iter()
            .zip(self.singular_values.iter().skip(1))
            .all(|(a, b)| a >= b);
        if !values_ok || !ordered {
            return Err(EigenfaceError::Serialization(
                "loaded model's singular values must be finite, non-negative and non-increasing"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_sign_convention_flips_negative_dominant_entry() {
        let s = array![2.0, 1.0];
        let vt = array![[0.6, -0.8], [0.8, 0.6]];
        let (values, faces) = order_and_orient(s, vt);
        assert_eq!(values, array![2.0, 1.0]);
        assert_eq!(faces.row(0), array![-0.6, 0.8].view());
        assert_eq!(faces.row(1), array![0.8, 0.6].view());
    }

    #[test]
    fn test_ordering_is_enforced_and_negatives_clamped() {
        let s = array![1.0, 3.0, -1e-18];
        let vt = array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let (values, faces) = order_and_orient(s, vt);
        assert_eq!(values, array![3.0, 1.0, 0.0]);
        assert_eq!(faces.row(0), array![0.0, 1.0, 0.0].view());
        assert_eq!(faces.row(1), array![1.0, 0.0, 0.0].view());
    }

    #[test]
    fn test_dominant_tie_uses_first_entry() {
        assert!(dominant_entry_is_negative(array![-0.5, 0.5].view()));
        assert!(!dominant_entry_is_negative(array![0.5, -0.5].view()));
        assert!(!dominant_entry_is_negative(array![0.0, 0.0].view()));
    }
}
