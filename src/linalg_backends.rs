// src/linalg_backends.rs

use ndarray::{Array1, Array2};
use std::error::Error;

/// Output of a thin Singular Value Decomposition of an `n × d` matrix.
///
/// With `k = min(n, d)`: `u` is `n × k`, `s` has length `k`, `vt` is `k × d`.
#[derive(Debug)]
pub struct ThinSVDOutput {
    /// Left factor. Both backends compute it whenever `vt` is requested, so it
    /// is returned as is; the decomposer only consumes `s` and `vt`.
    pub u: Array2<f64>,
    /// Singular values, non-increasing as returned by the backend.
    pub s: Array1<f64>,
    pub vt: Array2<f64>,
}

/// Trait for thin Singular Value Decomposition.
///
/// Implementers must never form the full `d × d` right factor. `u` must be
/// filled in, although eigenface extraction ignores it.
pub trait BackendThinSVD {
    fn thin_svd_into(&self, matrix: Array2<f64>) -> Result<ThinSVDOutput, Box<dyn Error + Send + Sync>>;
}

// --- NdarrayLinAlgBackend (LAPACK gesdd through ndarray-linalg) ---
use ndarray_linalg::{JobSvd, SVDDCInto as NdLinalgSVDDCInto};

#[derive(Debug, Default, Copy, Clone)]
pub struct NdarrayLinAlgBackend;

fn to_dyn_error<E: Error + Send + Sync + 'static>(e: E) -> Box<dyn Error + Send + Sync> {
    Box::new(e)
}

impl BackendThinSVD for NdarrayLinAlgBackend {
    fn thin_svd_into(&self, matrix: Array2<f64>) -> Result<ThinSVDOutput, Box<dyn Error + Send + Sync>> {
        let (nrows, ncols) = matrix.dim();
        // JobSvd::Some requests the reduced factors: u is n×k and vt is k×d.
        let (u, s, vt) = matrix.svddc_into(JobSvd::Some).map_err(to_dyn_error)?;
        let u = u.ok_or_else(|| missing_factor("U", nrows, ncols))?;
        let vt = vt.ok_or_else(|| missing_factor("V^T", nrows, ncols))?;
        Ok(ThinSVDOutput { u, s, vt })
    }
}

fn missing_factor(name: &str, nrows: usize, ncols: usize) -> Box<dyn Error + Send + Sync> {
    format!("SVD of {}x{} matrix did not return the {} factor", nrows, ncols, name).into()
}

// --- FaerLinAlgBackend ---
#[cfg(feature = "backend_faer")]
mod faer_specific_code {
    use super::{BackendThinSVD, ThinSVDOutput};
    use faer::linalg::solvers::Svd as FaerSolverSvd;
    use faer::MatRef;
    use ndarray::{Array1, Array2, ShapeBuilder};
    use std::error::Error;

    fn to_dyn_error_faer(msg: String) -> Box<dyn Error + Send + Sync> {
        Box::new(std::io::Error::new(std::io::ErrorKind::Other, msg))
    }

    fn non_contiguous(nrows: usize, ncols: usize) -> Box<dyn Error + Send + Sync> {
        to_dyn_error_faer(format!(
            "{}x{} input is not contiguous in row-major order after relayout",
            nrows, ncols
        ))
    }

    #[derive(Debug, Default, Copy, Clone)]
    pub struct FaerLinAlgBackend;

    fn faer_mat_to_ndarray(faer_mat: MatRef<'_, f64>) -> Array2<f64> {
        let nrows = faer_mat.nrows();
        let ncols = faer_mat.ncols();
        Array2::from_shape_fn((nrows, ncols).f(), |(i, j)| faer_mat[(i, j)])
    }

    fn faer_col_to_ndarray_vec(faer_col: faer::ColRef<'_, f64>) -> Array1<f64> {
        Array1::from_shape_fn(faer_col.nrows(), |i| faer_col[i])
    }

    impl BackendThinSVD for FaerLinAlgBackend {
        fn thin_svd_into(&self, matrix: Array2<f64>) -> Result<ThinSVDOutput, Box<dyn Error + Send + Sync>> {
            let (nrows, ncols) = matrix.dim();
            // faer views need contiguous memory; as_standard_layout copies only when required.
            let matrix = matrix.as_standard_layout().into_owned();
            let slice = matrix
                .as_slice()
                .ok_or_else(|| non_contiguous(nrows, ncols))?;
            let faer_mat_view = MatRef::from_row_major_slice(slice, nrows, ncols);

            let svd = FaerSolverSvd::new_thin(faer_mat_view)
                .map_err(|e| to_dyn_error_faer(format!("Faer SVD computation failed: {:?}", e)))?;

            let s = faer_col_to_ndarray_vec(svd.S().column_vector());
            let u = faer_mat_to_ndarray(svd.U());
            let vt = faer_mat_to_ndarray(svd.V()).t().into_owned();
            Ok(ThinSVDOutput { u, s, vt })
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use ndarray::ShapeBuilder;

        #[test]
        fn test_layout_error_names_the_layout() {
            let message = non_contiguous(4, 9).to_string();
            assert!(message.contains("4x9"));
            assert!(message.contains("not contiguous"));
            assert!(!message.contains("factor"));
        }

        #[test]
        fn test_column_major_input_is_accepted() {
            let a = Array2::from_shape_vec((3, 2).f(), vec![1.0, 0.0, 0.0, 0.0, 2.0, 0.0]).unwrap();
            let out = FaerLinAlgBackend.thin_svd_into(a).unwrap();
            assert_eq!(out.vt.dim(), (2, 2));
            assert!((out.s[0] - 2.0).abs() < 1e-12);
            assert!((out.s[1] - 1.0).abs() < 1e-12);
        }
    }
}

/// Dispatches to the linear algebra backend selected by cargo features.
#[derive(Debug, Default, Copy, Clone)]
pub struct LinAlgBackendProvider;

impl LinAlgBackendProvider {
    pub fn new() -> Self {
        Self
    }
}

impl BackendThinSVD for LinAlgBackendProvider {
    fn thin_svd_into(&self, matrix: Array2<f64>) -> Result<ThinSVDOutput, Box<dyn Error + Send + Sync>> {
        #[cfg(feature = "backend_faer")]
        {
            faer_specific_code::FaerLinAlgBackend.thin_svd_into(matrix)
        }
        #[cfg(not(feature = "backend_faer"))]
        {
            NdarrayLinAlgBackend.thin_svd_into(matrix)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};

    #[test]
    fn test_thin_shapes_wide_matrix() {
        let a = Array2::from_shape_fn((3, 10), |(i, j)| ((i * 7 + j * 3) % 5) as f64);
        let out = LinAlgBackendProvider::new().thin_svd_into(a).unwrap();
        assert_eq!(out.u.dim(), (3, 3));
        assert_eq!(out.s.len(), 3);
        assert_eq!(out.vt.dim(), (3, 10));
    }

    #[test]
    fn test_thin_shapes_tall_matrix() {
        let a = Array2::from_shape_fn((8, 2), |(i, j)| (i + 2 * j) as f64);
        let out = LinAlgBackendProvider::new().thin_svd_into(a).unwrap();
        assert_eq!(out.u.dim(), (8, 2));
        assert_eq!(out.s.len(), 2);
        assert_eq!(out.vt.dim(), (2, 2));
    }

    #[test]
    fn test_reconstructs_input() {
        let a = array![[3.0, 1.0, 1.0], [-1.0, 3.0, 1.0]];
        let out = LinAlgBackendProvider::new().thin_svd_into(a.clone()).unwrap();
        let rebuilt = out.u.dot(&Array2::from_diag(&out.s)).dot(&out.vt);
        for (x, y) in a.iter().zip(rebuilt.iter()) {
            assert_abs_diff_eq!(*x, *y, epsilon = 1e-12);
        }
        // Known singular values of this matrix: sqrt(12) and sqrt(10).
        assert_abs_diff_eq!(out.s[0], 12f64.sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(out.s[1], 10f64.sqrt(), epsilon = 1e-12);
    }
}
