//! Affine transform matrices.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use nalgebra::DMatrix;

use super::{host_tensor, read_host};
use crate::error::{CoreError, Result};
use crate::volume::check_dim;

/// Determinants below this magnitude are treated as singular.
const SINGULAR_EPS: f64 = 1e-9;

/// An affine transform stored as a `[D, D+1]` matrix.
///
/// Maps a coordinate `x` to `L·x + t`, where `L` is the left `D×D` block and
/// `t` the last column. Point application stays in tensor ops so the backend
/// can differentiate through it; the closed-form algebra (inversion, square
/// root, parameter decomposition) runs host-side in `f64` through the
/// homogeneous `(D+1)×(D+1)` form.
#[derive(Debug, Clone)]
pub struct AffineMatrix<B: Backend, const D: usize> {
    matrix: Tensor<B, 2>,
}

impl<B: Backend, const D: usize> AffineMatrix<B, D> {
    /// Create an affine transform from a `[D, D+1]` tensor.
    pub fn new(matrix: Tensor<B, 2>) -> Result<Self> {
        check_dim::<D>()?;
        let dims = matrix.dims();
        if dims != [D, D + 1] {
            return Err(CoreError::ShapeMismatch {
                expected: vec![D, D + 1],
                actual: dims.to_vec(),
            });
        }
        Ok(Self { matrix })
    }

    /// The identity transform.
    pub fn identity(device: &B::Device) -> Result<Self> {
        check_dim::<D>()?;
        let mut values = vec![0.0f64; D * (D + 1)];
        for i in 0..D {
            values[i * (D + 1) + i] = 1.0;
        }
        Ok(Self {
            matrix: host_tensor(&values, D, D + 1, device),
        })
    }

    /// A pure scaling transform with the given per-axis factors.
    pub fn scaling(factors: [f64; D], device: &B::Device) -> Result<Self> {
        check_dim::<D>()?;
        let mut values = vec![0.0f64; D * (D + 1)];
        for i in 0..D {
            values[i * (D + 1) + i] = factors[i];
        }
        Ok(Self {
            matrix: host_tensor(&values, D, D + 1, device),
        })
    }

    /// The `[D, D+1]` tensor.
    pub fn tensor(&self) -> Tensor<B, 2> {
        self.matrix.clone()
    }

    /// The linear `D×D` block.
    pub fn linear(&self) -> Tensor<B, 2> {
        self.matrix.clone().narrow(1, 0, D)
    }

    /// The translation column as a `[1, D]` tensor.
    pub fn translation(&self) -> Tensor<B, 2> {
        self.matrix.clone().narrow(1, D, 1).transpose()
    }

    /// Apply the transform to a batch of points.
    ///
    /// `points` is `[N, D]` in row-vector form, so the application is
    /// `points · Lᵀ + t`.
    pub fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        points.matmul(self.linear().transpose()) + self.translation()
    }

    /// The square homogeneous `[(D+1), (D+1)]` tensor, last row `0 … 0 1`.
    pub fn to_square(&self) -> Tensor<B, 2> {
        let device = self.matrix.device();
        let mut last = vec![0.0f64; D + 1];
        last[D] = 1.0;
        let last_row = host_tensor::<B>(&last, 1, D + 1, &device);
        Tensor::cat(vec![self.matrix.clone(), last_row], 0)
    }

    /// Truncate a square homogeneous tensor back to `[D, D+1]` form.
    pub fn from_square(square: Tensor<B, 2>) -> Result<Self> {
        let dims = square.dims();
        if dims != [D + 1, D + 1] {
            return Err(CoreError::ShapeMismatch {
                expected: vec![D + 1, D + 1],
                actual: dims.to_vec(),
            });
        }
        Self::new(square.narrow(0, 0, D))
    }

    /// The homogeneous matrix as host-side `f64` values.
    pub fn to_homogeneous(&self) -> Result<DMatrix<f64>> {
        let values = read_host(&self.matrix)?;
        let mut out = DMatrix::<f64>::identity(D + 1, D + 1);
        for r in 0..D {
            for c in 0..=D {
                out[(r, c)] = values[r * (D + 1) + c];
            }
        }
        Ok(out)
    }

    /// Build an affine transform from a homogeneous `f64` matrix.
    pub fn from_homogeneous(matrix: &DMatrix<f64>, device: &B::Device) -> Result<Self> {
        if matrix.nrows() != D + 1 || matrix.ncols() != D + 1 {
            return Err(CoreError::ShapeMismatch {
                expected: vec![D + 1, D + 1],
                actual: vec![matrix.nrows(), matrix.ncols()],
            });
        }
        let mut values = Vec::with_capacity(D * (D + 1));
        for r in 0..D {
            for c in 0..=D {
                values.push(matrix[(r, c)]);
            }
        }
        Ok(Self {
            matrix: host_tensor(&values, D, D + 1, device),
        })
    }

    /// The exact inverse transform.
    ///
    /// Fails with [`CoreError::SingularMatrix`] when the determinant is zero
    /// or near zero.
    pub fn inverse(&self) -> Result<Self> {
        let device = self.matrix.device();
        let hom = self.to_homogeneous()?;
        let det = hom.determinant();
        if !det.is_finite() || det.abs() < SINGULAR_EPS {
            return Err(CoreError::singular_matrix(format!(
                "cannot invert affine transform with determinant {det:.3e}"
            )));
        }
        let inv = hom.try_inverse().ok_or_else(|| {
            CoreError::singular_matrix("affine transform is not invertible")
        })?;
        Self::from_homogeneous(&inv, &device)
    }
}
