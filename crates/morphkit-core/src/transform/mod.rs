//! Transform types and operations.
//!
//! A [`Transform`] is either an affine matrix or a dense displacement
//! field. The two representations compose, invert and materialize through
//! the operations in [`compose`], [`params`] and [`midspace`].

pub mod affine;
pub mod compose;
pub mod dense;
pub mod midspace;
pub mod params;

pub use affine::AffineMatrix;
pub use compose::{affine_to_dense, compose};
pub use dense::DisplacementField;
pub use midspace::half_affine;
pub use params::{matrix_to_params, params_to_matrix, rigid_projection};

use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};

use crate::error::{CoreError, Result};

/// A spatial coordinate transform.
///
/// `Affine` maps a coordinate `x` to `L·x + t`; `Dense` maps `x` to
/// `x + field[x]`. All transforms participating in one composition share the
/// same spatial dimensionality `D`.
#[derive(Debug, Clone)]
pub enum Transform<B: Backend, const D: usize> {
    /// A `[D, D+1]` matrix transform.
    Affine(AffineMatrix<B, D>),
    /// A per-voxel displacement field.
    Dense(DisplacementField<B, D>),
}

impl<B: Backend, const D: usize> Transform<B, D> {
    /// Whether this transform is in matrix form.
    pub fn is_affine(&self) -> bool {
        matches!(self, Transform::Affine(_))
    }

    /// Whether this transform is a dense displacement field.
    pub fn is_dense(&self) -> bool {
        matches!(self, Transform::Dense(_))
    }
}

/// Upload a row-major `f64` slice as a `[rows, cols]` tensor.
pub(crate) fn host_tensor<B: Backend>(
    values: &[f64],
    rows: usize,
    cols: usize,
    device: &B::Device,
) -> Tensor<B, 2> {
    let data: Vec<f32> = values.iter().map(|v| *v as f32).collect();
    Tensor::<B, 1>::from_data(TensorData::new(data, Shape::new([rows * cols])), device)
        .reshape([rows, cols])
}

/// Read a rank-2 tensor back to host memory as row-major `f64` values.
pub(crate) fn read_host<B: Backend>(tensor: &Tensor<B, 2>) -> Result<Vec<f64>> {
    tensor
        .to_data()
        .convert::<f64>()
        .to_vec::<f64>()
        .map_err(|_| CoreError::numerical_instability("failed to read tensor data from device"))
}
