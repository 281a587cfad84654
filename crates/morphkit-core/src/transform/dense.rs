//! Dense displacement field transforms.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::host_tensor;
use crate::error::{CoreError, Result};
use crate::volume::{check_dim, Volume};

/// A dense displacement field over a `D`-dimensional grid.
///
/// Stores one displacement vector per voxel as a `[voxels, D]` tensor over
/// the row-major flattening of `shape`; column `a` is the displacement along
/// axis `a`, in voxel units of the field's own grid. Applied as
/// `x ↦ x + field[x]`.
#[derive(Debug, Clone)]
pub struct DisplacementField<B: Backend, const D: usize> {
    vectors: Tensor<B, 2>,
    shape: [usize; D],
}

impl<B: Backend, const D: usize> DisplacementField<B, D> {
    /// Create a displacement field from a `[voxels, D]` tensor and its shape.
    pub fn new(vectors: Tensor<B, 2>, shape: [usize; D]) -> Result<Self> {
        check_dim::<D>()?;
        let voxels: usize = shape.iter().product();
        let dims = vectors.dims();
        if dims != [voxels, D] {
            return Err(CoreError::ShapeMismatch {
                expected: vec![voxels, D],
                actual: dims.to_vec(),
            });
        }
        Ok(Self { vectors, shape })
    }

    /// The zero (identity) displacement field.
    pub fn zeros(shape: [usize; D], device: &B::Device) -> Result<Self> {
        check_dim::<D>()?;
        let voxels: usize = shape.iter().product();
        Ok(Self {
            vectors: Tensor::zeros([voxels, D], device),
            shape,
        })
    }

    /// The `[voxels, D]` displacement vectors.
    pub fn vectors(&self) -> Tensor<B, 2> {
        self.vectors.clone()
    }

    /// Spatial shape of the grid the field is defined on.
    pub fn shape(&self) -> [usize; D] {
        self.shape
    }

    /// Number of voxels.
    pub fn num_voxels(&self) -> usize {
        self.vectors.dims()[0]
    }

    /// Device the field lives on.
    pub fn device(&self) -> B::Device {
        self.vectors.device()
    }

    /// View the field as a `D`-channel volume (channel `a` = axis-`a`
    /// component), for resampling the field itself as an image.
    pub fn to_volume(&self) -> Result<Volume<B, D>> {
        Volume::new(self.vectors.clone().transpose(), self.shape)
    }

    /// Rebuild a field from a `D`-channel volume produced by [`Self::to_volume`].
    pub fn from_volume(volume: Volume<B, D>) -> Result<Self> {
        if volume.channels() != D {
            return Err(CoreError::dimension_mismatch(format!(
                "displacement field requires {D} channels, volume has {}",
                volume.channels()
            )));
        }
        let shape = volume.shape();
        Self::new(volume.into_data().transpose(), shape)
    }

    /// Every vector multiplied by a uniform factor.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            vectors: self.vectors.clone().mul_scalar(factor),
            shape: self.shape,
        }
    }

    /// Component `a` multiplied by `factors[a]`.
    pub fn scaled_axes(&self, factors: [f64; D]) -> Self {
        let device = self.vectors.device();
        let factors = host_tensor::<B>(&factors, 1, D, &device);
        Self {
            vectors: self.vectors.clone() * factors,
            shape: self.shape,
        }
    }
}
