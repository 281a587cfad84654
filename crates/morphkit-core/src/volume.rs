//! Volume payloads and sampling grids.
//!
//! A [`Volume`] stores its channels as a `[C, N]` tensor, flattened
//! row-major over the spatial shape (axis 0 slowest). Keeping the flattened
//! layout explicit in the type lets every sampling operation work on `[N, D]`
//! point lists regardless of the spatial dimensionality.

use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};

use crate::error::{CoreError, Result};

/// Validate the const spatial dimensionality at call time.
pub(crate) fn check_dim<const D: usize>() -> Result<()> {
    if (1..=3).contains(&D) {
        Ok(())
    } else {
        Err(CoreError::invalid_configuration(format!(
            "spatial dimensionality must be 1, 2 or 3, got {D}"
        )))
    }
}

/// Row-major strides for a spatial shape.
pub(crate) fn strides<const D: usize>(shape: [usize; D]) -> [usize; D] {
    let mut strides = [1usize; D];
    for a in (0..D.saturating_sub(1)).rev() {
        strides[a] = strides[a + 1] * shape[a + 1];
    }
    strides
}

/// A multi-channel image volume over a `D`-dimensional grid.
///
/// Channel values live in a `[channels, voxels]` tensor; voxels follow the
/// row-major flattening of `shape`. The payload is otherwise opaque to the
/// core: the resampler moves it, nothing here interprets it.
#[derive(Debug, Clone)]
pub struct Volume<B: Backend, const D: usize> {
    data: Tensor<B, 2>,
    shape: [usize; D],
}

impl<B: Backend, const D: usize> Volume<B, D> {
    /// Create a volume from a `[channels, voxels]` tensor and its spatial shape.
    pub fn new(data: Tensor<B, 2>, shape: [usize; D]) -> Result<Self> {
        check_dim::<D>()?;
        let voxels: usize = shape.iter().product();
        let dims = data.dims();
        if dims[1] != voxels {
            return Err(CoreError::ShapeMismatch {
                expected: vec![dims[0], voxels],
                actual: dims.to_vec(),
            });
        }
        Ok(Self { data, shape })
    }

    /// Create an all-zero volume.
    pub fn zeros(shape: [usize; D], channels: usize, device: &B::Device) -> Result<Self> {
        check_dim::<D>()?;
        let voxels: usize = shape.iter().product();
        Ok(Self {
            data: Tensor::zeros([channels, voxels], device),
            shape,
        })
    }

    /// The `[channels, voxels]` tensor.
    pub fn data(&self) -> Tensor<B, 2> {
        self.data.clone()
    }

    /// Consume the volume, returning its tensor.
    pub fn into_data(self) -> Tensor<B, 2> {
        self.data
    }

    /// Spatial shape.
    pub fn shape(&self) -> [usize; D] {
        self.shape
    }

    /// Number of channels.
    pub fn channels(&self) -> usize {
        self.data.dims()[0]
    }

    /// Number of voxels (product of the spatial shape).
    pub fn num_voxels(&self) -> usize {
        self.data.dims()[1]
    }

    /// Device the payload lives on.
    pub fn device(&self) -> B::Device {
        self.data.device()
    }
}

/// Generate the grid of voxel indices for a spatial shape.
///
/// Returns a `[N, D]` tensor where row `n` holds the integer coordinates of
/// the `n`-th voxel in row-major order. Column `a` is the coordinate along
/// axis `a` (axis 0 slowest), matching the flattening used by [`Volume`].
pub fn index_grid<B: Backend, const D: usize>(
    shape: [usize; D],
    device: &B::Device,
) -> Tensor<B, 2> {
    let total: usize = shape.iter().product();
    let mut grid = Vec::with_capacity(total * D);
    for n in 0..total {
        let mut rem = n;
        let mut coords = [0usize; D];
        for a in (0..D).rev() {
            coords[a] = rem % shape[a];
            rem /= shape[a];
        }
        for c in coords {
            grid.push(c as f32);
        }
    }

    Tensor::<B, 1>::from_data(TensorData::new(grid, Shape::new([total * D])), device)
        .reshape([total, D])
}

/// Center offset `(shape - 1) / 2` as a `[1, D]` tensor, broadcastable
/// against `[N, D]` point lists.
pub(crate) fn center_offset<B: Backend, const D: usize>(
    shape: [usize; D],
    device: &B::Device,
) -> Tensor<B, 2> {
    let center: Vec<f32> = shape.iter().map(|s| (*s as f32 - 1.0) * 0.5).collect();
    Tensor::<B, 1>::from_data(TensorData::new(center, Shape::new([D])), device).reshape([1, D])
}
