//! Interpolation of volume values at continuous coordinates.

pub mod linear;
pub mod nearest;
pub mod trait_;

pub use linear::LinearInterpolator;
pub use nearest::NearestInterpolator;
pub use trait_::Interpolator;

use std::str::FromStr;

use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Interpolation mode for sampling a volume at continuous coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interpolation {
    /// Multilinear interpolation over the enclosing lattice points.
    Linear,
    /// Round to the nearest integer index.
    Nearest,
}

impl Default for Interpolation {
    fn default() -> Self {
        Interpolation::Linear
    }
}

impl FromStr for Interpolation {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(Interpolation::Linear),
            "nearest" => Ok(Interpolation::Nearest),
            other => Err(CoreError::invalid_configuration(format!(
                "unknown interpolation method `{other}` (expected `linear` or `nearest`)"
            ))),
        }
    }
}

/// Gather flattened voxel values for every channel.
///
/// `data` is `[C, N]`, `idx` holds `M` flat voxel indices; returns `[C, M]`.
pub(crate) fn gather_channels<B: Backend>(
    data: &Tensor<B, 2>,
    idx: Tensor<B, 1, Int>,
) -> Tensor<B, 2> {
    let channels = data.dims()[0];
    let m = idx.dims()[0];
    let idx = idx.reshape([1, m]).repeat(&[channels, 1]);
    data.clone().gather(1, idx)
}
