//! Nearest-neighbor interpolation.

use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};
use serde::{Deserialize, Serialize};

use super::trait_::Interpolator;
use super::gather_channels;
use crate::volume::strides;

/// Nearest-neighbor interpolator.
///
/// Rounds every coordinate to the nearest integer index, clamped to the
/// valid range.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NearestInterpolator;

impl NearestInterpolator {
    /// Create a new nearest-neighbor interpolator.
    pub fn new() -> Self {
        Self
    }
}

impl<B: Backend> Interpolator<B> for NearestInterpolator {
    fn interpolate<const D: usize>(
        &self,
        data: &Tensor<B, 2>,
        shape: [usize; D],
        points: Tensor<B, 2>,
    ) -> Tensor<B, 2> {
        let device = points.device();
        let m = points.dims()[0];
        let strides = strides(shape);

        let mut idx = Tensor::<B, 1, Int>::zeros([m], &device);
        for a in 0..D {
            let p = points.clone().narrow(1, a, 1).squeeze::<1>(1);
            let max = (shape[a] - 1) as f64;
            let i = p.round().clamp(0.0, max).int();
            idx = idx + i.mul_scalar(strides[a] as i64);
        }

        gather_channels(data, idx)
    }
}
