//! Multilinear interpolation (linear, bilinear, trilinear).

use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};
use serde::{Deserialize, Serialize};

use super::trait_::Interpolator;
use super::gather_channels;
use crate::volume::strides;

/// Multilinear interpolator.
///
/// Weights each of the `2^D` enclosing lattice points by the product of the
/// fractional distances along every axis. The weights are the local
/// derivatives with respect to the sampling coordinates, so the operation
/// stays differentiable through the backend.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LinearInterpolator;

impl LinearInterpolator {
    /// Create a new linear interpolator.
    pub fn new() -> Self {
        Self
    }
}

impl<B: Backend> Interpolator<B> for LinearInterpolator {
    fn interpolate<const D: usize>(
        &self,
        data: &Tensor<B, 2>,
        shape: [usize; D],
        points: Tensor<B, 2>,
    ) -> Tensor<B, 2> {
        let device = points.device();
        let [channels, _] = data.dims();
        let m = points.dims()[0];
        let strides = strides(shape);

        // Per-axis floor index, neighbor index and fractional weight.
        let mut lo: Vec<Tensor<B, 1, Int>> = Vec::with_capacity(D);
        let mut hi: Vec<Tensor<B, 1, Int>> = Vec::with_capacity(D);
        let mut frac: Vec<Tensor<B, 1>> = Vec::with_capacity(D);
        for a in 0..D {
            let p = points.clone().narrow(1, a, 1).squeeze::<1>(1);
            let p0 = p.clone().floor();
            let w = p - p0.clone();
            let max = (shape[a] - 1) as f64;
            lo.push(p0.clone().clamp(0.0, max).int());
            hi.push((p0 + 1.0).clamp(0.0, max).int());
            frac.push(w);
        }

        // Accumulate over the 2^D enclosing corners. Bit a of the corner
        // index selects the upper neighbor along axis a.
        let mut out = Tensor::<B, 2>::zeros([channels, m], &device);
        for corner in 0..(1usize << D) {
            let mut idx = Tensor::<B, 1, Int>::zeros([m], &device);
            let mut weight = Tensor::<B, 1>::ones([m], &device);
            for a in 0..D {
                let stride = strides[a] as i64;
                if corner >> a & 1 == 1 {
                    idx = idx + hi[a].clone().mul_scalar(stride);
                    weight = weight * frac[a].clone();
                } else {
                    idx = idx + lo[a].clone().mul_scalar(stride);
                    weight = weight * frac[a].clone().neg().add_scalar(1.0);
                }
            }
            let values = gather_channels(data, idx);
            out = out + values * weight.reshape([1, m]);
        }

        out
    }
}
