//! Interpolator trait for sampling flattened volumes at continuous points.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Interpolator for sampling values at continuous coordinates.
///
/// Implementations clamp sampling indices to the valid range, so
/// out-of-bounds points replicate the border. Constant-fill behavior is
/// layered on top by the resampler, which knows which points left the grid.
///
/// # Type Parameters
/// * `B` - The tensor backend
pub trait Interpolator<B: Backend> {
    /// Sample `data` at continuous `points`.
    ///
    /// # Arguments
    /// * `data` - Channel values `[C, N]`, flattened row-major over `shape`
    /// * `shape` - Spatial shape the flattening refers to
    /// * `points` - Sampling coordinates `[M, D]`, columns in axis order
    ///
    /// # Returns
    /// Sampled values `[C, M]`
    fn interpolate<const D: usize>(
        &self,
        data: &Tensor<B, 2>,
        shape: [usize; D],
        points: Tensor<B, 2>,
    ) -> Tensor<B, 2>;
}
