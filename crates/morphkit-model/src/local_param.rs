//! Trainable per-voxel parameter fields.

use burn::module::{Module, Param};
use burn::tensor::backend::Backend;
use burn::tensor::{Distribution, Tensor};
use tracing::trace;

use morphkit_core::{CoreError, Result, Volume};

/// Standard deviation of the raw-weight initializer.
const INIT_STDDEV: f64 = 1e-7;

/// A free per-voxel field optimized directly, e.g. an instance-specific
/// velocity field or a template image.
///
/// The raw weights are kept small and scaled by a multiplier on read; a
/// large multiplier stabilizes early-training step sizes when the optimizer
/// sees only the raw magnitudes. [`Self::set_field`] divides by the same
/// multiplier, so stored and externally-observed values stay consistent for
/// any multiplier choice.
#[derive(Module, Debug)]
pub struct LocalParamField<B: Backend, const D: usize> {
    weights: Param<Tensor<B, 2>>,
    mult: f64,
    shape: [usize; D],
}

impl<B: Backend, const D: usize> LocalParamField<B, D> {
    /// Create a field of the given shape and channel count, initialized
    /// with small random weights.
    ///
    /// A multiplier of 1 reads the raw weights directly (template images);
    /// instance-optimization flows typically use a large multiplier such as
    /// 1000.
    pub fn new(
        shape: [usize; D],
        channels: usize,
        mult: f64,
        device: &B::Device,
    ) -> Result<Self> {
        if mult == 0.0 || !mult.is_finite() {
            return Err(CoreError::invalid_configuration(format!(
                "local parameter multiplier must be finite and non-zero, got {mult}"
            )));
        }
        // Validate the shape the same way a volume would.
        Volume::<B, D>::zeros(shape, channels, device)?;
        let voxels: usize = shape.iter().product();
        let weights = Tensor::random(
            [channels, voxels],
            Distribution::Normal(0.0, INIT_STDDEV),
            device,
        );
        Ok(Self {
            weights: Param::from_tensor(weights),
            mult,
            shape,
        })
    }

    /// The externally-observed field: `weights × mult`.
    pub fn field(&self) -> Result<Volume<B, D>> {
        Volume::new(self.weights.val().mul_scalar(self.mult), self.shape)
    }

    /// Overwrite the field, storing `field / mult` internally.
    pub fn set_field(&mut self, field: &Volume<B, D>) -> Result<()> {
        if field.shape() != self.shape || field.channels() != self.weights.val().dims()[0] {
            return Err(CoreError::ShapeMismatch {
                expected: self.shape.to_vec(),
                actual: field.shape().to_vec(),
            });
        }
        trace!(shape = ?self.shape, mult = self.mult, "overwriting local parameter field");
        self.weights = Param::from_tensor(field.data().div_scalar(self.mult));
        Ok(())
    }

    /// The read multiplier.
    pub fn mult(&self) -> f64 {
        self.mult
    }
}
