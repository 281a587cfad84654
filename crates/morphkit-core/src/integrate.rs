//! Stationary velocity field integration via scaling and squaring.

use burn::tensor::backend::Backend;
use tracing::debug;

use crate::error::Result;
use crate::interpolation::Interpolation;
use crate::resample::SpatialResampler;
use crate::transform::{DisplacementField, Transform};

/// Integrates a stationary velocity field into a diffeomorphic
/// displacement field.
///
/// Scaling and squaring: the field is scaled by `2^-steps`, then
/// self-composed `steps` times, each squaring doubling the effective flow
/// time. For bounded velocity magnitude and around seven steps the result
/// is smooth and invertible to high approximation; no invertibility check
/// is performed.
#[derive(Debug, Clone, Copy)]
pub struct VelocityIntegrator {
    steps: usize,
}

impl VelocityIntegrator {
    /// Create an integrator with the given number of squaring steps.
    ///
    /// With `steps = 0` the integrator passes the field through unchanged,
    /// treating it as a plain displacement; invertibility is not implied in
    /// that mode.
    pub fn new(steps: usize) -> Self {
        Self { steps }
    }

    /// Number of squaring steps.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Integrate `velocity` over unit time.
    pub fn integrate<B: Backend, const D: usize>(
        &self,
        velocity: &DisplacementField<B, D>,
    ) -> Result<DisplacementField<B, D>> {
        if self.steps == 0 {
            return Ok(velocity.clone());
        }

        debug!(steps = self.steps, "integrating stationary velocity field");
        let scale = 0.5f64.powi(self.steps as i32);
        let mut field = velocity.scaled(scale);

        let resampler = SpatialResampler::<D>::new(Interpolation::Linear, false);
        for _ in 0..self.steps {
            // field(x) <- field(x) + field(x + field(x))
            let warped = resampler.apply(&field.to_volume()?, &Transform::Dense(field.clone()))?;
            let warped = DisplacementField::from_volume(warped)?;
            field = DisplacementField::new(field.vectors() + warped.vectors(), field.shape())?;
        }

        Ok(field)
    }
}
