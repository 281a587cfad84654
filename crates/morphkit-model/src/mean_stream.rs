//! Online running mean of a field stream.

use burn::tensor::backend::Backend;
use tracing::trace;

use morphkit_core::{CoreError, Result, Volume};

/// Running mean of a stream of fields, for template construction.
///
/// Holds a `(count, mean)` pair updated once per training step. Below the
/// cap the update is the exact running average; once the count saturates,
/// new samples keep a fixed weight of `batch_size / cap`, a bounded-memory
/// approximation to a moving average that stays responsive on very long
/// runs.
///
/// The update is plain tensor arithmetic, so a loss depending on the mean
/// stays differentiable with respect to the incoming batch mean. The state
/// is never reset implicitly; concurrent updates to one instance must be
/// serialized by the caller, or aggregated before a single `update` call.
#[derive(Debug, Clone)]
pub struct MeanStream<B: Backend, const D: usize> {
    mean: Volume<B, D>,
    count: usize,
}

impl<B: Backend, const D: usize> MeanStream<B, D> {
    /// Create a stream with a zero mean and a count of zero.
    pub fn new(shape: [usize; D], channels: usize, device: &B::Device) -> Result<Self> {
        Ok(Self {
            mean: Volume::zeros(shape, channels, device)?,
            count: 0,
        })
    }

    /// Fold one batch into the stream.
    ///
    /// `batch_mean` is the mean field of the batch, `batch_size` the number
    /// of samples behind it, and `cap` the saturation count.
    pub fn update(
        &mut self,
        batch_mean: &Volume<B, D>,
        batch_size: usize,
        cap: usize,
    ) -> Result<()> {
        if cap == 0 {
            return Err(CoreError::invalid_configuration(
                "mean stream cap must be at least 1",
            ));
        }
        if batch_size == 0 {
            return Err(CoreError::invalid_configuration(
                "mean stream batch size must be at least 1",
            ));
        }
        if batch_mean.shape() != self.mean.shape() || batch_mean.channels() != self.mean.channels()
        {
            return Err(CoreError::ShapeMismatch {
                expected: self.mean.shape().to_vec(),
                actual: batch_mean.shape().to_vec(),
            });
        }

        // With a saturated count the effective count stays at the cap, so
        // the weight is pinned at batch_size / cap.
        let next = usize::min(self.count + batch_size, cap);
        let weight = batch_size as f64 / next as f64;
        trace!(count = self.count, next, weight, "mean stream update");

        let delta = (batch_mean.data() - self.mean.data()).mul_scalar(weight);
        self.mean = Volume::new(self.mean.data() + delta, self.mean.shape())?;
        self.count = next;
        Ok(())
    }

    /// The current mean field.
    pub fn read(&self) -> Volume<B, D> {
        self.mean.clone()
    }

    /// Number of samples folded in, saturated at the cap.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Replace the state, e.g. when restoring a checkpoint.
    pub fn load_state(&mut self, count: usize, mean: Volume<B, D>) -> Result<()> {
        if mean.shape() != self.mean.shape() || mean.channels() != self.mean.channels() {
            return Err(CoreError::ShapeMismatch {
                expected: self.mean.shape().to_vec(),
                actual: mean.shape().to_vec(),
            });
        }
        self.count = count;
        self.mean = mean;
        Ok(())
    }
}
