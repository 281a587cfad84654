//! Resolution changes for displacement fields.

use burn::tensor::backend::Backend;

use crate::error::{CoreError, Result};
use crate::interpolation::Interpolation;
use crate::resample::SpatialResampler;
use crate::transform::{AffineMatrix, DisplacementField, Transform};

/// Rescale a displacement field by a uniform factor.
///
/// The output grid has shape `round(shape × factor)` per axis (at least 1).
/// The field is resampled onto the new grid as a `D`-channel image and every
/// vector is multiplied by the factor: displacement values are expressed in
/// voxel units of their own grid, so changing the grid spacing changes what
/// one unit of displacement means. Skipping the magnitude scaling would turn
/// this into plain image resizing and silently shrink or stretch the
/// encoded motion.
pub fn rescale_field<B: Backend, const D: usize>(
    field: &DisplacementField<B, D>,
    factor: f64,
) -> Result<DisplacementField<B, D>> {
    rescale_field_axes(field, [factor; D])
}

/// Rescale a displacement field with a separate factor per axis.
pub fn rescale_field_axes<B: Backend, const D: usize>(
    field: &DisplacementField<B, D>,
    factors: [f64; D],
) -> Result<DisplacementField<B, D>> {
    for factor in factors {
        if !(factor > 0.0 && factor.is_finite()) {
            return Err(CoreError::invalid_configuration(format!(
                "rescale factor must be positive and finite, got {factor}"
            )));
        }
    }

    let in_shape = field.shape();
    let mut out_shape = [0usize; D];
    let mut inverse = [0.0f64; D];
    for a in 0..D {
        out_shape[a] = ((in_shape[a] as f64) * factors[a]).round().max(1.0) as usize;
        inverse[a] = 1.0 / factors[a];
    }

    // Output voxel x samples the input field at x / factor.
    let device = field.device();
    let lookup = AffineMatrix::<B, D>::scaling(inverse, &device)?;
    let resampler =
        SpatialResampler::<D>::new(Interpolation::Linear, false).with_out_shape(out_shape);
    let resized = resampler.apply(&field.to_volume()?, &Transform::Affine(lookup))?;

    Ok(DisplacementField::from_volume(resized)?.scaled_axes(factors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::{Tensor, TensorData};
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn constant_field(
        value: [f32; 2],
        shape: [usize; 2],
    ) -> DisplacementField<TestBackend, 2> {
        let device = Default::default();
        let voxels = shape[0] * shape[1];
        let mut values = Vec::with_capacity(voxels * 2);
        for _ in 0..voxels {
            values.extend(value);
        }
        let vectors =
            Tensor::<TestBackend, 2>::from_data(TensorData::new(values, [voxels, 2]), &device);
        DisplacementField::new(vectors, shape).unwrap()
    }

    #[test]
    fn test_output_shape_rounds_per_axis() {
        let field = constant_field([0.0, 0.0], [5, 6]);
        let rescaled = rescale_field(&field, 0.5).unwrap();
        // 5 * 0.5 = 2.5 rounds away from zero to 3; 6 * 0.5 = 3 stays.
        assert_eq!(rescaled.shape(), [3, 3]);
    }

    #[test]
    fn test_vectors_scale_with_grid() {
        let field = constant_field([1.0, -2.0], [4, 4]);
        let rescaled = rescale_field(&field, 2.0).unwrap();

        assert_eq!(rescaled.shape(), [8, 8]);
        let data = rescaled.vectors().into_data();
        for chunk in data.as_slice::<f32>().unwrap().chunks(2) {
            assert!((chunk[0] - 2.0).abs() < 1e-5);
            assert!((chunk[1] + 4.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_per_axis_factors() {
        let field = constant_field([1.0, 1.0], [4, 4]);
        let rescaled = rescale_field_axes(&field, [2.0, 0.5]).unwrap();

        assert_eq!(rescaled.shape(), [8, 2]);
        let data = rescaled.vectors().into_data();
        for chunk in data.as_slice::<f32>().unwrap().chunks(2) {
            assert!((chunk[0] - 2.0).abs() < 1e-5);
            assert!((chunk[1] - 0.5).abs() < 1e-5);
        }
    }

    #[test]
    fn test_round_trip_recovers_field_values() {
        // Smooth ramp along axis 1; up then down should reproduce the field
        // within interpolation error.
        let device = Default::default();
        let shape = [4usize, 8];
        let mut values = Vec::with_capacity(32 * 2);
        for r in 0..4 {
            for c in 0..8 {
                values.push(0.1 * r as f32);
                values.push(0.2 * c as f32);
            }
        }
        let vectors =
            Tensor::<TestBackend, 2>::from_data(TensorData::new(values.clone(), [32, 2]), &device);
        let field = DisplacementField::<TestBackend, 2>::new(vectors, shape).unwrap();

        let up = rescale_field(&field, 2.0).unwrap();
        let back = rescale_field(&up, 0.5).unwrap();

        assert_eq!(back.shape(), shape);
        let data = back.vectors().into_data();
        let slice = data.as_slice::<f32>().unwrap();
        for (expected, actual) in values.iter().zip(slice) {
            assert!(
                (expected - actual).abs() < 0.05,
                "expected {expected}, got {actual}"
            );
        }
    }

    #[test]
    fn test_rejects_non_positive_factor() {
        let field = constant_field([0.0, 0.0], [4, 4]);
        assert!(rescale_field(&field, 0.0).is_err());
        assert!(rescale_field(&field, -1.0).is_err());
        assert!(rescale_field(&field, f64::NAN).is_err());
    }
}
