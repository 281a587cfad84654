//! Composition and materialization of transforms.

use burn::tensor::backend::Backend;
use tracing::trace;

use super::{AffineMatrix, DisplacementField, Transform};
use crate::error::{CoreError, Result};
use crate::interpolation::Interpolation;
use crate::resample::SpatialResampler;
use crate::volume::{center_offset, index_grid};

/// Compose a sequence of transforms, applied left to right.
///
/// The result is equivalent to applying `transforms[0]` first, then
/// `transforms[1]`, and so on. Affine-into-affine composition stays in
/// matrix form as a homogeneous matrix product; a dense member anywhere in
/// the sequence forces materialization of every affine member over `shape`
/// (or, when `shape` is `None`, the common shape of the dense members).
///
/// `shift_center` governs only the affine materialization. Pipelines that
/// change resolution must compose with `shift_center = false` and re-center
/// at the endpoints only; per-shape center offsets disagree across
/// resolutions and would bake a wrong translation into the result.
pub fn compose<B: Backend, const D: usize>(
    transforms: &[Transform<B, D>],
    shift_center: bool,
    shape: Option<[usize; D]>,
) -> Result<Transform<B, D>> {
    let first = transforms.first().ok_or_else(|| {
        CoreError::invalid_configuration("compose requires at least one transform")
    })?;

    // Resolve the materialization shape up front so a mismatch aborts before
    // any work happens.
    let mut resolved = shape;
    for transform in transforms {
        if let Transform::Dense(field) = transform {
            match resolved {
                None => resolved = Some(field.shape()),
                Some(expected) if expected != field.shape() => {
                    return Err(CoreError::ShapeMismatch {
                        expected: expected.to_vec(),
                        actual: field.shape().to_vec(),
                    });
                }
                Some(_) => {}
            }
        }
    }

    trace!(count = transforms.len(), shift_center, "composing transforms");

    let mut acc = first.clone();
    for next in &transforms[1..] {
        acc = match (acc, next) {
            (Transform::Affine(a), Transform::Affine(b)) => {
                // Applying a then b is the homogeneous product b·a.
                Transform::Affine(AffineMatrix::from_square(
                    b.to_square().matmul(a.to_square()),
                )?)
            }
            (acc, next) => {
                let shape = resolved.ok_or_else(|| {
                    CoreError::invalid_configuration(
                        "composing mixed transforms requires a materialization shape",
                    )
                })?;
                let f1 = materialize(&acc, shape, shift_center)?;
                let f2 = materialize(next, shape, shift_center)?;
                Transform::Dense(compose_dense(&f1, &f2)?)
            }
        };
    }

    Ok(acc)
}

/// Materialize an affine transform as a displacement field over `shape`.
pub fn affine_to_dense<B: Backend, const D: usize>(
    affine: &AffineMatrix<B, D>,
    shape: [usize; D],
    shift_center: bool,
) -> Result<DisplacementField<B, D>> {
    let device = affine.tensor().device();
    let grid = index_grid::<B, D>(shape, &device);
    let mapped = if shift_center {
        let center = center_offset::<B, D>(shape, &device);
        affine.transform_points(grid.clone() - center.clone()) + center
    } else {
        affine.transform_points(grid.clone())
    };
    DisplacementField::new(mapped - grid, shape)
}

fn materialize<B: Backend, const D: usize>(
    transform: &Transform<B, D>,
    shape: [usize; D],
    shift_center: bool,
) -> Result<DisplacementField<B, D>> {
    match transform {
        Transform::Affine(affine) => affine_to_dense(affine, shape, shift_center),
        Transform::Dense(field) => Ok(field.clone()),
    }
}

/// Compose two displacement fields, `first` applied before `second`:
/// `f(x) = f1(x) + f2(x + f1(x))`.
fn compose_dense<B: Backend, const D: usize>(
    first: &DisplacementField<B, D>,
    second: &DisplacementField<B, D>,
) -> Result<DisplacementField<B, D>> {
    if first.shape() != second.shape() {
        return Err(CoreError::ShapeMismatch {
            expected: first.shape().to_vec(),
            actual: second.shape().to_vec(),
        });
    }
    let resampler = SpatialResampler::<D>::new(Interpolation::Linear, false);
    let warped = resampler.apply(&second.to_volume()?, &Transform::Dense(first.clone()))?;
    let warped = DisplacementField::from_volume(warped)?;
    DisplacementField::new(first.vectors() + warped.vectors(), first.shape())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::{Tensor, TensorData};
    use burn_ndarray::NdArray;

    use crate::transform::host_tensor;

    type TestBackend = NdArray<f32>;

    fn translation_2d(t: [f64; 2]) -> AffineMatrix<TestBackend, 2> {
        let device = Default::default();
        AffineMatrix::new(host_tensor(
            &[1.0, 0.0, t[0], 0.0, 1.0, t[1]],
            2,
            3,
            &device,
        ))
        .unwrap()
    }

    fn read(field: &DisplacementField<TestBackend, 2>) -> Vec<f32> {
        field
            .vectors()
            .into_data()
            .as_slice::<f32>()
            .unwrap()
            .to_vec()
    }

    #[test]
    fn test_compose_requires_transforms() {
        let result = compose::<TestBackend, 2>(&[], false, None);
        assert!(matches!(result, Err(CoreError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_affine_chain_stays_affine() {
        let device = Default::default();
        // Scale axis 0 by 2, then translate by (1, 0): y = 2x0 + 1.
        let scale = AffineMatrix::<TestBackend, 2>::scaling([2.0, 1.0], &device).unwrap();
        let shift = translation_2d([1.0, 0.0]);

        let composed = compose(
            &[Transform::Affine(scale), Transform::Affine(shift)],
            false,
            None,
        )
        .unwrap();

        let Transform::Affine(affine) = composed else {
            panic!("expected an affine result");
        };
        let points = Tensor::<TestBackend, 2>::from_floats([[3.0, 4.0]], &device);
        let moved = affine.transform_points(points);
        let data = moved.into_data();
        let slice = data.as_slice::<f32>().unwrap();
        assert!((slice[0] - 7.0).abs() < 1e-5);
        assert!((slice[1] - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_affine_with_inverse_composes_to_identity() {
        let device = Default::default();
        let affine = AffineMatrix::<TestBackend, 2>::new(host_tensor(
            &[1.2, 0.3, 2.0, -0.1, 0.9, -1.5],
            2,
            3,
            &device,
        ))
        .unwrap();
        let inverse = affine.inverse().unwrap();

        let composed = compose(
            &[Transform::Affine(affine), Transform::Affine(inverse)],
            false,
            None,
        )
        .unwrap();

        let Transform::Affine(result) = composed else {
            panic!("expected an affine result");
        };
        let data = result.tensor().into_data();
        let slice = data.as_slice::<f32>().unwrap();
        let identity = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        for (value, expected) in slice.iter().zip(identity) {
            assert!((value - expected).abs() < 1e-4, "got {value}, expected {expected}");
        }
    }

    #[test]
    fn test_affine_to_dense_translation() {
        let affine = translation_2d([1.0, -2.0]);
        let field = affine_to_dense(&affine, [2, 2], false).unwrap();

        for chunk in read(&field).chunks(2) {
            assert!((chunk[0] - 1.0).abs() < 1e-5);
            assert!((chunk[1] + 2.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_affine_to_dense_shift_center() {
        let device = Default::default();
        // Pure scaling by 2 about the center leaves the center fixed.
        let scale = AffineMatrix::<TestBackend, 2>::scaling([2.0, 2.0], &device).unwrap();
        let field = affine_to_dense(&scale, [3, 3], true).unwrap();

        let values = read(&field);
        // Center voxel (1, 1) is row 4: zero displacement.
        assert!((values[8]).abs() < 1e-5);
        assert!((values[9]).abs() < 1e-5);
        // Corner (0, 0) maps to (-1, -1): displacement (-1, -1).
        assert!((values[0] + 1.0).abs() < 1e-5);
        assert!((values[1] + 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_mixed_compose_matches_materialized_affine() {
        let device = Default::default();
        let shape = [4, 4];
        let shift = translation_2d([1.0, 0.0]);
        let zero = DisplacementField::<TestBackend, 2>::zeros(shape, &device).unwrap();

        let composed = compose(
            &[Transform::Affine(shift.clone()), Transform::Dense(zero)],
            false,
            None,
        )
        .unwrap();

        let Transform::Dense(field) = composed else {
            panic!("expected a dense result");
        };
        let expected = affine_to_dense(&shift, shape, false).unwrap();
        for (a, b) in read(&field).iter().zip(read(&expected)) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn test_dense_compose_accumulates_displacements() {
        let device = Default::default();
        // Two constant unit shifts along axis 1 compose to a double shift
        // away from the border.
        let shape = [1, 4];
        let ones = Tensor::<TestBackend, 2>::from_data(
            TensorData::new(vec![0.0f32, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0], [4, 2]),
            &device,
        );
        let step = DisplacementField::<TestBackend, 2>::new(ones, shape).unwrap();

        let composed = compose(
            &[Transform::Dense(step.clone()), Transform::Dense(step)],
            false,
            None,
        )
        .unwrap();

        let Transform::Dense(field) = composed else {
            panic!("expected a dense result");
        };
        let values = read(&field);
        // Interior voxels see the full doubled shift; the border clamps.
        assert!((values[1] - 2.0).abs() < 1e-5);
        assert!((values[3] - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_mismatched_dense_shapes_rejected() {
        let device = Default::default();
        let a = DisplacementField::<TestBackend, 2>::zeros([2, 2], &device).unwrap();
        let b = DisplacementField::<TestBackend, 2>::zeros([3, 3], &device).unwrap();

        let result = compose(&[Transform::Dense(a), Transform::Dense(b)], false, None);
        assert!(matches!(result, Err(CoreError::ShapeMismatch { .. })));
    }
}
