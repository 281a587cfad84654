//! Mid-space solver: the affine square root.
//!
//! Symmetric registration meets both images halfway by warping each with
//! half of the full transform, i.e. an affine `H` with `H ∘ H ≈ T`. `H` is
//! the principal square root of the homogeneous matrix, computed with the
//! Denman–Beavers iteration.

use burn::tensor::backend::Backend;
use nalgebra::DMatrix;
use tracing::trace;

use super::AffineMatrix;
use crate::error::{CoreError, Result};

const MAX_ITERATIONS: usize = 50;
const RESIDUAL_TOLERANCE: f64 = 1e-12;

/// Compute the affine square root `H` with `compose(H, H) ≈ T`.
///
/// The principal square root exists only when no eigenvalue sits on the
/// closed negative real axis. Matrices that violate this, such as
/// reflections or rotations by exactly π, are reported as
/// [`CoreError::NoRealSquareRoot`]: the determinant and eigenvalue gates
/// catch them up front, and the iteration's convergence check catches
/// anything that slips past in ill-conditioned form.
pub fn half_affine<B: Backend, const D: usize>(
    affine: &AffineMatrix<B, D>,
) -> Result<AffineMatrix<B, D>> {
    let device = affine.tensor().device();
    let hom = affine.to_homogeneous()?;

    let det = hom.determinant();
    if det <= 0.0 || !det.is_finite() {
        return Err(CoreError::no_real_square_root(format!(
            "homogeneous matrix has determinant {det:.3e}; reflections have no real principal \
             square root"
        )));
    }

    for lambda in hom.complex_eigenvalues().iter() {
        if lambda.re <= 0.0 && lambda.im.abs() <= 1e-9 * lambda.norm().max(1.0) {
            return Err(CoreError::no_real_square_root(format!(
                "eigenvalue {:.3e} lies on the nonpositive real axis",
                lambda.re
            )));
        }
    }

    let root = denman_beavers(&hom)?;
    AffineMatrix::from_homogeneous(&root, &device)
}

/// Denman–Beavers iteration for the principal matrix square root.
///
/// Maintains `Y → √A` and `Z → √A⁻¹` with
/// `Y' = (Y + Z⁻¹)/2`, `Z' = (Z + Y⁻¹)/2`.
fn denman_beavers(matrix: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let n = matrix.nrows();
    let norm = matrix.norm();
    let mut y = matrix.clone();
    let mut z = DMatrix::<f64>::identity(n, n);

    for iteration in 0..MAX_ITERATIONS {
        let y_inv = y.clone().try_inverse().ok_or_else(|| {
            CoreError::no_real_square_root("square-root iterate became singular")
        })?;
        let z_inv = z.clone().try_inverse().ok_or_else(|| {
            CoreError::no_real_square_root("square-root iterate became singular")
        })?;
        y = (y + z_inv) * 0.5;
        z = (z + y_inv) * 0.5;

        let residual = (&y * &y - matrix).norm() / norm;
        trace!(iteration, residual, "denman-beavers step");
        if !residual.is_finite() {
            return Err(CoreError::no_real_square_root(
                "square-root iteration diverged to a non-finite residual",
            ));
        }
        if residual < RESIDUAL_TOLERANCE {
            return Ok(y);
        }
    }

    Err(CoreError::no_real_square_root(format!(
        "square-root iteration did not converge within {MAX_ITERATIONS} steps; the matrix \
         likely has no real principal square root"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use std::f64::consts::PI;

    use crate::transform::compose::compose;
    use crate::transform::{host_tensor, params_to_matrix, Transform};

    type TestBackend = NdArray<f32>;

    fn assert_composes_back(affine: AffineMatrix<TestBackend, 2>) {
        let half = half_affine(&affine).unwrap();
        let composed = compose(
            &[Transform::Affine(half.clone()), Transform::Affine(half)],
            false,
            None,
        )
        .unwrap();
        let Transform::Affine(result) = composed else {
            panic!("expected an affine result");
        };

        let expected = affine.tensor().into_data();
        let actual = result.tensor().into_data();
        let expected = expected.as_slice::<f32>().unwrap();
        let actual = actual.as_slice::<f32>().unwrap();
        for (e, a) in expected.iter().zip(actual) {
            assert!((e - a).abs() < 1e-3, "expected {e}, got {a}");
        }
    }

    #[test]
    fn test_half_translation() {
        let device = Default::default();
        let affine = AffineMatrix::<TestBackend, 2>::new(host_tensor(
            &[1.0, 0.0, 4.0, 0.0, 1.0, -2.0],
            2,
            3,
            &device,
        ))
        .unwrap();

        let half = half_affine(&affine).unwrap();
        let data = half.tensor().into_data();
        let slice = data.as_slice::<f32>().unwrap();
        assert!((slice[2] - 2.0).abs() < 1e-4);
        assert!((slice[5] + 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_half_composes_back_to_input() {
        let device = Default::default();
        // Rotation + anisotropic scale + translation.
        let affine = params_to_matrix::<TestBackend, 2>(
            &[1.0, -0.5, PI / 6.0, 1.2, 0.9, 0.05],
            &device,
        )
        .unwrap();
        assert_composes_back(affine);
    }

    #[test]
    fn test_half_of_identity_is_identity() {
        let device = Default::default();
        let identity = AffineMatrix::<TestBackend, 3>::identity(&device).unwrap();
        let half = half_affine(&identity).unwrap();

        let data = half.tensor().into_data();
        let slice = data.as_slice::<f32>().unwrap();
        for r in 0..3 {
            for c in 0..4 {
                let expected = if r == c { 1.0 } else { 0.0 };
                assert!((slice[r * 4 + c] - expected).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_reflection_has_no_real_root() {
        let device = Default::default();
        let reflection = AffineMatrix::<TestBackend, 2>::new(host_tensor(
            &[-1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            2,
            3,
            &device,
        ))
        .unwrap();

        let result = half_affine(&reflection);
        assert!(matches!(result, Err(CoreError::NoRealSquareRoot(_))));
    }

    #[test]
    fn test_pi_rotation_has_no_real_root() {
        let device = Default::default();
        // Rotation by exactly π: determinant is +1 but both eigenvalues of
        // the linear block are -1.
        let rotation = params_to_matrix::<TestBackend, 2>(
            &[0.0, 0.0, PI, 1.0, 1.0, 0.0],
            &device,
        )
        .unwrap();

        let result = half_affine(&rotation);
        assert!(matches!(result, Err(CoreError::NoRealSquareRoot(_))));
    }
}
