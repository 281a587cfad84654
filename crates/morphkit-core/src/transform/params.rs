//! Conversion between affine matrices and compact parameter vectors.
//!
//! Parameters are ordered (translation, rotation, scale, shear) with
//! rotation angles in radians, giving vectors of length 2, 6 and 12 for
//! D = 1, 2 and 3. The linear block decomposes as `R · Sh · diag(s)` via QR
//! with a positive-diagonal sign fix; rebuilding from parameters uses the
//! same convention, so round trips are exact for positive-determinant
//! matrices.

use burn::tensor::backend::Backend;
use nalgebra::{DMatrix, Matrix3, Rotation3};

use super::AffineMatrix;
use crate::error::{CoreError, Result};
use crate::volume::check_dim;

/// Number of parameters for dimensionality `d`: translation `d`, rotation
/// `d(d-1)/2`, scale `d`, shear `d(d-1)/2`.
pub(crate) fn param_count(d: usize) -> usize {
    d * (d + 1)
}

/// Number of rigid parameters (translation + rotation) for dimensionality `d`.
pub(crate) fn rigid_param_count(d: usize) -> usize {
    d * (d + 1) / 2
}

/// Decompose an affine matrix into its parameter vector.
///
/// Fails with a numerical error when the linear block has a non-positive
/// determinant: such matrices contain a reflection or collapse and have no
/// rotation-based decomposition.
pub fn matrix_to_params<B: Backend, const D: usize>(
    affine: &AffineMatrix<B, D>,
) -> Result<Vec<f64>> {
    check_dim::<D>()?;
    let hom = affine.to_homogeneous()?;

    let mut params = Vec::with_capacity(param_count(D));
    for r in 0..D {
        params.push(hom[(r, D)]);
    }

    let linear = DMatrix::<f64>::from_fn(D, D, |r, c| hom[(r, c)]);
    let det = linear.determinant();
    if det <= 0.0 || !det.is_finite() {
        return Err(CoreError::numerical_instability(format!(
            "cannot decompose affine with non-positive linear determinant {det:.3e} into \
             rotation parameters"
        )));
    }

    if D == 1 {
        params.push(linear[(0, 0)]);
        return Ok(params);
    }

    // QR with the diagonal of R forced positive: Q becomes a proper
    // rotation, R carries scale on the diagonal and shear above it.
    let qr = linear.qr();
    let mut q = qr.q();
    let mut r = qr.r();
    for j in 0..D {
        if r[(j, j)] < 0.0 {
            for c in 0..D {
                r[(j, c)] = -r[(j, c)];
            }
            for i in 0..D {
                q[(i, j)] = -q[(i, j)];
            }
        }
    }

    match D {
        2 => params.push(q[(1, 0)].atan2(q[(0, 0)])),
        3 => {
            let rotation =
                Rotation3::from_matrix_unchecked(Matrix3::from_fn(|i, j| q[(i, j)]));
            let (roll, pitch, yaw) = rotation.euler_angles();
            params.extend([roll, pitch, yaw]);
        }
        _ => unreachable!("dimensionality validated above"),
    }

    for j in 0..D {
        params.push(r[(j, j)]);
    }
    for i in 0..D {
        for j in (i + 1)..D {
            params.push(r[(i, j)] / r[(j, j)]);
        }
    }

    Ok(params)
}

/// Build an affine matrix from a parameter vector.
pub fn params_to_matrix<B: Backend, const D: usize>(
    params: &[f64],
    device: &B::Device,
) -> Result<AffineMatrix<B, D>> {
    check_dim::<D>()?;
    let expected = param_count(D);
    if params.len() != expected {
        return Err(CoreError::invalid_configuration(format!(
            "expected {expected} affine parameters for {D}D, got {}",
            params.len()
        )));
    }

    let rotations = D * (D - 1) / 2;
    let (translation, rest) = params.split_at(D);
    let (angles, rest) = rest.split_at(rotations);
    let (scale, shear) = rest.split_at(D);

    let rotation = match D {
        1 => DMatrix::<f64>::identity(1, 1),
        2 => {
            let (sin, cos) = angles[0].sin_cos();
            DMatrix::<f64>::from_row_slice(2, 2, &[cos, -sin, sin, cos])
        }
        3 => {
            let rotation = Rotation3::from_euler_angles(angles[0], angles[1], angles[2]);
            DMatrix::<f64>::from_fn(3, 3, |i, j| rotation.matrix()[(i, j)])
        }
        _ => unreachable!("dimensionality validated above"),
    };

    // K = Sh · diag(s): scale on the diagonal, shear scaled by the column's
    // scale above it.
    let mut k = DMatrix::<f64>::zeros(D, D);
    let mut shear_at = 0;
    for i in 0..D {
        k[(i, i)] = scale[i];
        for j in (i + 1)..D {
            k[(i, j)] = shear[shear_at] * scale[j];
            shear_at += 1;
        }
    }

    let linear = rotation * k;
    let mut hom = DMatrix::<f64>::identity(D + 1, D + 1);
    for r in 0..D {
        for c in 0..D {
            hom[(r, c)] = linear[(r, c)];
        }
        hom[(r, D)] = translation[r];
    }

    AffineMatrix::from_homogeneous(&hom, device)
}

/// Project an affine transform onto the rigid subgroup by parameter
/// truncation: keep translation and rotation, reset scale to one and shear
/// to zero. This matches the original estimator's behavior and is an
/// approximate projection, not an orthogonal (Procrustes) one.
pub fn rigid_projection<B: Backend, const D: usize>(
    affine: &AffineMatrix<B, D>,
) -> Result<AffineMatrix<B, D>> {
    let device = affine.tensor().device();
    let mut params = matrix_to_params(affine)?;
    let rigid = rigid_param_count(D);
    for (i, value) in params.iter_mut().enumerate().skip(rigid) {
        // Scale params sit directly after the rigid block.
        *value = if i < rigid + D { 1.0 } else { 0.0 };
    }
    params_to_matrix(&params, &device)
}
