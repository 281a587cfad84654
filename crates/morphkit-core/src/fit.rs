//! Closed-form affine estimation from point correspondences.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use nalgebra::DMatrix;
use tracing::trace;

use crate::error::{CoreError, Result};
use crate::transform::{read_host, rigid_projection, AffineMatrix};
use crate::volume::{center_offset, check_dim, index_grid, Volume};

/// Determinants of the normal matrix below this magnitude are treated as
/// singular.
const SINGULAR_EPS: f64 = 1e-12;

/// Fit the affine transform minimizing `Σ wᵢ·‖L·aᵢ + t − bᵢ‖²`.
///
/// `source` and `target` are `[N, D]` point lists; `weights`, when given, is
/// a length-`N` tensor of per-correspondence weights. The fit solves the
/// normal equations of the homogeneous-coordinate formulation host-side in
/// `f64`. Requires `N ≥ D+1` correspondences.
pub fn fit_affine<B: Backend, const D: usize>(
    source: &Tensor<B, 2>,
    target: &Tensor<B, 2>,
    weights: Option<&Tensor<B, 1>>,
) -> Result<AffineMatrix<B, D>> {
    check_dim::<D>()?;
    let device = source.device();
    let n = source.dims()[0];

    if source.dims()[1] != D || target.dims() != [n, D] {
        return Err(CoreError::ShapeMismatch {
            expected: vec![n, D],
            actual: target.dims().to_vec(),
        });
    }
    if n < D + 1 {
        return Err(CoreError::UnderdeterminedFit {
            points: n,
            required: D + 1,
        });
    }

    let a = read_host(source)?;
    let b = read_host(target)?;
    let w = match weights {
        Some(weights) => {
            if weights.dims() != [n] {
                return Err(CoreError::ShapeMismatch {
                    expected: vec![n],
                    actual: weights.dims().to_vec(),
                });
            }
            read_host(&weights.clone().reshape([n, 1]))?
        }
        None => vec![1.0; n],
    };

    // Homogeneous design matrix X = [a | 1], observations B = b.
    let x = DMatrix::<f64>::from_fn(n, D + 1, |r, c| if c < D { a[r * D + c] } else { 1.0 });
    let obs = DMatrix::<f64>::from_fn(n, D, |r, c| b[r * D + c]);
    let wx = DMatrix::<f64>::from_fn(n, D + 1, |r, c| w[r] * x[(r, c)]);

    // Normal equations: (Xᵀ W X) β = Xᵀ W B.
    let normal = x.transpose() * &wx;
    let rhs = wx.transpose() * obs;

    let det = normal.determinant();
    trace!(points = n, det, "solving affine normal equations");
    if !det.is_finite() || det.abs() < SINGULAR_EPS {
        return Err(CoreError::singular_matrix(format!(
            "normal matrix of the affine fit is singular (determinant {det:.3e}); \
             correspondences are degenerate"
        )));
    }
    let beta = normal.lu().solve(&rhs).ok_or_else(|| {
        CoreError::singular_matrix("normal matrix of the affine fit is not solvable")
    })?;

    // β is (D+1)×D with the linear map in the first D rows and the
    // translation in the last; transpose into [D, D+1] row form.
    let mut hom = DMatrix::<f64>::identity(D + 1, D + 1);
    for r in 0..D {
        for c in 0..D {
            hom[(r, c)] = beta[(c, r)];
        }
        hom[(r, D)] = beta[(D, r)];
    }
    AffineMatrix::from_homogeneous(&hom, &device)
}

/// Fit an affine transform symmetrically.
///
/// The closed-form fit is not self-symmetric: fitting `a → b` and inverting
/// does not equal fitting `b → a`. Both directions are therefore fitted
/// independently, the reverse fit is inverted, and the two matrices are
/// averaged element-wise, reducing bias and improving conditioning. With
/// `rigid`, the averaged matrix is projected onto the rigid subgroup by
/// parameter truncation.
pub fn fit_affine_symmetric<B: Backend, const D: usize>(
    source: &Tensor<B, 2>,
    target: &Tensor<B, 2>,
    weights: Option<&Tensor<B, 1>>,
    rigid: bool,
) -> Result<AffineMatrix<B, D>> {
    let forward = fit_affine::<B, D>(source, target, weights)?;
    let reverse = fit_affine::<B, D>(target, source, weights)?;
    let reverse_inv = reverse.inverse()?;

    let averaged =
        AffineMatrix::new((forward.tensor() + reverse_inv.tensor()).mul_scalar(0.5))?;
    if rigid {
        rigid_projection(&averaged)
    } else {
        Ok(averaged)
    }
}

/// Per-channel barycenter of a volume, as a `[C, D]` tensor.
///
/// Each channel's coordinates are averaged with the channel values as
/// weights. With `shift_center`, coordinates are reported relative to the
/// volume center. Stays in tensor ops so a feature map's barycenters remain
/// differentiable; a channel with zero total mass yields NaN coordinates.
pub fn barycenter<B: Backend, const D: usize>(
    volume: &Volume<B, D>,
    shift_center: bool,
) -> Tensor<B, 2> {
    let device = volume.device();
    let grid = index_grid::<B, D>(volume.shape(), &device);
    let mass = volume.data().sum_dim(1);
    let centers = volume.data().matmul(grid) / mass;
    if shift_center {
        centers - center_offset::<B, D>(volume.shape(), &device)
    } else {
        centers
    }
}
