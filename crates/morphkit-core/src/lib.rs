//! Transform algebra and resampling engine for medical image registration.
//!
//! The crate provides the primitives higher-level registration networks are
//! wired from: representing, composing, inverting, integrating and rescaling
//! coordinate transforms, warping volumes through them, and estimating
//! affine transforms from point correspondences. Everything spatially large
//! stays in `burn` tensor ops so a host autodiff backend can differentiate
//! through it; the small closed-form solves run host-side in `f64`.

pub mod error;
pub mod fit;
pub mod integrate;
pub mod interpolation;
pub mod resample;
pub mod rescale;
pub mod transform;
pub mod volume;

pub use error::{CoreError, Result};
pub use fit::{barycenter, fit_affine, fit_affine_symmetric};
pub use integrate::VelocityIntegrator;
pub use interpolation::Interpolation;
pub use resample::SpatialResampler;
pub use rescale::{rescale_field, rescale_field_axes};
pub use transform::{
    affine_to_dense, compose, half_affine, matrix_to_params, params_to_matrix, rigid_projection,
    AffineMatrix, DisplacementField, Transform,
};
pub use volume::{index_grid, Volume};
