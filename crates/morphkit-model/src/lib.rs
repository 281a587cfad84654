//! Stateful components for template construction and instance-specific
//! registration.
//!
//! Unlike the pure primitives in `morphkit-core`, the types here hold
//! mutable state across invocations of one logical instance: the running
//! mean of a field stream and a trainable per-voxel parameter field. Their
//! state is exposed through explicit accessors so the host framework can
//! checkpoint it; the file format is the host's concern.

pub mod local_param;
pub mod mean_stream;

pub use local_param::LocalParamField;
pub use mean_stream::MeanStream;
