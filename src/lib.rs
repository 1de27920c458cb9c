//! Real-time reprojection and rotation-stabilisation pipeline for
//! wide-angle fisheye action-camera footage.
//!
//! The chain is `DecodedFrameSource -> SurfaceMapSource -> ColorplaneSource
//! -> StabilizerSource`, each stage a pull-driven [`pipeline::FrameSource`].
//! See `SPEC_FULL.md` for the full design.

pub mod error;
pub mod frame;
pub mod rotation;
pub mod camera;
pub mod pixel_map;
pub mod tracking;
pub mod estimation;
pub mod smoothing;
pub mod profiler;
pub mod gpu_context;
pub mod decode;
pub mod pipeline;

pub use error::{PipelineError, PullResult};
pub use frame::{Frame, PixelLayout};
pub use rotation::Rotation;
