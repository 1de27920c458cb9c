//! Adapts a [`crate::decode::FrameDecoder`] collaborator into the first
//! stage of the [`super::FrameSource`] chain.

use crate::decode::FrameDecoder;
use crate::error::PullOutcome;
use crate::gpu_context::GpuContext;

use super::UncachedSource;

pub struct DecodedFrameSource<D> {
    decoder: D,
}

impl<D: FrameDecoder> DecodedFrameSource<D> {
    pub fn new(decoder: D) -> Self {
        DecodedFrameSource { decoder }
    }

    pub fn gpu_context(&self) -> GpuContext {
        self.decoder.gpu_context()
    }
}

impl<D: FrameDecoder> UncachedSource for DecodedFrameSource<D> {
    fn pull_uncached(&mut self) -> PullOutcome {
        self.decoder.pull_frame()
    }
}
