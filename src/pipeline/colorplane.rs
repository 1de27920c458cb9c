//! Splits the full frame into the image used for reprojection and the
//! single-channel luma plane the corner tracker needs.
//!
//! For an `Nv12` frame this is a zero-copy `Mat` row range (the luma plane
//! is already the first `height` rows of the packed NV12 buffer built by
//! `decode::ffmpeg::nv12_frame_to_mat`); for a `Bgr` frame (already-
//! remapped output re-entering a second pipeline, or a decoder that
//! produces interleaved colour directly) it falls back to
//! `opencv::imgproc::cvt_color`, which does copy.

use opencv::core::{Mat, MatTraitConst};
use opencv::imgproc;

use crate::error::{PipelineError, PullOutcome, PullResult};
use crate::frame::{Frame, PixelLayout};

use super::{FrameSource, UncachedSource};

pub struct ColorplaneSource<S> {
    source: S,
}

impl<S: FrameSource> ColorplaneSource<S> {
    pub fn new(mut source: S) -> Result<Self, PipelineError> {
        source.peek()?;
        Ok(ColorplaneSource { source })
    }
}

impl<S: FrameSource> UncachedSource for ColorplaneSource<S> {
    fn pull_uncached(&mut self) -> PullOutcome {
        match self.source.pull()? {
            PullResult::EndOfStream => Ok(PullResult::EndOfStream),
            PullResult::Frame(frame) => Ok(PullResult::Frame(attach_luma(frame)?)),
        }
    }
}

fn attach_luma(frame: Frame) -> Result<Frame, PipelineError> {
    let luma = match frame.layout() {
        PixelLayout::Nv12 => {
            let height = frame.height() as i32;
            frame
                .mat()
                .row_range(&opencv::core::Range::new(0, height).map_err(|e| PipelineError::gpu("pipeline::colorplane", e.to_string()))?)
                .map_err(|e| PipelineError::gpu("pipeline::colorplane", e.to_string()))?
                .try_clone()
                .map_err(|e| PipelineError::gpu("pipeline::colorplane", e.to_string()))?
        }
        PixelLayout::Bgr => {
            let mut gray = Mat::default();
            imgproc::cvt_color(frame.mat(), &mut gray, imgproc::COLOR_BGR2GRAY, 0)
                .map_err(|e| PipelineError::gpu("pipeline::colorplane", e.to_string()))?;
            gray
        }
    };
    Ok(frame.with_luma(luma))
}
