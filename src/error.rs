//! Tagged result types shared by every pipeline stage.
//!
//! End-of-stream is not an error: it is carried by [`PullResult`] so a
//! well-behaved shutdown never has to be distinguished from a real failure
//! by callers pattern-matching on an `Err`.

use crate::frame::Frame;

/// Outcome of a `pull`/`peek` call on a [`crate::pipeline::FrameSource`].
#[derive(Debug, Clone)]
pub enum PullResult {
    Frame(Frame),
    EndOfStream,
}

impl PullResult {
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, PullResult::EndOfStream)
    }

    pub fn into_frame(self) -> Option<Frame> {
        match self {
            PullResult::Frame(frame) => Some(frame),
            PullResult::EndOfStream => None,
        }
    }
}

/// Result of any pipeline operation that can fail.
pub type PullOutcome = Result<PullResult, PipelineError>;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("decoder failure in `{stage}`: {detail}")]
    Decoder { stage: &'static str, detail: String },

    #[error("GPU runtime failure in `{stage}`: {detail}")]
    Gpu { stage: &'static str, detail: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[cfg(feature = "use-opencv")]
    #[error("opencv error: {0}")]
    OpenCv(#[from] opencv::Error),
}

impl PipelineError {
    pub fn decoder(stage: &'static str, detail: impl Into<String>) -> Self {
        PipelineError::Decoder { stage, detail: detail.into() }
    }

    pub fn gpu(stage: &'static str, detail: impl Into<String>) -> Self {
        PipelineError::Gpu { stage, detail: detail.into() }
    }
}
