//! Opaque, cheaply-cloneable handle to a decoded or intermediate video
//! frame.
//!
//! `opencv::core::Mat` is reference-counted internally (`Mat::clone` shares
//! the backing buffer), and transparently becomes GPU-resident storage
//! (`UMat`) under an active OpenCL context — the same role the original
//! pipeline gives `cv::UMat` throughout `FrameSourceWarp.cpp`. We keep the
//! plain `Mat` type here rather than introduce a custom buffer handle: the
//! opacity the spec asks for is a property of how stages treat the value,
//! not of the type itself.

#[cfg(feature = "use-opencv")]
use opencv::core::Mat;

#[cfg(feature = "use-opencv")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelLayout {
    /// Planar luma + interleaved chroma, as produced by most hardware
    /// decoders and by `decode::FfmpegDecoder`.
    Nv12,
    /// Interleaved 8-bit BGR, used for the final remapped output frame.
    Bgr,
}

#[cfg(feature = "use-opencv")]
#[derive(Clone)]
pub struct Frame {
    mat: Mat,
    width: u32,
    height: u32,
    layout: PixelLayout,
    /// Single-channel luma view, attached by `pipeline::ColorplaneSource`
    /// for the corner tracker. Shares memory with `mat` when the layout is
    /// `Nv12`; absent before the colorplane stage runs.
    luma: Option<Mat>,
}

#[cfg(feature = "use-opencv")]
impl Frame {
    pub fn new(mat: Mat, width: u32, height: u32, layout: PixelLayout) -> Self {
        Frame { mat, width, height, layout, luma: None }
    }

    pub fn mat(&self) -> &Mat {
        &self.mat
    }

    pub fn into_mat(self) -> Mat {
        self.mat
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    pub fn luma(&self) -> Option<&Mat> {
        self.luma.as_ref()
    }

    pub fn with_luma(mut self, luma: Mat) -> Self {
        self.luma = Some(luma);
        self
    }
}

#[cfg(feature = "use-opencv")]
impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("layout", &self.layout)
            .field("has_luma", &self.luma.is_some())
            .finish()
    }
}
