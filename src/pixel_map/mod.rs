pub mod kernel;

#[cfg(feature = "use-opencv")]
pub mod cpu;

#[cfg(feature = "use-opencl")]
pub mod gpu;

use crate::camera::Camera;
use crate::error::PipelineError;
use crate::frame::Frame;
use crate::rotation::Rotation;

/// The §4.2 contract: given the current inter-frame rotation and the fixed
/// input/output camera pair, produce a remapped output frame from a
/// source frame. Two implementations satisfy this trait:
/// [`cpu::CpuMapExecutor`] (the tested, in-scope default) and
/// [`gpu::OclMapExecutor`] (an external-collaborator boundary, feature
/// `use-opencl`, not exercised by tests).
pub trait MapExecutor {
    fn remap(&mut self, source: &Frame, rotation: &Rotation) -> Result<Frame, PipelineError>;

    fn input_camera(&self) -> &Camera;
    fn output_camera(&self) -> &Camera;
}
