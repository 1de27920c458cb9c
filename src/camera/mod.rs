pub mod model;
pub mod output;
pub mod preset;

pub use model::{Camera, DistortionCoeffs};
pub use output::{synthesize_output_camera, OutputCameraParams};
pub use preset::CameraPreset;
