//! CPU executor: fills the `map_x`/`map_y` lookup tables in parallel with
//! `rayon`, then hands them to `opencv::imgproc::remap` for the actual
//! bilinear sample.
//!
//! Grounded on the teacher's `stmap.rs::parallel_exr`, which fills an
//! output buffer by splitting it into row chunks and handing each chunk to
//! a rayon worker — the same shape used here for `map_x`/`map_y`.

use opencv::core::{Mat, MatTraitConst, MatTraitConstManual, MatTraitManual, Scalar, CV_32FC1};
use opencv::imgproc;
use rayon::prelude::*;

use crate::camera::Camera;
use crate::error::PipelineError;
use crate::frame::{Frame, PixelLayout};
use crate::rotation::Rotation;

use super::kernel;
use super::MapExecutor;

pub struct CpuMapExecutor {
    input_camera: Camera,
    output_camera: Camera,
}

impl CpuMapExecutor {
    pub fn new(input_camera: Camera, output_camera: Camera) -> Self {
        CpuMapExecutor { input_camera, output_camera }
    }

    fn build_maps(&self, rotation: &Rotation) -> Result<(Mat, Mat), PipelineError> {
        let out_w = self.output_camera.width as usize;
        let out_h = self.output_camera.height as usize;

        let mut map_x = Mat::zeros(out_h as i32, out_w as i32, CV_32FC1)
            .map_err(|e| PipelineError::gpu("pixel_map::cpu", e.to_string()))?
            .to_mat()
            .map_err(|e| PipelineError::gpu("pixel_map::cpu", e.to_string()))?;
        let mut map_y = map_x
            .clone()
            .map_err(|e| PipelineError::gpu("pixel_map::cpu", e.to_string()))?;

        {
            let x_slice: &mut [f32] = map_x
                .data_typed_mut()
                .map_err(|e| PipelineError::gpu("pixel_map::cpu", e.to_string()))?;
            let y_slice: &mut [f32] = map_y
                .data_typed_mut()
                .map_err(|e| PipelineError::gpu("pixel_map::cpu", e.to_string()))?;

            x_slice
                .par_chunks_mut(out_w)
                .zip(y_slice.par_chunks_mut(out_w))
                .enumerate()
                .for_each(|(v, (x_row, y_row))| {
                    for u in 0..out_w {
                        match kernel::sample_source(
                            u as f64 + 0.5,
                            v as f64 + 0.5,
                            &self.output_camera,
                            rotation,
                            &self.input_camera,
                        ) {
                            Some(p) => {
                                x_row[u] = p.x as f32;
                                y_row[u] = p.y as f32;
                            }
                            None => {
                                // Outside the valid (in-front-of-camera) region;
                                // opencv::imgproc::remap's BORDER_CONSTANT maps
                                // any out-of-bounds coordinate to the border
                                // colour, so a large negative coordinate is
                                // sufficient here.
                                x_row[u] = -1.0;
                                y_row[u] = -1.0;
                            }
                        }
                    }
                });
        }

        Ok((map_x, map_y))
    }
}

impl MapExecutor for CpuMapExecutor {
    fn remap(&mut self, source: &Frame, rotation: &Rotation) -> Result<Frame, PipelineError> {
        let (map_x, map_y) = self.build_maps(rotation)?;

        let mut dst = Mat::default();
        imgproc::remap(
            source.mat(),
            &mut dst,
            &map_x,
            &map_y,
            imgproc::INTER_LINEAR,
            opencv::core::BORDER_CONSTANT,
            Scalar::all(0.0),
        )
        .map_err(|e| PipelineError::gpu("pixel_map::cpu", e.to_string()))?;

        Ok(Frame::new(dst, self.output_camera.width, self.output_camera.height, PixelLayout::Bgr))
    }

    fn input_camera(&self) -> &Camera {
        &self.input_camera
    }

    fn output_camera(&self) -> &Camera {
        &self.output_camera
    }
}
