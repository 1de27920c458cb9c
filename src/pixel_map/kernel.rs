//! Portable per-pixel sampling kernel, shared verbatim between the CPU and
//! GPU executors.
//!
//! Grounded on `rotate_and_distort` in the teacher's
//! `stabilize_spirv/src/stabilize.rs`: a plain scalar function of an
//! output pixel coordinate, the current inter-frame rotation, and the two
//! camera models, kept free of any `Mat`/OpenCL handle so the exact same
//! code compiles to a GPU kernel body (via `ocl`) and runs unmodified on
//! the CPU executor (via `rayon`).

use nalgebra::{Point2, Vector3};

use crate::camera::Camera;
use crate::rotation::Rotation;

/// Maps one output-image pixel `(u, v)` back through the output camera,
/// the inter-frame rotation, and the input (fisheye) camera, producing the
/// source pixel coordinate to sample. Returns `None` when the back-
/// projected ray falls behind the camera (`z <= 0`), which the caller
/// treats as "no valid source pixel" (sampled as the remap border value).
pub fn sample_source(u: f64, v: f64, output: &Camera, rotation: &Rotation, input: &Camera) -> Option<Point2<f64>> {
    let ray2d = output.pixel_to_ray(Point2::new(u, v));
    let ray = Vector3::new(ray2d.x, ray2d.y, 1.0);
    let rotated = rotation.matrix() * ray;
    if rotated.z <= 0.0 {
        return None;
    }
    let ray2d_in = nalgebra::Vector2::new(rotated.x, rotated.y);
    Some(input.project(ray2d_in, rotated.z))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::DistortionCoeffs;

    fn pinhole(w: u32, h: u32) -> Camera {
        Camera { width: w, height: h, fx: 500.0, fy: 500.0, cx: w as f64 / 2.0, cy: h as f64 / 2.0, distortion: DistortionCoeffs::NONE }
    }

    #[test]
    fn identity_rotation_and_matching_cameras_is_the_identity_map() {
        let cam = pinhole(640, 480);
        let p = sample_source(123.0, 77.0, &cam, &Rotation::identity(), &cam).unwrap();
        assert!((p.x - 123.0).abs() < 1e-6);
        assert!((p.y - 77.0).abs() < 1e-6);
    }

    #[test]
    fn rays_behind_camera_are_rejected() {
        let cam = pinhole(640, 480);
        // A rotation that flips the ray behind the camera for every pixel.
        let flip = Rotation::from_axis_angle(Vector3::new(0.0, 1.0, 0.0), std::f64::consts::PI);
        assert!(sample_source(320.0, 240.0, &cam, &flip, &cam).is_none());
    }
}
