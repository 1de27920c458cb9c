//! Intrinsic camera model: a pinhole projection centre plus an equidistant
//! fisheye distortion polynomial, following the four-coefficient model
//! `opencv::calib3d::fisheye` uses (`k1..k4` applied to `theta`, the angle
//! of incidence, rather than to image-plane radius as the rectilinear
//! model does).

use nalgebra::{Matrix3, Point2, Vector2};

/// Equidistant fisheye distortion: `theta_d = theta * (1 + k1*theta^2 +
/// k2*theta^4 + k3*theta^6 + k4*theta^8)`. All zero for a rectilinear
/// (already-undistorted) camera, e.g. the synthesised output camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistortionCoeffs {
    pub k1: f64,
    pub k2: f64,
    pub k3: f64,
    pub k4: f64,
}

impl DistortionCoeffs {
    pub const NONE: DistortionCoeffs = DistortionCoeffs { k1: 0.0, k2: 0.0, k3: 0.0, k4: 0.0 };

    pub fn apply(&self, theta: f64) -> f64 {
        let t2 = theta * theta;
        theta * (1.0 + t2 * (self.k1 + t2 * (self.k2 + t2 * (self.k3 + t2 * self.k4))))
    }

    pub fn is_identity(&self) -> bool {
        *self == DistortionCoeffs::NONE
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub width: u32,
    pub height: u32,
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub distortion: DistortionCoeffs,
}

impl Camera {
    pub fn intrinsic_matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.fx, 0.0, self.cx,
            0.0, self.fy, self.cy,
            0.0, 0.0, 1.0,
        )
    }

    /// Maps an image-space pixel coordinate to a unit-length ray in camera
    /// space, following the fisheye model when `distortion` is non-zero.
    /// Mirrors `worldToCam`/`undistort_point` in
    /// `other_examples/.../cpu_undistor.rs`, adapted to this crate's
    /// `DistortionCoeffs` shape.
    pub fn pixel_to_ray(&self, p: Point2<f64>) -> Vector2<f64> {
        let xd = (p.x - self.cx) / self.fx;
        let yd = (p.y - self.cy) / self.fy;
        if self.distortion.is_identity() {
            return Vector2::new(xd, yd);
        }
        let theta_d = (xd * xd + yd * yd).sqrt();
        let theta = self.undistort_theta(theta_d);
        if theta_d < 1e-12 {
            Vector2::new(0.0, 0.0)
        } else {
            let scale = theta.tan().max(0.0) / theta_d;
            Vector2::new(xd * scale, yd * scale)
        }
    }

    /// Inverts `DistortionCoeffs::apply` by Newton iteration. The original
    /// pipeline relies on `cv::fisheye::undistortPoints` to do this inside
    /// OpenCV's C++; the CPU reference path here (used for preset/output
    /// camera synthesis, where no `Mat` exists yet) does the same thing by
    /// hand, matching the Newton solver in
    /// `other_examples/93e42a83_.../cpu_undistor.rs`.
    fn undistort_theta(&self, theta_d: f64) -> f64 {
        let mut theta = theta_d;
        for _ in 0..10 {
            let t2 = theta * theta;
            let k = &self.distortion;
            let f = theta * (1.0 + t2 * (k.k1 + t2 * (k.k2 + t2 * (k.k3 + t2 * k.k4)))) - theta_d;
            let fp = 1.0
                + t2 * (3.0 * k.k1 + t2 * (5.0 * k.k2 + t2 * (7.0 * k.k3 + t2 * 9.0 * k.k4)));
            if fp.abs() < 1e-12 {
                break;
            }
            theta -= f / fp;
        }
        theta
    }

    /// Projects a camera-space ray (need not be unit length) to an
    /// undistorted image-plane point, then applies fisheye distortion,
    /// producing the final pixel coordinate. This is the forward half of
    /// the remap kernel's per-pixel math (`pixel_map::kernel`).
    pub fn project(&self, ray: Vector2<f64>, ray_z: f64) -> Point2<f64> {
        if self.distortion.is_identity() {
            return Point2::new(self.fx * ray.x / ray_z + self.cx, self.fy * ray.y / ray_z + self.cy);
        }
        let r = (ray.x * ray.x + ray.y * ray.y).sqrt();
        let theta = r.atan2(ray_z);
        if r < 1e-12 {
            return Point2::new(self.cx, self.cy);
        }
        let theta_d = self.distortion.apply(theta);
        let scale = theta_d / r;
        Point2::new(self.fx * ray.x * scale + self.cx, self.fy * ray.y * scale + self.cy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fisheye_camera() -> Camera {
        Camera {
            width: 1920,
            height: 1080,
            fx: 600.0,
            fy: 600.0,
            cx: 960.0,
            cy: 540.0,
            distortion: DistortionCoeffs { k1: -0.01, k2: 0.002, k3: 0.0, k4: 0.0 },
        }
    }

    #[test]
    fn project_and_pixel_to_ray_round_trip_near_centre() {
        let cam = fisheye_camera();
        let ray = Vector2::new(0.1, -0.05);
        let p = cam.project(ray, 1.0);
        let back = cam.pixel_to_ray(p);
        assert!((back.x - ray.x).abs() < 1e-4);
        assert!((back.y - ray.y).abs() < 1e-4);
    }

    #[test]
    fn centre_pixel_maps_to_zero_ray() {
        let cam = fisheye_camera();
        let ray = cam.pixel_to_ray(Point2::new(cam.cx, cam.cy));
        assert!(ray.norm() < 1e-9);
    }

    #[test]
    fn identity_distortion_is_pure_pinhole() {
        let cam = Camera { distortion: DistortionCoeffs::NONE, ..fisheye_camera() };
        let p = cam.project(Vector2::new(0.2, 0.1), 1.0);
        assert!((p.x - (cam.fx * 0.2 + cam.cx)).abs() < 1e-9);
        assert!((p.y - (cam.fy * 0.1 + cam.cy)).abs() < 1e-9);
    }
}
