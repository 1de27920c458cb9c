//! Inter-frame rotation estimation from tracked point correspondences.
//!
//! Grounded on `get_camera_movement` in
//! `original_source/opencv/FrameSourceWarp.cpp`: both frames' tracked
//! points are undistorted into normalised camera rays, each is given a
//! random depth (since a single camera's tracked points carry no real
//! depth information, and without *some* spread in depth `solvePnPRansac`
//! degenerates when it tries to also recover a translation), and
//! `solvePnPRansac` is run with an identity camera matrix to recover the
//! rotation that best explains the correspondences. A failed solve, or one
//! with too few inliers, falls back to the previous inter-frame rotation
//! rather than propagating an error — §4.4 treats this as recoverable, not
//! a pipeline failure.

use nalgebra::Matrix3;
use opencv::calib3d;
use opencv::core::{Mat, MatTraitConst, Point2d, Point3d, Vector};
use rand::Rng;

use crate::camera::Camera;
use crate::rotation::Rotation;
use crate::tracking::PointPair;

const RANSAC_ITERATIONS: i32 = 100;
const RANSAC_REPROJECTION_ERROR: f32 = 8.0;
const RANSAC_CONFIDENCE: f64 = 0.99;
const MIN_INLIERS: usize = 40;
/// Upper bound of the per-point depth draw, `(0, 1]` per §4.4 step 3.
/// `rand`'s `random_range` is half-open (`[a, b)`), so `(0, 1]` isn't
/// expressible as a single range directly; `try_estimate` instead samples
/// `[0, MAX_DEPTH)` and subtracts from `MAX_DEPTH`, remapping onto
/// `(0, MAX_DEPTH]`.
const MAX_DEPTH: f64 = 1.0;

pub struct RotationEstimator {
    previous_rotation: Rotation,
}

impl RotationEstimator {
    pub fn new() -> Self {
        RotationEstimator { previous_rotation: Rotation::identity() }
    }

    /// Estimates the rotation between the frame `pairs` were tracked from
    /// and the frame they were tracked into, both captured by `camera`.
    /// Never fails: on any solver error or an inlier count below
    /// [`MIN_INLIERS`], the previous successful estimate is returned and a
    /// warning is logged.
    pub fn estimate(&mut self, pairs: &[PointPair], camera: &Camera) -> Rotation {
        match self.try_estimate(pairs, camera) {
            Ok(rotation) => {
                self.previous_rotation = rotation;
                rotation
            }
            Err(reason) => {
                log::warn!("rotation estimator falling back to previous rotation: {reason}");
                self.previous_rotation
            }
        }
    }

    fn try_estimate(&self, pairs: &[PointPair], camera: &Camera) -> Result<Rotation, String> {
        if pairs.len() < MIN_INLIERS {
            return Err(format!("only {} tracked pairs, need at least {MIN_INLIERS}", pairs.len()));
        }

        let mut rng = rand::rng();
        let mut object_points = Vector::<Point3d>::new();
        let mut image_points = Vector::<Point2d>::new();

        for pair in pairs {
            let previous_ray = camera.pixel_to_ray(nalgebra::Point2::new(pair.previous.x as f64, pair.previous.y as f64));
            let current_ray = camera.pixel_to_ray(nalgebra::Point2::new(pair.current.x as f64, pair.current.y as f64));
            let depth: f64 = MAX_DEPTH - rng.random_range(0.0..MAX_DEPTH);
            object_points.push(Point3d::new(previous_ray.x * depth, previous_ray.y * depth, depth));
            image_points.push(Point2d::new(current_ray.x, current_ray.y));
        }

        let identity_camera = Mat::eye(3, 3, opencv::core::CV_64F)
            .map_err(|e| e.to_string())?
            .to_mat()
            .map_err(|e| e.to_string())?;
        let no_distortion = Mat::default();

        let mut rvec = Mat::default();
        let mut tvec = Mat::default();
        let mut inliers = Mat::default();

        let solved = calib3d::solve_pnp_ransac(
            &object_points,
            &image_points,
            &identity_camera,
            &no_distortion,
            &mut rvec,
            &mut tvec,
            false,
            RANSAC_ITERATIONS,
            RANSAC_REPROJECTION_ERROR,
            RANSAC_CONFIDENCE,
            &mut inliers,
            calib3d::SOLVEPNP_ITERATIVE,
        )
        .map_err(|e| e.to_string())?;

        if !solved {
            return Err("solvePnPRansac did not converge".to_string());
        }

        let inlier_count = inliers.rows() as usize;
        if inlier_count < MIN_INLIERS {
            return Err(format!("only {inlier_count} inliers, need at least {MIN_INLIERS}"));
        }

        let mut rmat = Mat::default();
        calib3d::rodrigues(&rvec, &mut rmat, &mut Mat::default()).map_err(|e| e.to_string())?;

        let mut m = Matrix3::identity();
        for row in 0..3 {
            for col in 0..3 {
                let value: f64 = *rmat
                    .at_2d::<f64>(row, col)
                    .map_err(|e| e.to_string())?;
                m[(row as usize, col as usize)] = value;
            }
        }

        Ok(Rotation::from_matrix_unchecked(m))
    }
}

impl Default for RotationEstimator {
    fn default() -> Self {
        RotationEstimator::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::DistortionCoeffs;

    fn pinhole() -> Camera {
        Camera { width: 640, height: 480, fx: 500.0, fy: 500.0, cx: 320.0, cy: 240.0, distortion: DistortionCoeffs::NONE }
    }

    #[test]
    fn falls_back_to_identity_when_too_few_pairs_and_nothing_estimated_yet() {
        let mut estimator = RotationEstimator::new();
        let rotation = estimator.estimate(&[], &pinhole());
        assert_eq!(rotation, Rotation::identity());
    }

    #[test]
    fn fallback_preserves_the_previous_successful_estimate() {
        let mut estimator = RotationEstimator::new();
        estimator.previous_rotation = Rotation::from_axis_angle(nalgebra::Vector3::new(0.0, 1.0, 0.0), 0.2);
        let expected = estimator.previous_rotation;

        let rotation = estimator.estimate(&[], &pinhole());

        assert_eq!(rotation, expected);
        assert_eq!(estimator.previous_rotation, expected);
    }
}
