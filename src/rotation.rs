//! Rotation representation shared by the estimator, the smoothing filter,
//! and the remap kernel.
//!
//! Wraps `nalgebra::Rotation3<f64>` rather than a raw 3x3 matrix so that
//! orthogonality is an invariant of the type, not something every caller
//! has to remember to check — the original C++ pipeline instead carried
//! bare `cv::Matx33d` values and re-derived Euler angles ad hoc
//! (`original_source/opencv/rotation.hpp`); `nalgebra`'s rotation group
//! support replaces that with a type that can't represent an invalid
//! rotation.

use nalgebra::{Matrix3, Rotation3, Unit, Vector3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rotation(Rotation3<f64>);

impl Rotation {
    pub fn identity() -> Self {
        Rotation(Rotation3::identity())
    }

    /// Builds a rotation from a 3x3 matrix, re-orthonormalising it. Used
    /// when a matrix arrives from `opencv::calib3d::rodrigues`, which
    /// returns a plain `Mat` rather than a type-checked rotation.
    pub fn from_matrix_unchecked(m: Matrix3<f64>) -> Self {
        let mut r = Rotation3::from_matrix_unchecked(m);
        r.renormalize();
        Rotation(r)
    }

    pub fn from_axis_angle(axis: Vector3<f64>, angle: f64) -> Self {
        match Unit::try_new(axis, 1e-12) {
            Some(unit_axis) => Rotation(Rotation3::from_axis_angle(&unit_axis, angle)),
            None => Rotation::identity(),
        }
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        self.0.matrix()
    }

    pub fn inner(&self) -> &Rotation3<f64> {
        &self.0
    }

    /// Composition: applies `other` first, then `self` (matrix product
    /// `self * other`), matching the convention used by
    /// `get_camera_movement` in the original source (`R = R_out * R_in^T`).
    pub fn then(&self, other: &Rotation) -> Rotation {
        Rotation(self.0 * other.0)
    }

    pub fn inverse(&self) -> Rotation {
        Rotation(self.0.inverse())
    }

    /// Logarithm map into so(3), represented as an axis-angle vector whose
    /// direction is the rotation axis and whose norm is the angle in
    /// radians. Used by `smoothing::RotationFilter` to average rotations
    /// in the Lie algebra rather than naively averaging matrix entries.
    pub fn log(&self) -> Vector3<f64> {
        self.0.scaled_axis()
    }

    /// Inverse of [`Rotation::log`].
    pub fn exp(v: Vector3<f64>) -> Rotation {
        let angle = v.norm();
        if angle < 1e-12 {
            Rotation::identity()
        } else {
            Rotation::from_axis_angle(v / angle, angle)
        }
    }

    /// True when the underlying matrix is (numerically) a valid rotation:
    /// orthogonal with determinant +1. `renormalize` in the constructors
    /// should make this always hold; this exists for tests and assertions
    /// at trust boundaries (values crossing from `opencv`).
    pub fn is_valid(&self) -> bool {
        let m = self.0.matrix();
        let identity_err = (m.transpose() * m - Matrix3::identity()).norm();
        let det_err = (m.determinant() - 1.0).abs();
        identity_err < 1e-6 && det_err < 1e-6
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Rotation::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn identity_is_valid() {
        assert!(Rotation::identity().is_valid());
    }

    #[test]
    fn log_exp_round_trip() {
        let r = Rotation::from_axis_angle(Vector3::new(0.0, 1.0, 0.0), 0.7);
        let round_tripped = Rotation::exp(r.log());
        assert!((round_tripped.matrix() - r.matrix()).norm() < 1e-9);
    }

    #[test]
    fn composition_matches_matrix_product() {
        let a = Rotation::from_axis_angle(Vector3::new(0.0, 0.0, 1.0), FRAC_PI_2);
        let b = Rotation::from_axis_angle(Vector3::new(1.0, 0.0, 0.0), FRAC_PI_2);
        let composed = a.then(&b);
        assert!(composed.is_valid());
        assert!((composed.matrix() - (a.matrix() * b.matrix())).norm() < 1e-9);
    }

    #[test]
    fn from_matrix_unchecked_renormalises_noisy_input() {
        let noisy = Matrix3::new(
            1.001, 0.0, 0.0,
            0.0, 0.999, 0.0002,
            0.0, -0.0003, 1.0002,
        );
        let r = Rotation::from_matrix_unchecked(noisy);
        assert!(r.is_valid());
    }
}
