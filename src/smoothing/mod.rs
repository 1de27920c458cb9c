//! Savitzky-Golay smoothing of a rotation sequence, performed in the Lie
//! algebra of SO(3) rather than by averaging matrix entries directly.
//!
//! DESIGN NOTES resolve the spec's Open Question on rotation filtering in
//! favour of this approach: naive per-entry averaging of rotation matrices
//! does not generally produce a valid rotation, and slerp-based
//! alternatives don't generalise cleanly to a polynomial fit over a
//! window. Instead, each rotation in the window is mapped to a tangent
//! vector at the window's reference rotation via [`Rotation::log`]
//! (composed with the reference's inverse), the resulting vectors are
//! fit with a Savitzky-Golay polynomial exactly as the scalar case would
//! be, and the fitted centre value is mapped back with [`Rotation::exp`].

use nalgebra::Vector3;

use crate::rotation::Rotation;

/// A window of absolute (not inter-frame) rotations, filtered in place
/// around its centre sample.
pub struct RotationFilter {
    window_radius: usize,
    poly_order: usize,
}

impl RotationFilter {
    pub fn new(window_radius: usize, poly_order: usize) -> Self {
        RotationFilter { window_radius, poly_order }
    }

    pub fn window_len(&self) -> usize {
        2 * self.window_radius + 1
    }

    /// Filters the centre element of `window`, which must have exactly
    /// [`RotationFilter::window_len`] entries in chronological order.
    /// Returns the smoothed rotation for that centre frame.
    pub fn filter_centre(&self, window: &[Rotation]) -> Rotation {
        assert_eq!(window.len(), self.window_len(), "rotation filter window size mismatch");

        let reference = window[self.window_radius];
        let reference_inv = reference.inverse();

        let tangents: Vec<Vector3<f64>> = window.iter().map(|r| reference_inv.then(r).log()).collect();

        let coeffs = savitzky_golay_coefficients(self.window_radius, self.poly_order);
        let mut fitted = Vector3::zeros();
        for (tangent, coeff) in tangents.iter().zip(coeffs.iter()) {
            fitted += tangent * *coeff;
        }

        reference.then(&Rotation::exp(fitted))
    }
}

/// Savitzky-Golay convolution coefficients for estimating the centre
/// sample of a `2*radius+1`-point window with a degree-`order`
/// polynomial, via the standard least-squares derivation: coefficients
/// are the centre row of `(V^T V)^-1 V^T`, where `V` is the Vandermonde
/// matrix of sample offsets `-radius..=radius`.
fn savitzky_golay_coefficients(radius: usize, order: usize) -> Vec<f64> {
    let window_len = 2 * radius + 1;
    let order = order.min(window_len - 1);

    let offsets: Vec<f64> = (0..window_len).map(|i| i as f64 - radius as f64).collect();

    let mut vandermonde = nalgebra::DMatrix::<f64>::zeros(window_len, order + 1);
    for (row, &offset) in offsets.iter().enumerate() {
        let mut power = 1.0;
        for col in 0..=order {
            vandermonde[(row, col)] = power;
            power *= offset;
        }
    }

    let gram = vandermonde.transpose() * &vandermonde;
    let pseudo_inverse = gram
        .try_inverse()
        .expect("Vandermonde Gram matrix is singular for the requested window/order")
        * vandermonde.transpose();

    // Row 0 of the pseudo-inverse gives the weights for estimating the
    // polynomial's constant term, i.e. its value at offset 0 (the centre).
    (0..window_len).map(|col| pseudo_inverse[(0, col)]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_window_is_unchanged() {
        let r = Rotation::from_axis_angle(Vector3::new(0.0, 0.0, 1.0), 0.3);
        let filter = RotationFilter::new(3, 2);
        let window = vec![r; filter.window_len()];
        let smoothed = filter.filter_centre(&window);
        assert!((smoothed.matrix() - r.matrix()).norm() < 1e-9);
    }

    #[test]
    fn filtering_always_yields_a_valid_rotation() {
        let filter = RotationFilter::new(2, 1);
        let window: Vec<Rotation> = (0..filter.window_len())
            .map(|i| Rotation::from_axis_angle(Vector3::new(0.0, 1.0, 0.0), 0.05 * i as f64))
            .collect();
        let smoothed = filter.filter_centre(&window);
        assert!(smoothed.is_valid());
    }

    #[test]
    fn coefficients_sum_to_one() {
        // The centre-sample weights of any Savitzky-Golay filter reproduce
        // a constant input exactly, so they must sum to one.
        let coeffs = savitzky_golay_coefficients(4, 2);
        let sum: f64 = coeffs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }
}
