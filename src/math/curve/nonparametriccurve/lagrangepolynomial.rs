use crate::math::curve::curve::Curve;
use crate::segment::segment::Segment;
use crate::stitching::stitcherror::StitchError;

// ─────────────────────────────────────────────────────────────────────────────
// LagrangePolynomial - Barycentric Form (2nd kind)
// ─────────────────────────────────────────────────────────────────────────────
//
//   L(x) = Σ w_i·y_i/(x-x_i) / Σ w_i/(x-x_i)
//
// with barycentric weights
//
//   w_i = 1 / Π_{j≠i} (x_i - x_j)
//
// Global interpolation through every sample: O(n²) to build, O(n) per value.
// Beyond ~10 samples Runge oscillation dominates. At a sample the value is y_i
// exactly, so both modes agree on the samples themselves.

pub struct LagrangePolynomial {
    x_data: Vec<f64>,
    y_data: Vec<f64>,
    weights: Vec<f64>,
}

impl LagrangePolynomial {
    pub fn new(segment: &Segment) -> Result<LagrangePolynomial, StitchError> {
        if segment.is_empty() {
            return Err(StitchError::EmptySegment);
        }
        let x_data = segment.x().to_vec();
        let y_data = segment.y().to_vec();
        if let Some(pair) = x_data.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(StitchError::DuplicateAbscissa { value: pair[0] });
        }
        let weights = Self::compute_barycentric_weights(&x_data);
        Ok(LagrangePolynomial { x_data, y_data, weights })
    }

    fn compute_barycentric_weights(x_data: &[f64]) -> Vec<f64> {
        let n = x_data.len();
        let mut weights = vec![1.0; n];

        for i in 0..n {
            for j in 0..n {
                if i != j {
                    weights[i] /= x_data[i] - x_data[j];
                }
            }
        }

        weights
    }

    fn value_barycentric(&self, x: f64) -> f64 {
        // On a sample: return it directly, the formula would be 0/0.
        if let Some(i) = self.x_data.iter().position(|&xi| xi == x) {
            return self.y_data[i];
        }

        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for ((&xi, &yi), &wi) in self.x_data.iter().zip(&self.y_data).zip(&self.weights) {
            let temp = wi / (x - xi);
            numerator += temp * yi;
            denominator += temp;
        }

        numerator / denominator
    }
}

impl Curve for LagrangePolynomial {
    fn shifted_value(&self, x: f64, x_offset: f64, y_offset: f64) -> f64 {
        self.value_barycentric(x - x_offset) + y_offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::curve::nonparametriccurve::piecewiselinear::PiecewiseLinear;

    #[test]
    fn matches_linear_on_samples() {
        let segment = Segment::new(vec![0.0, 1.0, 2.5, 4.0], vec![1.0, -2.0, 0.5, 3.0]).unwrap();
        let lagrange = LagrangePolynomial::new(&segment).unwrap();
        let linear = PiecewiseLinear::new(&segment).unwrap();
        for &x in segment.x() {
            assert_eq!(lagrange.value(x), linear.value(x));
        }
    }

    #[test]
    fn reproduces_a_quadratic() {
        let xs = vec![0.0, 1.0, 3.0];
        let ys: Vec<f64> = xs.iter().map(|x| x * x - 2.0 * x + 1.0).collect();
        let segment = Segment::new(xs, ys).unwrap();
        let lagrange = LagrangePolynomial::new(&segment).unwrap();
        assert!((lagrange.value(2.0) - 1.0).abs() < 1e-12);
        assert!((lagrange.shifted_value(2.5, 0.5, 1.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_repeated_x() {
        let segment = Segment::new(vec![0.0, 1.0, 1.0], vec![0.0, 1.0, 2.0]).unwrap();
        assert!(matches!(
            LagrangePolynomial::new(&segment),
            Err(StitchError::DuplicateAbscissa { .. })
        ));
    }
}
