use crate::math::curve::curve::Curve;
use crate::segment::segment::{
    Segment,
    X_EPSILON
};
use crate::stitching::stitcherror::StitchError;

// ─────────────────────────────────────────────
// PiecewiseLinear
// ─────────────────────────────────────────────
//
// Linear reconstruction between samples, flat outside the sampled domain:
//
//   x' = x - x_offset
//   x' <  x[0]     → y[0]            (no y_offset)
//   x' >  x[n-1]   → y[n-1]          (no y_offset)
//   x' == x[i]     → y[i] + y_offset
//   otherwise      → y[i-1] + (y[i]-y[i-1])·(x'-x[i-1])/(x[i]-x[i-1]) + y_offset
//
// where i is the first index ≥ 1 with x[i] ≥ x'.

pub struct PiecewiseLinear<'a> {
    x_data: &'a [f64],
    y_data: &'a [f64],
}

impl<'a> PiecewiseLinear<'a> {
    pub fn new(segment: &'a Segment) -> Result<PiecewiseLinear<'a>, StitchError> {
        if segment.is_empty() {
            return Err(StitchError::EmptySegment);
        }
        Ok(PiecewiseLinear {
            x_data: segment.x(),
            y_data: segment.y(),
        })
    }

    /// Index of the right bracketing sample for `x`, searched from 1.
    fn bracket(&self, x: f64) -> usize {
        1 + self.x_data[1..].partition_point(|&xi| xi < x)
    }
}

impl Curve for PiecewiseLinear<'_> {
    fn shifted_value(&self, x: f64, x_offset: f64, y_offset: f64) -> f64 {
        let x = x - x_offset;
        let last = self.x_data.len() - 1;
        if x < self.x_data[0] {
            return self.y_data[0];
        }
        if x > self.x_data[last] {
            return self.y_data[last];
        }
        if last == 0 {
            return self.y_data[0] + y_offset;
        }

        let index = self.bracket(x);
        let (lhs_x, rhs_x) = (self.x_data[index - 1], self.x_data[index]);
        let (lhs_y, rhs_y) = (self.y_data[index - 1], self.y_data[index]);
        if x == rhs_x || rhs_x - lhs_x <= X_EPSILON {
            return rhs_y + y_offset;
        }
        if x == lhs_x {
            return lhs_y + y_offset;
        }
        lhs_y + (rhs_y - lhs_y) * (x - lhs_x) / (rhs_x - lhs_x) + y_offset
    }
}
