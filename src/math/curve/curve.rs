use crate::stitching::stitcherror::StitchError;

/// Evaluation surface shared by every reference-curve representation.
///
/// `shifted_value(x, x_offset, y_offset)` evaluates the curve translated by
/// `(x_offset, y_offset)`, i.e. at `x - x_offset`, with `y_offset` added.
/// Implementations decide how the offset interacts with extrapolation.
pub trait Curve {
    fn value(&self, x: f64) -> f64 {
        self.shifted_value(x, 0.0, 0.0)
    }

    fn shifted_value(&self, x: f64, x_offset: f64, y_offset: f64) -> f64;

    /// N query positions against one fixed offset.
    fn shifted_values(&self, xs: &[f64], x_offset: f64, y_offset: f64) -> Vec<f64> {
        xs.iter()
            .map(|&x| self.shifted_value(x, x_offset, y_offset))
            .collect()
    }

    /// N independent `(x, x_offset, y_offset)` triples.
    fn lockstep_values(
        &self,
        xs: &[f64],
        x_offsets: &[f64],
        y_offsets: &[f64],
    ) -> Result<Vec<f64>, StitchError> {
        if xs.len() != x_offsets.len() || xs.len() != y_offsets.len() {
            return Err(StitchError::LockstepLengthMismatch {
                queries: xs.len(),
                x_offsets: x_offsets.len(),
                y_offsets: y_offsets.len(),
            });
        }
        Ok(xs.iter()
            .zip(x_offsets.iter().zip(y_offsets.iter()))
            .map(|(&x, (&x_offset, &y_offset))| self.shifted_value(x, x_offset, y_offset))
            .collect())
    }
}
