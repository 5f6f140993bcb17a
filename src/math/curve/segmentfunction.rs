use log::debug;
use serde::{
    Deserialize,
    Serialize
};

use crate::math::curve::curve::Curve;
use crate::math::curve::nonparametriccurve::lagrangepolynomial::LagrangePolynomial;
use crate::math::curve::nonparametriccurve::piecewiselinear::PiecewiseLinear;
use crate::segment::segment::Segment;
use crate::stitching::stitcherror::StitchError;

/// Longest reference the Lagrange mode interpolates globally. Longer
/// references are fitted through the linear interpolant.
pub const LAGRANGE_MAX_SAMPLES: usize = 12;

#[derive(PartialEq, Eq, Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationMode {
    #[default]
    Linear,
    /// Experimental: global polynomial through every sample of a fit
    /// reference of at most [`LAGRANGE_MAX_SAMPLES`] samples. Merging and the
    /// aggregate chi-square stay linear.
    Lagrange,
}

/// The reference segment selected for one fit or merge.
///
/// A value, not a register: every fitting and merging call receives the
/// function it should evaluate against, so two operations never share a
/// selection.
pub enum SegmentFunction<'a> {
    Linear(PiecewiseLinear<'a>),
    Lagrange(LagrangePolynomial),
}

impl<'a> SegmentFunction<'a> {
    pub fn select(segment: &'a Segment, mode: InterpolationMode) -> Result<SegmentFunction<'a>, StitchError> {
        match mode {
            InterpolationMode::Lagrange if segment.len() <= LAGRANGE_MAX_SAMPLES => {
                Ok(SegmentFunction::Lagrange(LagrangePolynomial::new(segment)?))
            }
            InterpolationMode::Lagrange => {
                debug!(
                    "reference of {} samples exceeds {} for lagrange interpolation, using linear",
                    segment.len(),
                    LAGRANGE_MAX_SAMPLES
                );
                Ok(SegmentFunction::Linear(PiecewiseLinear::new(segment)?))
            }
            InterpolationMode::Linear => Ok(SegmentFunction::Linear(PiecewiseLinear::new(segment)?)),
        }
    }

    pub fn linear(segment: &'a Segment) -> Result<SegmentFunction<'a>, StitchError> {
        Self::select(segment, InterpolationMode::Linear)
    }
}

impl Curve for SegmentFunction<'_> {
    fn shifted_value(&self, x: f64, x_offset: f64, y_offset: f64) -> f64 {
        match self {
            SegmentFunction::Linear(curve) => curve.shifted_value(x, x_offset, y_offset),
            SegmentFunction::Lagrange(curve) => curve.shifted_value(x, x_offset, y_offset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parses_from_snake_case() {
        let mode: InterpolationMode = serde_json::from_str("\"lagrange\"").unwrap();
        assert_eq!(mode, InterpolationMode::Lagrange);
        assert_eq!(InterpolationMode::default(), InterpolationMode::Linear);
    }

    #[test]
    fn both_modes_agree_on_samples() {
        let segment = Segment::new(vec![0.0, 1.0, 2.0], vec![5.0, 6.0, 9.0]).unwrap();
        let linear = SegmentFunction::linear(&segment).unwrap();
        let lagrange = SegmentFunction::select(&segment, InterpolationMode::Lagrange).unwrap();
        for &x in segment.x() {
            assert_eq!(linear.shifted_value(x, 0.0, 1.5), lagrange.shifted_value(x, 0.0, 1.5));
        }
    }

    #[test]
    fn long_references_fall_back_to_linear() {
        let x: Vec<f64> = (0..=LAGRANGE_MAX_SAMPLES).map(|i| i as f64).collect();
        let y = x.iter().map(|x| x.sin()).collect();
        let long = Segment::new(x, y).unwrap();
        assert!(matches!(
            SegmentFunction::select(&long, InterpolationMode::Lagrange).unwrap(),
            SegmentFunction::Linear(_)
        ));
        let short = Segment::new(long.x()[..LAGRANGE_MAX_SAMPLES].to_vec(), long.y()[..LAGRANGE_MAX_SAMPLES].to_vec())
            .unwrap();
        assert!(matches!(
            SegmentFunction::select(&short, InterpolationMode::Lagrange).unwrap(),
            SegmentFunction::Lagrange(_)
        ));
    }
}
