use std::cmp::Ordering;

use serde::{
    Deserialize,
    Serialize
};

use crate::math::curve::nonparametriccurve::nonparametriccurve::{
    NonparametricCurve,
    Point2D
};
use crate::stitching::stitcherror::StitchError;

/// x samples closer than this are treated as the same position.
pub const X_EPSILON: f64 = 1e-9;

#[derive(Deserialize)]
struct SegmentJsonProp {
    x: Vec<f64>,
    y: Vec<f64>
}

impl TryFrom<SegmentJsonProp> for Segment {
    type Error = StitchError;

    fn try_from(prop: SegmentJsonProp) -> Result<Segment, StitchError> {
        Segment::new(prop.x, prop.y)
    }
}

/// One measured trace: ascending x samples and their y values.
///
/// Construction validates the trace, so every `Segment` in circulation has
/// equal-length, finite samples with non-decreasing x (ties within
/// [`X_EPSILON`] are allowed).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SegmentJsonProp")]
pub struct Segment {
    x: Vec<f64>,
    y: Vec<f64>
}

impl Segment {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Segment, StitchError> {
        validate_samples(&x, &y)?;
        Ok(Segment { x, y })
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn first_x(&self) -> Option<f64> {
        self.x.first().copied()
    }

    pub fn last_x(&self) -> Option<f64> {
        self.x.last().copied()
    }

    /// The same trace translated by `(x_offset, y_offset)`.
    pub fn shifted(&self, x_offset: f64, y_offset: f64) -> Segment {
        Segment {
            x: self.x.iter().map(|x| x + x_offset).collect(),
            y: self.y.iter().map(|y| y + y_offset).collect()
        }
    }

    /// Containment test used to decide that a new scan replaces an old one.
    ///
    /// True when either segment's x-range contains the other's, with both
    /// boundaries allowed to miss by up to `tolerance`. Partial overlaps that
    /// extend past the tolerance on one side are not redundant.
    pub fn is_redundant_with(&self, other: &Segment, tolerance: f64) -> bool {
        let (Some(lhs_first), Some(lhs_last), Some(rhs_first), Some(rhs_last)) =
            (self.first_x(), self.last_x(), other.first_x(), other.last_x())
        else {
            return false;
        };
        let self_covers_other = lhs_first - rhs_first < tolerance
            && lhs_last - rhs_last > -tolerance;
        let other_covers_self = rhs_first - lhs_first < tolerance
            && rhs_last - lhs_last > -tolerance;
        self_covers_other || other_covers_self
    }

    /// Stitching order: leading x sample first, then the full x sequence, then
    /// the full y sequence. Empty segments sort first.
    pub fn stitching_order(&self, other: &Segment) -> Ordering {
        let leading = match (self.first_x(), other.first_x()) {
            (Some(lhs), Some(rhs)) => lhs.total_cmp(&rhs),
            (lhs, rhs) => lhs.is_some().cmp(&rhs.is_some())
        };
        leading
            .then_with(|| compare_samples(&self.x, &other.x))
            .then_with(|| compare_samples(&self.y, &other.y))
    }
}

impl NonparametricCurve for Segment {
    fn points(&self) -> Vec<Point2D> {
        self.x
            .iter()
            .zip(self.y.iter())
            .map(|(&x, &y)| Point2D::new(x, y))
            .collect()
    }
}

fn compare_samples(lhs: &[f64], rhs: &[f64]) -> Ordering {
    lhs.iter()
        .zip(rhs.iter())
        .map(|(a, b)| a.total_cmp(b))
        .find(|ordering| ordering.is_ne())
        .unwrap_or_else(|| lhs.len().cmp(&rhs.len()))
}

fn validate_samples(x: &[f64], y: &[f64]) -> Result<(), StitchError> {
    if x.len() != y.len() {
        return Err(StitchError::LengthMismatch { x_len: x.len(), y_len: y.len() });
    }
    for (index, (xi, yi)) in x.iter().zip(y.iter()).enumerate() {
        if !xi.is_finite() || !yi.is_finite() {
            return Err(StitchError::NonFinite { index });
        }
    }
    for index in 1..x.len() {
        if x[index] < x[index - 1] - X_EPSILON {
            return Err(StitchError::NonMonotonic {
                index,
                previous: x[index - 1],
                current: x[index]
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(x: &[f64], y: &[f64]) -> Segment {
        Segment::new(x.to_vec(), y.to_vec()).unwrap()
    }

    #[test]
    fn rejects_length_mismatch() {
        let err = Segment::new(vec![0.0, 1.0], vec![1.0]).unwrap_err();
        assert!(matches!(err, StitchError::LengthMismatch { x_len: 2, y_len: 1 }));
    }

    #[test]
    fn rejects_descending_x() {
        let err = Segment::new(vec![0.0, 2.0, 1.0], vec![0.0; 3]).unwrap_err();
        assert!(matches!(err, StitchError::NonMonotonic { index: 2, .. }));
    }

    #[test]
    fn accepts_near_ties() {
        assert!(Segment::new(vec![0.0, 1.0, 1.0 - 1e-12], vec![0.0; 3]).is_ok());
    }

    #[test]
    fn rejects_nan() {
        let err = Segment::new(vec![0.0, f64::NAN], vec![0.0; 2]).unwrap_err();
        assert!(matches!(err, StitchError::NonFinite { index: 1 }));
    }

    #[test]
    fn deserialization_validates() {
        let ok: Segment = serde_json::from_str(r#"{"x":[0,1],"y":[3,4]}"#).unwrap();
        assert_eq!(ok.y(), &[3.0, 4.0]);
        assert!(serde_json::from_str::<Segment>(r#"{"x":[0,1],"y":[3]}"#).is_err());
    }

    #[test]
    fn redundancy_is_tolerant_containment() {
        let wide = segment(&[0.0, 5.0, 10.0], &[0.0; 3]);
        let inner = segment(&[2.0, 8.0], &[0.0; 2]);
        let near_duplicate = segment(&[0.5, 10.5], &[0.0; 2]);
        let partial = segment(&[5.0, 20.0], &[0.0; 2]);
        assert!(wide.is_redundant_with(&inner, 1.0));
        assert!(inner.is_redundant_with(&wide, 1.0));
        assert!(wide.is_redundant_with(&near_duplicate, 1.0));
        assert!(!wide.is_redundant_with(&partial, 1.0));
        assert!(!wide.is_redundant_with(&Segment::default(), 1.0));
    }

    #[test]
    fn stitching_order_uses_leading_x_then_content() {
        let a = segment(&[0.0, 1.0], &[5.0, 5.0]);
        let b = segment(&[0.0, 1.0], &[6.0, 5.0]);
        let c = segment(&[0.0, 2.0], &[0.0, 0.0]);
        let d = segment(&[-1.0, 3.0], &[9.0, 9.0]);
        assert_eq!(d.stitching_order(&a), Ordering::Less);
        assert_eq!(a.stitching_order(&b), Ordering::Less);
        assert_eq!(a.stitching_order(&c), Ordering::Less);
        assert_eq!(a.stitching_order(&a.clone()), Ordering::Equal);
    }

    #[test]
    fn shifted_translates_every_sample() {
        let shifted = segment(&[0.0, 1.0], &[2.0, 3.0]).shifted(0.5, -1.0);
        assert_eq!(shifted.x(), &[0.5, 1.5]);
        assert_eq!(shifted.y(), &[1.0, 2.0]);
    }
}
