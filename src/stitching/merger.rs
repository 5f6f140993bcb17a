use log::debug;

use crate::configuration::Configuration;
use crate::math::curve::curve::Curve;
use crate::math::curve::segmentfunction::SegmentFunction;
use crate::segment::segment::Segment;
use crate::stitching::fitresult::FitResult;
use crate::stitching::offsetfitter::OffsetFitter;
use crate::stitching::stitcherror::StitchError;

/// A merged series and the fit that positioned the added segment.
#[derive(Clone, Debug, PartialEq)]
pub struct Merge {
    merged: Segment,
    fit: FitResult,
}

impl Merge {
    pub fn merged(&self) -> &Segment {
        &self.merged
    }

    pub fn fit(&self) -> FitResult {
        self.fit
    }

    pub fn into_parts(self) -> (Segment, FitResult) {
        (self.merged, self.fit)
    }
}

/// Folds one segment into a conglomerate.
///
/// The added segment is the reference: the conglomerate's samples from the
/// start of the overlap on are fitted against it, giving the offset that moves
/// the added segment onto the conglomerate. The merged series then keeps the
/// conglomerate left of the (shifted) overlap, averages the conglomerate with
/// the shifted segment inside it, and appends the shifted segment's samples
/// that lie right of the conglomerate's end.
pub struct Merger<'c> {
    configuration: &'c Configuration,
}

impl<'c> Merger<'c> {
    pub fn new(configuration: &'c Configuration) -> Merger<'c> {
        Merger { configuration }
    }

    pub fn stitch(&self, conglomerate: &Segment, added: &Segment) -> Result<Merge, StitchError> {
        let (Some(added_first), false) = (added.first_x(), conglomerate.is_empty()) else {
            let merged = if added.is_empty() { conglomerate.clone() } else { added.clone() };
            return Ok(Merge { merged, fit: FitResult::zero() });
        };

        let start_overlap = first_at_or_after(conglomerate.x(), added_first);
        let fit = if start_overlap < conglomerate.len() {
            OffsetFitter::new(self.configuration).fit_offset(
                added,
                conglomerate,
                start_overlap,
                self.configuration.pixel_size,
            )?
        } else {
            FitResult::zero()
        };
        self.merge_at_offset(conglomerate, added, fit)
    }

    /// Merge step alone, with the added segment positioned by `fit`.
    pub fn merge_at_offset(
        &self,
        conglomerate: &Segment,
        added: &Segment,
        fit: FitResult,
    ) -> Result<Merge, StitchError> {
        let (Some(added_first), Some(conglomerate_last)) = (added.first_x(), conglomerate.last_x()) else {
            let merged = if added.is_empty() { conglomerate.clone() } else { added.clone() };
            return Ok(Merge { merged, fit });
        };
        let (x_offset, y_offset) = (fit.x_offset(), fit.y_offset());
        let start_overlap = first_at_or_after(conglomerate.x(), added_first + x_offset);
        let end_overlap = added.x().partition_point(|&x| x + x_offset <= conglomerate_last);

        let mut x_values = conglomerate.x().to_vec();
        x_values.extend(added.x()[end_overlap..].iter().map(|x| x + x_offset));

        let function = SegmentFunction::linear(added)?;
        let fitted = function.shifted_values(&x_values, x_offset, y_offset);
        let conglomerate_y = conglomerate.y();
        let y_values: Vec<f64> = fitted
            .iter()
            .enumerate()
            .map(|(i, &fitted_y)| {
                if i < start_overlap {
                    conglomerate_y[i]
                } else if i < conglomerate_y.len() {
                    (conglomerate_y[i] + fitted_y) / 2.0
                } else {
                    fitted_y
                }
            })
            .collect();

        debug!(
            "merged {} + {} samples into {} (overlap from {}, {} appended), fit {:?}",
            conglomerate.len(),
            added.len(),
            x_values.len(),
            start_overlap,
            added.len() - end_overlap,
            fit.as_triple()
        );
        Ok(Merge { merged: Segment::new(x_values, y_values)?, fit })
    }
}

fn first_at_or_after(x: &[f64], bound: f64) -> usize {
    x.partition_point(|&xi| xi < bound)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(x: &[f64], y: &[f64]) -> Segment {
        Segment::new(x.to_vec(), y.to_vec()).unwrap()
    }

    #[test]
    fn single_shared_sample_is_averaged() {
        let configuration = Configuration::default();
        let merger = Merger::new(&configuration);
        let a = segment(&[0.0, 1.0, 2.0], &[1.0, 2.0, 10.0]);
        let b = segment(&[2.0, 3.0, 4.0], &[14.0, 15.0, 16.0]);
        let merge = merger.merge_at_offset(&a, &b, FitResult::zero()).unwrap();
        assert_eq!(merge.merged().x(), &[0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(merge.merged().y(), &[1.0, 2.0, 12.0, 15.0, 16.0]);
    }

    #[test]
    fn disjoint_segments_are_concatenated_without_fit() {
        let configuration = Configuration::default();
        let merger = Merger::new(&configuration);
        let a = segment(&[0.0, 5.0, 10.0], &[1.0, 2.0, 3.0]);
        let b = segment(&[20.0, 25.0, 30.0], &[7.0, 8.0, 9.0]);
        let merge = merger.stitch(&a, &b).unwrap();
        assert_eq!(merge.fit(), FitResult::zero());
        assert_eq!(merge.merged().x(), &[0.0, 5.0, 10.0, 20.0, 25.0, 30.0]);
        assert_eq!(merge.merged().y(), &[1.0, 2.0, 3.0, 7.0, 8.0, 9.0]);
    }

    #[test]
    fn offset_moves_the_appended_tail() {
        let configuration = Configuration::default();
        let merger = Merger::new(&configuration);
        let a = segment(&[0.0, 1.0, 2.0], &[0.0, 0.0, 0.0]);
        let b = segment(&[1.5, 2.5, 3.5], &[4.0, 4.0, 4.0]);
        let merge = merger.merge_at_offset(&a, &b, FitResult::new(0.25, -4.0, 0.0)).unwrap();
        // Shifted b starts at 1.75: index 2 of a is averaged, 2.75 and 3.75 are appended.
        assert_eq!(merge.merged().x(), &[0.0, 1.0, 2.0, 2.75, 3.75]);
        assert_eq!(merge.merged().y(), &[0.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn merged_x_stays_ascending_with_negative_offset() {
        let configuration = Configuration::default();
        let merger = Merger::new(&configuration);
        let a = segment(&[0.0, 1.0, 2.0], &[0.0, 1.0, 2.0]);
        let b = segment(&[2.0, 2.2, 3.0], &[2.0, 2.2, 3.0]);
        let merge = merger.merge_at_offset(&a, &b, FitResult::new(-0.1, 0.0, 0.0)).unwrap();
        let expected = [0.0, 1.0, 2.0, 2.1, 2.9];
        assert_eq!(merge.merged().len(), expected.len());
        for (x, e) in merge.merged().x().iter().zip(expected.iter()) {
            assert!((x - e).abs() < 1e-12);
        }
        assert!(merge.merged().x().windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn empty_inputs_pass_through() {
        let configuration = Configuration::default();
        let merger = Merger::new(&configuration);
        let a = segment(&[0.0, 1.0], &[1.0, 1.0]);
        assert_eq!(merger.stitch(&a, &Segment::default()).unwrap().merged(), &a);
        assert_eq!(merger.stitch(&Segment::default(), &a).unwrap().merged(), &a);
    }
}
