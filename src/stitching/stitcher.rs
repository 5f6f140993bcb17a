use log::{
    debug,
    info
};
use serde::{
    Deserialize,
    Serialize
};

use crate::configuration::{
    validate_pixel_size,
    AggregatePoints,
    Configuration
};
use crate::math::curve::curve::Curve;
use crate::math::curve::nonparametriccurve::nonparametriccurve::{
    NonparametricCurve,
    Point2D
};
use crate::math::curve::segmentfunction::SegmentFunction;
use crate::segment::segment::Segment;
use crate::segment::segmentstore::{
    Insertion,
    SegmentId,
    SegmentStore
};
use crate::stitching::fitresult::FitResult;
use crate::stitching::merger::{
    Merge,
    Merger
};
use crate::stitching::offsetfitter::{
    chi_square,
    FitWindow
};
use crate::stitching::stitcherror::StitchError;

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum StitchState {
    /// The pending store changed since the last pass.
    Dirty,
    /// The report matches the pending store.
    Stitched,
}

/// One pending segment as positioned by the last pass: its trace shifted by
/// its fitted offset, and that fit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StitchedSegment {
    id: SegmentId,
    segment: Segment,
    fit: FitResult,
}

impl StitchedSegment {
    pub fn id(&self) -> SegmentId {
        self.id
    }

    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    pub fn fit(&self) -> FitResult {
        self.fit
    }
}

/// The composite curve. Its fit has zero offsets and the aggregate
/// chi-square of the pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conglomerate {
    segment: Segment,
    fit: FitResult,
}

impl Conglomerate {
    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    pub fn fit(&self) -> FitResult {
        self.fit
    }

    pub fn aggregate_chi_square(&self) -> f64 {
        self.fit.chi_square()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StitchReport {
    segments: Vec<StitchedSegment>,
    conglomerate: Conglomerate,
}

impl StitchReport {
    /// In stitching order.
    pub fn segments(&self) -> &[StitchedSegment] {
        &self.segments
    }

    pub fn conglomerate(&self) -> &Conglomerate {
        &self.conglomerate
    }
}

/// The stitching engine: pending segments plus the result of the last pass.
///
/// Every add or remove re-runs [`Stitcher::stitch_all`] before returning,
/// unless the add is batched; a batched add leaves the engine
/// [`StitchState::Dirty`] until the caller stitches.
pub struct Stitcher {
    configuration: Configuration,
    store: SegmentStore,
    state: StitchState,
    report: Option<StitchReport>,
}

impl Stitcher {
    pub fn new(configuration: Configuration) -> Result<Stitcher, StitchError> {
        configuration.validate()?;
        let store = SegmentStore::new(configuration.overlap_tolerance);
        Ok(Stitcher {
            configuration,
            store,
            state: StitchState::Stitched,
            report: None,
        })
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn store(&self) -> &SegmentStore {
        &self.store
    }

    pub fn state(&self) -> StitchState {
        self.state
    }

    /// Takes effect on the next pass.
    pub fn set_pixel_size(&mut self, pixel_size: f64) -> Result<(), StitchError> {
        validate_pixel_size(pixel_size)?;
        self.configuration.pixel_size = pixel_size;
        self.state = StitchState::Dirty;
        Ok(())
    }

    pub fn add_segment(&mut self, segment: Segment, batch: bool) -> Result<Insertion, StitchError> {
        let insertion = self.store.add(segment);
        if insertion.id().is_none() {
            return Ok(insertion);
        }
        self.state = StitchState::Dirty;
        if !batch {
            self.stitch_all()?;
        }
        Ok(insertion)
    }

    /// Batched adds followed by a single pass.
    pub fn add_segments<I>(&mut self, segments: I) -> Result<Vec<Insertion>, StitchError>
    where
        I: IntoIterator<Item = Segment>,
    {
        let mut insertions = Vec::new();
        for segment in segments {
            insertions.push(self.add_segment(segment, true)?);
        }
        self.stitch_all()?;
        Ok(insertions)
    }

    pub fn remove_segment(&mut self, id: SegmentId) -> Result<Segment, StitchError> {
        let segment = self.store.remove(id)?;
        self.state = StitchState::Dirty;
        self.stitch_all()?;
        Ok(segment)
    }

    pub fn most_recent_index(&self) -> Option<usize> {
        self.store.most_recent_index()
    }

    /// Rebuilds the report from scratch. With nothing pending the report is
    /// cleared.
    pub fn stitch_all(&mut self) -> Result<Option<&StitchReport>, StitchError> {
        self.store.sort_by_leading_x();
        let merger = Merger::new(&self.configuration);

        let mut segments = Vec::with_capacity(self.store.len());
        let mut conglomerate: Option<Segment> = None;
        for (id, segment) in self.store.iter() {
            let fit = match conglomerate.take() {
                None => {
                    conglomerate = Some(segment.clone());
                    FitResult::zero()
                }
                Some(current) => {
                    let (merged, fit) = merger.stitch(&current, segment)?.into_parts();
                    conglomerate = Some(merged);
                    fit
                }
            };
            debug!("segment {} placed with {:?}", id, fit.as_triple());
            segments.push(StitchedSegment {
                id,
                segment: segment.shifted(fit.x_offset(), fit.y_offset()),
                fit,
            });
        }

        let Some(conglomerate) = conglomerate else {
            self.report = None;
            self.state = StitchState::Stitched;
            return Ok(None);
        };

        let (x, y) = match self.configuration.aggregate_points {
            AggregatePoints::Raw => flatten(self.store.iter().map(|(_, segment)| segment)),
            AggregatePoints::Shifted => flatten(segments.iter().map(|entry| &entry.segment)),
        };
        let function = SegmentFunction::linear(&conglomerate)?;
        let aggregate = chi_square(&function, &FitWindow::from_samples(&x, &y)?, 0.0, 0.0);
        info!(
            "stitched {} segments into {} samples, aggregate chi-square {:e}",
            segments.len(),
            conglomerate.len(),
            aggregate
        );

        self.report = Some(StitchReport {
            segments,
            conglomerate: Conglomerate {
                segment: conglomerate,
                fit: FitResult::new(0.0, 0.0, aggregate),
            },
        });
        self.state = StitchState::Stitched;
        Ok(self.report.as_ref())
    }

    pub fn report(&self) -> Option<&StitchReport> {
        self.report.as_ref()
    }

    pub fn stitched_segments(&self) -> &[StitchedSegment] {
        match &self.report {
            Some(report) => report.segments(),
            None => &[],
        }
    }

    pub fn conglomerate(&self) -> Option<&Conglomerate> {
        self.report.as_ref().map(|report| report.conglomerate())
    }

    /// Point cloud behind the aggregate chi-square: pending segments as added,
    /// or the last pass's shifted traces, per the configuration.
    pub fn collected_points(&self) -> Vec<Point2D> {
        match self.configuration.aggregate_points {
            AggregatePoints::Raw => self.store.iter().flat_map(|(_, segment)| segment.points()).collect(),
            AggregatePoints::Shifted => self
                .stitched_segments()
                .iter()
                .flat_map(|entry| entry.segment.points())
                .collect(),
        }
    }

    /// Merges pending segment `added` onto pending segment `base` without
    /// touching the store or the report.
    pub fn stitch_pair(&self, base: SegmentId, added: SegmentId) -> Result<Merge, StitchError> {
        let base_segment = self.store.get(base).ok_or(StitchError::SegmentNotFound(base))?;
        let added_segment = self.store.get(added).ok_or(StitchError::SegmentNotFound(added))?;
        Merger::new(&self.configuration).stitch(base_segment, added_segment)
    }

    /// Linear resampling of the current conglomerate.
    pub fn evaluate_conglomerate(&self, xs: &[f64], x_offset: f64, y_offset: f64) -> Result<Vec<f64>, StitchError> {
        let conglomerate = self.conglomerate().ok_or(StitchError::EmptySegment)?;
        let function = SegmentFunction::linear(conglomerate.segment())?;
        Ok(function.shifted_values(xs, x_offset, y_offset))
    }
}

fn flatten<'a, I>(segments: I) -> (Vec<f64>, Vec<f64>)
where
    I: Iterator<Item = &'a Segment>,
{
    let mut x = Vec::new();
    let mut y = Vec::new();
    for segment in segments {
        x.extend_from_slice(segment.x());
        y.extend_from_slice(segment.y());
    }
    (x, y)
}

/// A comparison curve laid over a reference.
#[derive(Clone, Debug, PartialEq)]
pub struct AlignedComparison {
    fit: FitResult,
    aligned: Segment,
}

impl AlignedComparison {
    pub fn fit(&self) -> FitResult {
        self.fit
    }

    /// The kept comparison samples, shifted by the fit.
    pub fn aligned(&self) -> &Segment {
        &self.aligned
    }

    pub fn resample(&self, xs: &[f64], x_offset: f64, y_offset: f64) -> Result<Vec<f64>, StitchError> {
        let function = SegmentFunction::linear(&self.aligned)?;
        Ok(function.shifted_values(xs, x_offset, y_offset))
    }
}

/// Fits `comparison` onto `reference` the way a new segment is folded into a
/// conglomerate. Comparison samples at or left of the reference's first x are
/// dropped first, since merging only moves data on the right.
pub fn align_comparison(
    reference: &Segment,
    comparison: &Segment,
    configuration: &Configuration,
) -> Result<AlignedComparison, StitchError> {
    let reference_first = reference.first_x().ok_or(StitchError::EmptySegment)?;
    let keep_from = comparison.x().partition_point(|&x| x <= reference_first);
    let trimmed = Segment::new(
        comparison.x()[keep_from..].to_vec(),
        comparison.y()[keep_from..].to_vec(),
    )?;
    if trimmed.is_empty() {
        return Ok(AlignedComparison { fit: FitResult::zero(), aligned: trimmed });
    }
    let fit = Merger::new(configuration).stitch(reference, &trimmed)?.fit();
    Ok(AlignedComparison {
        fit,
        aligned: trimmed.shifted(fit.x_offset(), fit.y_offset()),
    })
}
