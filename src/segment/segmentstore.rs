use std::collections::BTreeMap;
use std::fmt;

use log::debug;
use serde::{
    Deserialize,
    Serialize
};

use crate::segment::segment::Segment;
use crate::stitching::stitcherror::StitchError;

/// Identifier handed out on insertion. Increases with every insertion and is
/// never reused, so a larger id always means a more recent segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SegmentId(u64);

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Superseded {
    pub id: SegmentId,
    /// Store position the segment occupied when it was removed.
    pub position: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Insertion {
    id: Option<SegmentId>,
    superseded: Vec<Superseded>,
}

impl Insertion {
    /// `None` when the added segment was empty and nothing was stored.
    pub fn id(&self) -> Option<SegmentId> {
        self.id
    }

    /// Removed segments, highest store position first.
    pub fn superseded(&self) -> &[Superseded] {
        &self.superseded
    }
}

/// Pending (not yet stitched) segments.
///
/// Segments live in an arena keyed by [`SegmentId`]; `order` is the store
/// order, insertion order until [`SegmentStore::sort_by_leading_x`] rebuilds it.
pub struct SegmentStore {
    slots: BTreeMap<SegmentId, Segment>,
    order: Vec<SegmentId>,
    next_id: u64,
    overlap_tolerance: f64,
}

impl SegmentStore {
    pub fn new(overlap_tolerance: f64) -> SegmentStore {
        SegmentStore {
            slots: BTreeMap::new(),
            order: Vec::new(),
            next_id: 0,
            overlap_tolerance,
        }
    }

    /// Stores `segment`, first dropping every pending segment it is redundant
    /// with. Empty segments are ignored.
    pub fn add(&mut self, segment: Segment) -> Insertion {
        if segment.is_empty() {
            return Insertion::default();
        }
        let id = SegmentId(self.next_id);
        self.next_id += 1;

        let mut superseded = Vec::new();
        for position in (0..self.order.len()).rev() {
            let old_id = self.order[position];
            let redundant = self
                .slots
                .get(&old_id)
                .is_some_and(|old| old.is_redundant_with(&segment, self.overlap_tolerance));
            if redundant {
                debug!("segment {} supersedes {} at position {}", id, old_id, position);
                self.order.remove(position);
                self.slots.remove(&old_id);
                superseded.push(Superseded { id: old_id, position });
            }
        }

        self.slots.insert(id, segment);
        self.order.push(id);
        Insertion { id: Some(id), superseded }
    }

    pub fn remove(&mut self, id: SegmentId) -> Result<Segment, StitchError> {
        let segment = self.slots.remove(&id).ok_or(StitchError::SegmentNotFound(id))?;
        self.order.retain(|&other| other != id);
        debug!("removed segment {}", id);
        Ok(segment)
    }

    pub fn get(&self, id: SegmentId) -> Option<&Segment> {
        self.slots.get(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn most_recent_id(&self) -> Option<SegmentId> {
        self.order.iter().max().copied()
    }

    /// Store position of the most recently added segment.
    pub fn most_recent_index(&self) -> Option<usize> {
        let id = self.most_recent_id()?;
        self.position(id)
    }

    pub fn position(&self, id: SegmentId) -> Option<usize> {
        self.order.iter().position(|&other| other == id)
    }

    /// Stable sort of the store order by [`Segment::stitching_order`].
    pub fn sort_by_leading_x(&mut self) {
        let mut entries: Vec<(SegmentId, &Segment)> = self
            .order
            .iter()
            .filter_map(|id| self.slots.get(id).map(|segment| (*id, segment)))
            .collect();
        entries.sort_by(|lhs, rhs| lhs.1.stitching_order(rhs.1));
        self.order = entries.into_iter().map(|(id, _)| id).collect();
    }

    /// Segments in store order.
    pub fn iter(&self) -> impl Iterator<Item = (SegmentId, &Segment)> + '_ {
        self.order
            .iter()
            .filter_map(|id| self.slots.get(id).map(|segment| (*id, segment)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(start: f64, end: f64) -> Segment {
        let n = 11;
        let step = (end - start) / (n - 1) as f64;
        let x: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
        let y = x.iter().map(|x| x * 0.5).collect();
        Segment::new(x, y).unwrap()
    }

    #[test]
    fn identical_add_supersedes() {
        let mut store = SegmentStore::new(1.0);
        let first = store.add(ramp(0.0, 10.0));
        let second = store.add(ramp(0.0, 10.0));
        assert_eq!(store.len(), 1);
        assert_eq!(second.superseded(), &[Superseded { id: first.id().unwrap(), position: 0 }]);
        assert_eq!(store.most_recent_id(), second.id());
    }

    #[test]
    fn partial_overlap_keeps_both() {
        let mut store = SegmentStore::new(1.0);
        store.add(ramp(0.0, 10.0));
        let insertion = store.add(ramp(8.0, 18.0));
        assert!(insertion.superseded().is_empty());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn superseded_positions_are_reported_highest_first() {
        let mut store = SegmentStore::new(1.0);
        store.add(ramp(0.0, 4.0));
        store.add(ramp(20.0, 30.0));
        store.add(ramp(5.0, 9.0));
        let insertion = store.add(ramp(0.0, 10.0));
        let positions: Vec<usize> = insertion.superseded().iter().map(|s| s.position).collect();
        assert_eq!(positions, vec![2, 0]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn empty_segment_is_ignored() {
        let mut store = SegmentStore::new(1.0);
        let insertion = store.add(Segment::default());
        assert_eq!(insertion.id(), None);
        assert!(store.is_empty());
        assert_eq!(store.most_recent_index(), None);
    }

    #[test]
    fn ids_are_never_reused() {
        let mut store = SegmentStore::new(1.0);
        let a = store.add(ramp(0.0, 10.0)).id().unwrap();
        let b = store.add(ramp(20.0, 30.0)).id().unwrap();
        store.remove(a).unwrap();
        let c = store.add(ramp(40.0, 50.0)).id().unwrap();
        assert!(c > b);
        assert_eq!(store.get(b).map(|s| s.first_x()), Some(Some(20.0)));
        assert!(matches!(store.remove(a), Err(StitchError::SegmentNotFound(id)) if id == a));
    }

    #[test]
    fn sort_orders_by_leading_x_and_tracks_most_recent() {
        let mut store = SegmentStore::new(1.0);
        store.add(ramp(40.0, 50.0));
        store.add(ramp(0.0, 10.0));
        let newest = store.add(ramp(20.0, 30.0)).id().unwrap();
        assert_eq!(store.most_recent_index(), Some(2));
        store.sort_by_leading_x();
        let leading: Vec<f64> = store.iter().filter_map(|(_, s)| s.first_x()).collect();
        assert_eq!(leading, vec![0.0, 20.0, 40.0]);
        assert_eq!(store.most_recent_index(), Some(1));
        assert_eq!(store.position(newest), Some(1));
    }
}
