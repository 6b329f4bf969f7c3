use std::collections::HashMap;
use std::ops::Index;

use crate::core::RevId;
use crate::layout::row::{ColorIdx, LaneIdx};

/// One open lane: a revision the traversal still owes us, and the color
/// its line is drawn with until it arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenLane {
    pub rev: RevId,
    pub color: ColorIdx,
}

/// Ordered set of open lanes between two rows.
///
/// A frontier is a value: every row derives the next frontier from the
/// previous one with [`Frontier::appended`] or [`Frontier::spliced`]
/// and replaces it wholesale. A revision appears in at most one lane,
/// so lane lookup by revision is backed by a map rather than a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frontier {
    open: Vec<OpenLane>,
    lanes: HashMap<RevId, LaneIdx>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    fn rebuilt(open: Vec<OpenLane>) -> Self {
        let lanes = open
            .iter()
            .enumerate()
            .map(|(idx, lane)| (lane.rev, idx))
            .collect();
        Self { open, lanes }
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    /// Column the given revision is awaited in, if any.
    pub fn lane_of(&self, rev: RevId) -> Option<LaneIdx> {
        self.lanes.get(&rev).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OpenLane> {
        self.open.iter()
    }

    pub fn open_lanes(&self) -> &[OpenLane] {
        &self.open
    }

    /// New frontier with one more lane on the right edge.
    pub fn appended(&self, lane: OpenLane) -> Frontier {
        let mut open = self.open.clone();
        open.push(lane);
        Self::rebuilt(open)
    }

    /// New frontier with the lane at `at` replaced in place by
    /// `replacement`. Lanes to the left keep their columns; lanes to
    /// the right shift by the size difference. An empty replacement
    /// closes the lane.
    pub fn spliced(&self, at: LaneIdx, replacement: &[OpenLane]) -> Frontier {
        debug_assert!(at < self.open.len(), "spliced lane {at} out of range");
        let mut open = Vec::with_capacity(self.open.len() + replacement.len());
        open.extend_from_slice(&self.open[..at]);
        open.extend_from_slice(replacement);
        open.extend_from_slice(&self.open[at + 1..]);
        Self::rebuilt(open)
    }
}

impl Index<LaneIdx> for Frontier {
    type Output = OpenLane;

    fn index(&self, lane: LaneIdx) -> &OpenLane {
        &self.open[lane]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lane(rev: u32, color: ColorIdx) -> OpenLane {
        OpenLane {
            rev: RevId(rev),
            color,
        }
    }

    #[test]
    fn test_append_assigns_rightmost_lane() {
        let frontier = Frontier::new().appended(lane(3, 0)).appended(lane(1, 1));
        assert_eq!(frontier.len(), 2);
        assert_eq!(frontier.lane_of(RevId(3)), Some(0));
        assert_eq!(frontier.lane_of(RevId(1)), Some(1));
        assert_eq!(frontier.lane_of(RevId(9)), None);
    }

    #[test]
    fn test_splice_replaces_in_place() {
        let frontier = Frontier::new().appended(lane(5, 0)).appended(lane(4, 1));
        let next = frontier.spliced(0, &[lane(3, 0), lane(2, 2)]);
        assert_eq!(next.len(), 3);
        assert_eq!(next.lane_of(RevId(3)), Some(0));
        assert_eq!(next.lane_of(RevId(2)), Some(1));
        // The untouched lane shifts right by one.
        assert_eq!(next.lane_of(RevId(4)), Some(2));
        assert_eq!(next[2].color, 1);
    }

    #[test]
    fn test_splice_empty_closes_lane() {
        let frontier = Frontier::new().appended(lane(5, 0)).appended(lane(4, 1));
        let next = frontier.spliced(0, &[]);
        assert_eq!(next.len(), 1);
        assert_eq!(next.lane_of(RevId(5)), None);
        assert_eq!(next.lane_of(RevId(4)), Some(0));
    }

    #[test]
    fn test_original_is_untouched_by_derivation() {
        let frontier = Frontier::new().appended(lane(2, 0));
        let _ = frontier.spliced(0, &[lane(1, 0)]);
        assert_eq!(frontier.lane_of(RevId(2)), Some(0));
        assert_eq!(frontier.len(), 1);
    }
}
