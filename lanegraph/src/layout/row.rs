use crate::core::{ParentIds, RevId};

/// Lane column index, 0 at the left edge.
pub type LaneIdx = usize;

/// Index into whatever palette the renderer draws with. Stable for a
/// branch across its whole lifetime in the graph.
pub type ColorIdx = usize;

/// One edge of a row: a line entering the row at column `from` and
/// leaving it at column `to`.
///
/// `from == to` is a lane passing straight through. `from != to` is a
/// lane bending, either because lanes to its left closed or because a
/// merge forked a new lane out of the current revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub from: LaneIdx,
    pub to: LaneIdx,
    pub color: ColorIdx,
}

impl Segment {
    pub fn new(from: LaneIdx, to: LaneIdx, color: ColorIdx) -> Self {
        Self { from, to, color }
    }

    /// True when the lane neither bends nor closes on this row.
    pub fn is_straight(&self) -> bool {
        self.from == self.to
    }
}

/// Fully laid-out graph row for one revision.
///
/// Everything a renderer needs is here; no lookups back into the
/// traversal are required to draw the row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutRow {
    /// Revision this row displays.
    pub rev: RevId,
    /// Column where the revision's node sits.
    pub lane: LaneIdx,
    /// Color of the revision's own lane.
    pub color: ColorIdx,
    /// Display parents, untouched by any lane filtering.
    pub parents: ParentIds,
    /// Line geometry connecting this row to the next one.
    pub segments: Vec<Segment>,
}

impl LayoutRow {
    /// True when the revision merges two or more display parents.
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// Widest column this row touches, counting both the node and all
    /// segment endpoints. Renderers size their grid from this.
    pub fn width(&self) -> usize {
        let mut w = self.lane;
        for seg in &self.segments {
            w = w.max(seg.from).max(seg.to);
        }
        w + 1
    }
}
