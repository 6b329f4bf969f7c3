use std::collections::HashSet;
use std::mem;

use tracing::{debug, warn};

use crate::core::{RevId, WalkItem};
use crate::error::Result;
use crate::layout::color::{ColorMap, DEFAULT_PALETTE};
use crate::layout::frontier::{Frontier, OpenLane};
use crate::layout::row::{LayoutRow, Segment};

/// Turns a stream of traversal items into laid-out graph rows.
///
/// The generator keeps a frontier of open lanes across rows. The
/// current revision either lands in the lane already waiting for it or
/// opens a new lane on the right edge, then its lane is replaced in
/// place by whichever of its parents are not open yet. First parents
/// inherit the lane color, later parents start fresh ones, and a color
/// promised to a pending parent sticks until that parent's own row is
/// emitted.
///
/// Rows come out one per `next()` call with no lookahead, so the cost
/// of laying out a prefix of a large history is proportional to that
/// prefix alone.
pub struct LayoutGenerator<W> {
    walk: W,
    frontier: Frontier,
    colors: ColorMap,
    emitted: HashSet<RevId>,
    max_lanes: usize,
    done: bool,
}

impl<W> LayoutGenerator<W>
where
    W: Iterator<Item = Result<WalkItem>>,
{
    pub fn new(walk: W) -> Self {
        Self::with_palette(walk, DEFAULT_PALETTE)
    }

    pub fn with_palette(walk: W, palette: usize) -> Self {
        Self {
            walk,
            frontier: Frontier::new(),
            colors: ColorMap::new(palette),
            emitted: HashSet::new(),
            max_lanes: 0,
            done: false,
        }
    }

    /// Widest the graph has been over all rows emitted so far.
    pub fn max_lanes(&self) -> usize {
        self.max_lanes
    }

    /// Lanes still open after the last emitted row.
    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    fn step(&mut self, item: WalkItem) -> LayoutRow {
        let WalkItem {
            rev,
            parents,
            lane_parents,
        } = item;

        debug_assert!(!self.emitted.contains(&rev), "revision {rev} yielded twice");
        if self.emitted.contains(&rev) {
            warn!(%rev, "revision yielded twice; laying it out as a new head");
        }

        // Land in the waiting lane, or open one on the right for a new
        // head the traversal never promised.
        let (frontier, lane) = match self.frontier.lane_of(rev) {
            Some(lane) => (mem::take(&mut self.frontier), lane),
            None => {
                let color = self.colors.assign_fresh(rev);
                let appended = self.frontier.appended(OpenLane { rev, color });
                let lane = appended.len() - 1;
                (appended, lane)
            }
        };
        let color = frontier[lane].color;

        // Parents already emitted cannot be below us; drawing a lane to
        // them would dangle forever, so the line is dropped while the
        // display parent list stays intact.
        let mut connectable = lane_parents;
        {
            let emitted = &self.emitted;
            connectable.retain(|&mut parent| {
                let fresh = !emitted.contains(&parent);
                debug_assert!(fresh, "parent {parent} of {rev} was already emitted");
                if !fresh {
                    warn!(%rev, %parent, "parent already emitted; dropping its lane line");
                }
                fresh
            });
        }
        connectable.dedup();

        // Replace our lane with the parents that are not open yet. The
        // first uncolored parent inherits this lane's color; any others
        // start fresh lanes of their own.
        let mut preferred = Some(color);
        let mut grown: Vec<OpenLane> = Vec::new();
        for &parent in &connectable {
            if frontier.lane_of(parent).is_some() || grown.iter().any(|open| open.rev == parent) {
                continue;
            }
            let parent_color = match self.colors.get(parent) {
                Some(existing) => existing,
                None => {
                    let assigned = preferred.take().unwrap_or_else(|| self.colors.fresh());
                    self.colors.assign(parent, assigned);
                    assigned
                }
            };
            grown.push(OpenLane {
                rev: parent,
                color: parent_color,
            });
        }

        let next = frontier.spliced(lane, &grown);
        self.max_lanes = self.max_lanes.max(frontier.len()).max(next.len());

        // Surviving lanes draw straight or shifted lines with their own
        // color; the current lane fans out one line per parent, colored
        // after the lane the parent ends up in.
        let mut segments = Vec::with_capacity(next.len() + 1);
        for (from, open) in frontier.iter().enumerate() {
            if let Some(to) = next.lane_of(open.rev) {
                segments.push(Segment::new(from, to, open.color));
            } else if from == lane {
                for &parent in &connectable {
                    if let Some(to) = next.lane_of(parent) {
                        segments.push(Segment::new(from, to, next[to].color));
                    }
                }
            }
        }

        self.emitted.insert(rev);
        self.frontier = next;

        LayoutRow {
            rev,
            lane,
            color,
            parents,
            segments,
        }
    }
}

impl<W> Iterator for LayoutGenerator<W>
where
    W: Iterator<Item = Result<WalkItem>>,
{
    type Item = Result<LayoutRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.walk.next() {
            Some(Ok(item)) => Some(Ok(self.step(item))),
            Some(Err(err)) => {
                self.done = true;
                Some(Err(err))
            }
            None => {
                self.done = true;
                if !self.frontier.is_empty() {
                    // Lanes running past the end of a bounded walk are
                    // expected; their lines run off the bottom row.
                    debug!(
                        open_lanes = self.frontier.len(),
                        "traversal ended with lanes still open"
                    );
                }
                None
            }
        }
    }
}
