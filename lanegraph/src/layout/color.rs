use std::collections::HashMap;

use crate::core::RevId;
use crate::layout::row::ColorIdx;

/// Palette size used when the caller does not pick one. Matches the
/// number of distinct line colors the bundled renderer carries.
pub const DEFAULT_PALETTE: usize = 6;

/// Tracks which palette slot each pending revision draws with.
///
/// Colors are promises: a revision is tinted the moment it first shows
/// up as somebody's parent, and keeps that tint when its own row is
/// emitted later. Fresh colors come from a monotonically advancing
/// counter reduced modulo the palette size, so heavily branched graphs
/// reuse colors instead of running out.
#[derive(Debug, Clone)]
pub struct ColorMap {
    assigned: HashMap<RevId, ColorIdx>,
    seq: usize,
    palette: usize,
}

impl ColorMap {
    pub fn new(palette: usize) -> Self {
        Self {
            assigned: HashMap::new(),
            seq: 0,
            palette: palette.max(1),
        }
    }

    /// Next unused color in rotation, without binding it to a revision.
    pub fn fresh(&mut self) -> ColorIdx {
        let color = self.seq % self.palette;
        self.seq += 1;
        color
    }

    /// Binds the next rotation color to `rev` and returns it.
    pub fn assign_fresh(&mut self, rev: RevId) -> ColorIdx {
        let color = self.fresh();
        self.assigned.insert(rev, color);
        color
    }

    pub fn assign(&mut self, rev: RevId, color: ColorIdx) {
        self.assigned.insert(rev, color);
    }

    pub fn get(&self, rev: RevId) -> Option<ColorIdx> {
        self.assigned.get(&rev).copied()
    }
}

impl Default for ColorMap {
    fn default() -> Self {
        Self::new(DEFAULT_PALETTE)
    }
}
