use tracing::debug;

use crate::core::{ParentIds, RevId, WalkItem};
use crate::error::Result;
use crate::source::History;

/// Walks revision numbers from `start` down to `stop`, inclusive.
///
/// Parents below `stop` are still reported as lane parents, so their
/// lines run off the bottom of the window instead of ending abruptly.
/// With a branch filter, off-branch revisions are skipped and each
/// skipped parent edge is rewritten to the nearest ancestor the walk
/// will still yield, following first parents.
pub struct RangeWalk<'h, H> {
    history: &'h H,
    cursor: Option<RevId>,
    stop: RevId,
    branch: Option<String>,
}

impl<'h, H: History> RangeWalk<'h, H> {
    /// Walks the whole history, newest to oldest.
    pub fn full(history: &'h H) -> Self {
        Self {
            cursor: history.tip(),
            history,
            stop: RevId(0),
            branch: None,
        }
    }

    /// Walks from `start` down to `stop`. A start past the tip is
    /// clamped to it.
    pub fn range(history: &'h H, start: RevId, stop: RevId) -> Self {
        Self {
            cursor: history.tip().map(|tip| tip.min(start)),
            history,
            stop,
            branch: None,
        }
    }

    /// Restricts the walk to revisions on the named branch.
    pub fn branch(mut self, name: impl Into<String>) -> Self {
        self.branch = Some(name.into());
        self
    }

    fn item_for(&self, rev: RevId) -> Result<WalkItem> {
        let parents = self.history.parents_of(rev)?;
        let Some(branch) = self.branch.as_deref() else {
            return Ok(WalkItem::direct(rev, parents));
        };
        let mut lane_parents = ParentIds::new();
        for &parent in &parents {
            if let Some(kept) = self.resolve_on_branch(parent, branch)? {
                lane_parents.push(kept);
            }
        }
        Ok(WalkItem {
            rev,
            parents,
            lane_parents,
        })
    }

    /// Nearest ancestor of `rev`, itself included, that the filtered
    /// walk will still yield. Ancestors below `stop` count: their lanes
    /// stay open past the bottom like any other cut-off parent.
    fn resolve_on_branch(&self, rev: RevId, branch: &str) -> Result<Option<RevId>> {
        let mut current = rev;
        loop {
            if current < self.stop || self.history.on_branch(current, branch)? {
                return Ok(Some(current));
            }
            match self.history.parents_of(current)?.first().copied() {
                Some(parent) => current = parent,
                None => {
                    debug!(%rev, branch, "no on-branch ancestor; lane edge dropped");
                    return Ok(None);
                }
            }
        }
    }
}

impl<H> Clone for RangeWalk<'_, H> {
    fn clone(&self) -> Self {
        Self {
            history: self.history,
            cursor: self.cursor,
            stop: self.stop,
            branch: self.branch.clone(),
        }
    }
}

impl<H: History> Iterator for RangeWalk<'_, H> {
    type Item = Result<WalkItem>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let current = self.cursor?;
            if current < self.stop {
                self.cursor = None;
                return None;
            }
            self.cursor = current.0.checked_sub(1).map(RevId);

            if let Some(branch) = self.branch.as_deref() {
                match self.history.on_branch(current, branch) {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(err) => {
                        self.cursor = None;
                        return Some(Err(err));
                    }
                }
            }

            let item = self.item_for(current);
            if item.is_err() {
                self.cursor = None;
            }
            return Some(item);
        }
    }
}
