use crate::core::rev::{ParentIds, RevId};

/// One revision produced by a traversal, carrying the two parent lists
/// the layout distinguishes between.
///
/// `parents` is what the revision claims for display purposes. The
/// layout draws lane lines from `lane_parents` instead, which a
/// traversal may have filtered (branch walks) or rewritten to skip
/// revisions it will never yield (file walks across renames).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkItem {
    pub rev: RevId,
    pub parents: ParentIds,
    pub lane_parents: ParentIds,
}

impl WalkItem {
    /// Item whose lane parents match its display parents. The common
    /// case for plain history walks.
    pub fn direct(rev: RevId, parents: ParentIds) -> Self {
        Self {
            rev,
            lane_parents: parents.clone(),
            parents,
        }
    }

    /// Item that draws no lane lines at all, as produced by flat
    /// revision lists.
    pub fn flat(rev: RevId, parents: ParentIds) -> Self {
        Self {
            rev,
            parents,
            lane_parents: ParentIds::new(),
        }
    }
}
