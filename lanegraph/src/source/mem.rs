use crate::core::{ParentIds, RevId};
use crate::error::{Error, Result};
use crate::source::History;

/// Branch name revisions land on when the caller does not pick one.
pub const DEFAULT_BRANCH: &str = "default";

/// In-memory history for synthetic graphs.
///
/// Revisions are appended oldest first and numbered in insertion
/// order, which keeps fixtures short: `add(&[a, b])` is a merge of two
/// already-added revisions.
#[derive(Debug, Clone, Default)]
pub struct MemHistory {
    revs: Vec<MemRev>,
}

#[derive(Debug, Clone)]
struct MemRev {
    parents: ParentIds,
    branch: String,
}

impl MemHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a revision on the default branch and returns its number.
    pub fn add(&mut self, parents: &[RevId]) -> RevId {
        self.add_on(DEFAULT_BRANCH, parents)
    }

    /// Appends a revision on the given branch. Parents must already be
    /// present.
    pub fn add_on(&mut self, branch: &str, parents: &[RevId]) -> RevId {
        let rev = RevId(self.revs.len() as u32);
        debug_assert!(
            parents.iter().all(|parent| *parent < rev),
            "parents must be added before their children"
        );
        self.revs.push(MemRev {
            parents: parents.iter().copied().collect(),
            branch: branch.to_owned(),
        });
        rev
    }

    pub fn branch_of(&self, rev: RevId) -> Option<&str> {
        self.revs.get(rev.index()).map(|r| r.branch.as_str())
    }
}

impl History for MemHistory {
    fn len(&self) -> usize {
        self.revs.len()
    }

    fn parents_of(&self, rev: RevId) -> Result<ParentIds> {
        self.revs
            .get(rev.index())
            .map(|r| r.parents.clone())
            .ok_or(Error::UnknownRevision(rev))
    }

    fn on_branch(&self, rev: RevId, branch: &str) -> Result<bool> {
        self.revs
            .get(rev.index())
            .map(|r| r.branch == branch)
            .ok_or(Error::UnknownRevision(rev))
    }
}
