pub mod git;
pub mod mem;

pub use git::GitHistory;
pub use mem::{MemHistory, DEFAULT_BRANCH};

use chrono::{DateTime, Utc};

use crate::core::{ParentIds, RevId};
use crate::error::Result;

/// Read access to a numbered revision history.
///
/// Revisions are densely numbered from 0 (oldest root) to `len() - 1`
/// (newest head), so traversals can count ids down instead of chasing
/// object hashes.
pub trait History {
    fn len(&self) -> usize;

    /// Display parents of a revision, in commit order.
    fn parents_of(&self, rev: RevId) -> Result<ParentIds>;

    /// Whether a revision belongs to the named branch.
    fn on_branch(&self, rev: RevId, branch: &str) -> Result<bool>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Newest revision, if the history has any.
    fn tip(&self) -> Option<RevId> {
        let count = self.len();
        (count > 0).then(|| RevId((count - 1) as u32))
    }
}

/// Display metadata for one revision row.
#[derive(Debug, Clone)]
pub struct RevSummary {
    pub id: String,
    pub summary: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
}

/// How a revision changed the file a log tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChange {
    Added,
    Modified,
    Renamed,
}

/// One revision in a single file's ancestry.
///
/// `parents` lists the file revisions shown as ancestors, while
/// `lane_parents` only keeps the ones at the same name. A rename keeps
/// its pre-rename ancestor in `parents` but closes its lane, so the
/// graph shows the name change as a break with the old line continuing
/// under its own identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRev {
    pub rev: RevId,
    pub path: String,
    pub change: FileChange,
    pub parents: ParentIds,
    pub lane_parents: ParentIds,
    pub renamed_from: Option<String>,
}

/// A file's ancestry, newest entry first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLog {
    pub path: String,
    pub entries: Vec<FileRev>,
}
