use std::vec;

use crate::core::WalkItem;
use crate::error::Result;
use crate::source::{FileLog, FileRev};

/// Walks the entries of a file's ancestry as traversal items.
///
/// The interesting part already happened when the log was built: a
/// rename entry carries its pre-rename ancestor only as a display
/// parent, so its lane ends at the rename and the old name's line
/// starts over as a fresh head further down.
#[derive(Debug, Clone)]
pub struct FileLogWalk {
    entries: vec::IntoIter<FileRev>,
}

impl FileLogWalk {
    pub fn new(log: FileLog) -> Self {
        Self {
            entries: log.entries.into_iter(),
        }
    }
}

impl Iterator for FileLogWalk {
    type Item = Result<WalkItem>;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next().map(|entry| {
            let mut lane_parents = entry.lane_parents;
            // A merge in the ancestry opens its new lanes oldest-first.
            lane_parents.sort_unstable();
            Ok(WalkItem {
                rev: entry.rev,
                parents: entry.parents,
                lane_parents,
            })
        })
    }
}
