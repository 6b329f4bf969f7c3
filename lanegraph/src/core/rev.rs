use std::fmt;

use smallvec::SmallVec;

/// Dense revision number. Revision 0 is the oldest root; numbers grow
/// toward the newest head, so a parent always has a smaller number than
/// its child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RevId(pub u32);

impl RevId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RevId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Parent list of a revision. Two inline slots cover everything but
/// octopus merges, which spill to the heap.
pub type ParentIds = SmallVec<[RevId; 2]>;
