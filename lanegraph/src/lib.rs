pub mod buffer;
pub mod core;
pub mod error;
pub mod layout;
pub mod source;
pub mod walk;

pub use buffer::RowBuffer;
pub use crate::core::{ParentIds, RevId, WalkItem};
pub use error::{Error, Result};
pub use layout::{
    ColorIdx, Frontier, LaneIdx, LayoutGenerator, LayoutRow, OpenLane, Segment, DEFAULT_PALETTE,
};
pub use source::{
    FileChange, FileLog, FileRev, GitHistory, History, MemHistory, RevSummary, DEFAULT_BRANCH,
};
pub use walk::{FileLogWalk, ListWalk, RangeWalk};
