pub mod color;
pub mod frontier;
pub mod generator;
pub mod row;

pub use color::{ColorMap, DEFAULT_PALETTE};
pub use frontier::{Frontier, OpenLane};
pub use generator::LayoutGenerator;
pub use row::{ColorIdx, LaneIdx, LayoutRow, Segment};
