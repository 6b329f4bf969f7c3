pub mod filelog;
pub mod list;
pub mod range;

pub use filelog::FileLogWalk;
pub use list::ListWalk;
pub use range::RangeWalk;
