pub mod item;
pub mod rev;

pub use item::WalkItem;
pub use rev::{ParentIds, RevId};
