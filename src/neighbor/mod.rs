mod binned;
mod list;

pub use binned::{Bin, Bins};
pub use list::{BuildMethod, NeighborList};
