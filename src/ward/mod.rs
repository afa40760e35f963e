//! Ward topology: the mutable, pre-resolution representation of a ward's
//! worker and player links, and the collection that resolves and hands them
//! off to [`crate::network`] for compilation.

mod builder;
mod collection;
mod info;

pub use builder::{Position, Ward, WardData};
pub use collection::Wards;
pub use info::{Dest, DestKey, WardInfo};
