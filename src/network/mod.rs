//! Compiled network topology: immutable link/node arrays compiled once from
//! a resolved [`crate::ward::Wards`], plus multi-demographic composition.

mod compiled;
mod demographics;

pub use compiled::{Network, Node, PlayLink, ToLink};
pub use demographics::{Demographic, Demographics, Networks};
