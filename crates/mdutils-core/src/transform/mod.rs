//! Id renumbering applied between reading and writing a file.

mod dictionary;
mod reorder;

pub use dictionary::{RenumberDict, remap};
pub use reorder::Reorder;
