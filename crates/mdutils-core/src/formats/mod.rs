//! Concrete file formats built on [`crate::parsing`].
//!
//! Each format reads into an in-memory document, offers the id renumbering
//! operations that make sense for it and writes the document back out through
//! [`crate::io::TextFormat`].

pub mod csv_align;
pub mod lammps_data;
pub mod lammps_dump;
pub mod pdb;
pub mod psf;

pub use csv_align::{CsvTable, align_on_column};
pub use lammps_data::LammpsData;
pub use lammps_dump::{DumpFrame, LammpsDump};
pub use pdb::{PdbFile, PdbLine};
pub use psf::PsfFile;
