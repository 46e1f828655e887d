//! The shared machinery behind every format reader.
//!
//! A file is carved into sections by a [`scanner::Scanner`] driven by a table
//! of header patterns. Each data line of a section is converted into a typed
//! [`fields::Record`] according to the section's [`fields::FieldSpec`], and
//! [`document::Grammar`] checks that every section holds as many records as
//! the file announces. [`format`] turns records back into text.

pub mod document;
pub mod fields;
pub mod format;
pub mod scanner;

pub use document::{CountSource, Grammar, HEAD, ParsedFile, Section, read_lines};
pub use fields::{Align, FieldKind, FieldSpec, Record, Value};
pub use format::{ColumnFormat, FormatSpec, Precision, format_record, format_section};
pub use scanner::{HeaderTable, ScanEvent, ScanState, scan};
