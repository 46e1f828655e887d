//! # mdutils Core Library
//!
//! Readers, editors and writers for the text files that surround molecular
//! dynamics runs: LAMMPS data and dump files, PDB and PSF structures, and
//! CSV tables of per-timestep output.
//!
//! ## Layout
//!
//! - **[`parsing`]: The Machinery.** A header-driven scanner, typed field
//!   extraction, declared-count checks and record formatting shared by all
//!   formats.
//!
//! - **[`formats`]: The Files.** One grammar per file format plus the
//!   renumbering operations each format supports.
//!
//! - **[`transform`]: Renumbering.** Old-to-new id dictionaries loaded from
//!   CSV and the positional reorder built from them.
//!
//! - **[`config`]: Tool Settings.** INI loading against a per-tool schema of
//!   defaults and required keys.

pub mod config;
pub mod error;
pub mod formats;
pub mod io;
pub mod parsing;
pub mod transform;
