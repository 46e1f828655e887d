use crate::error::Result;
use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    name = "mdutils",
    version,
    about = "mdutils - edit LAMMPS, PDB and PSF files by renumbering atoms, types and molecules, and align CSV output tables.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reorder atoms and renumber atom types or molecules in a LAMMPS data file.
    DataEdit(ConfigArgs),
    /// Reorder atoms and renumber atom types or molecules in a LAMMPS dump file.
    DumpEdit(ConfigArgs),
    /// Reorder atoms and renumber residues in a PDB file.
    PdbEdit(ConfigArgs),
    /// Renumber residues in a PSF file.
    PsfEdit(ConfigArgs),
    /// Keep the rows of two CSV files whose key column values match.
    AlignOnCol(AlignArgs),
}

/// Arguments shared by the config-driven editing tools.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Path to the INI configuration file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,
}

/// Arguments for the `align-on-col` subcommand.
#[derive(Args, Debug)]
pub struct AlignArgs {
    /// First CSV file; its columns come first in the output.
    #[arg(value_name = "FILE1")]
    pub file1: PathBuf,

    /// Second CSV file.
    #[arg(value_name = "FILE2")]
    pub file2: PathBuf,

    /// Name of the column to align on.
    #[arg(long, default_value = "timestep", value_name = "NAME")]
    pub col: String,

    /// Output path. Defaults to `<FILE1 stem>_align.csv` next to FILE1.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// The outcome of reading the command line.
#[derive(Debug)]
pub enum ParsedArgs {
    Run(Cli),
    /// Help or version text that should be printed before exiting normally.
    Help(String),
}

pub fn parse_args<I, T>(args: I) -> Result<ParsedArgs>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => Ok(ParsedArgs::Run(cli)),
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            Ok(ParsedArgs::Help(e.render().to_string()))
        }
        Err(e) => Err(e.into()),
    }
}
