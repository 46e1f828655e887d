use crate::cli::AlignArgs;
use crate::error::{CliError, Result};
use mdutils::formats::{CsvTable, align_on_column};
use std::path::{Path, PathBuf};
use tracing::info;

/// `<file1 stem>_align.csv` next to the first file.
pub fn default_output(file1: &Path) -> PathBuf {
    let stem = file1
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    file1.with_file_name(format!("{}_align.csv", stem))
}

pub fn run(args: &AlignArgs) -> Result<PathBuf> {
    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(&args.file1));
    if output_path == args.file1 || output_path == args.file2 {
        return Err(CliError::OutputIsInput { path: output_path });
    }

    let left = CsvTable::from_path(&args.file1)?;
    let right = CsvTable::from_path(&args.file2)?;
    let aligned = align_on_column(&left, &right, &args.col)?;

    info!(
        "Writing {} aligned rows to {:?}",
        aligned.rows.len(),
        &output_path
    );
    aligned.write_to_path(&output_path)?;
    Ok(output_path)
}
