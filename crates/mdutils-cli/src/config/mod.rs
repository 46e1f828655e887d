//! Typed settings of the config-driven tools.
//!
//! Every tool reads the `[main]` section of an INI file through the core
//! loader and turns the result into a closed struct right away, so commands
//! never look up keys by name.

mod models;

pub use models::{DataEditConfig, DumpEditConfig, PdbEditConfig, PsfEditConfig};

use crate::error::{CliError, Result};
use mdutils::config::{ConfigSchema, ConfigValue, Configuration, ValueKind};
use mdutils::error::Error as CoreError;
use mdutils::transform::RenumberDict;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_SUFFIX: &str = "_new";

/// The keys shared by all editing tools: the required input file and where
/// the edited copy goes.
fn editing_schema(input_key: &str) -> ConfigSchema {
    ConfigSchema::new()
        .with_required(input_key, ValueKind::Str)
        .with_default("output_directory", ConfigValue::Str(String::new()))
        .with_default("output_suffix", ConfigValue::Str(DEFAULT_SUFFIX.to_string()))
}

fn required_path(config: &Configuration, key: &str) -> Result<PathBuf> {
    config
        .get_path(key)
        .ok_or_else(|| CoreError::MissingKey(key.to_string()).into())
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputOptions {
    /// `None` writes next to the input file.
    pub directory: Option<PathBuf>,
    pub suffix: String,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            directory: None,
            suffix: DEFAULT_SUFFIX.to_string(),
        }
    }
}

impl OutputOptions {
    fn from_config(config: &Configuration) -> Self {
        Self {
            directory: config.get_path("output_directory"),
            suffix: config
                .get_str("output_suffix")
                .unwrap_or(DEFAULT_SUFFIX)
                .to_string(),
        }
    }

    /// `<directory>/<input stem><suffix>.<extension>`.
    ///
    /// Fails when the result would be the input file itself.
    pub fn path_for(&self, input: &Path, extension: &str) -> Result<PathBuf> {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| {
                CliError::Config(format!("'{}' does not name a file", input.display()))
            })?;
        let directory = match &self.directory {
            Some(dir) => dir.clone(),
            None => input.parent().map(Path::to_path_buf).unwrap_or_default(),
        };
        if directory.is_file() {
            return Err(CliError::Config(format!(
                "output_directory '{}' is a file",
                directory.display()
            )));
        }
        let output = directory.join(format!("{}{}.{}", stem, self.suffix, extension));
        if same_file(&output, input) {
            return Err(CliError::OutputIsInput { path: output });
        }
        debug!("Output for {} will be {}", input.display(), output.display());
        Ok(output)
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// The extension of `input`, or `fallback` when it has none.
pub fn extension_or<'a>(input: &'a Path, fallback: &'a str) -> &'a str {
    input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or(fallback)
}

/// Loads an optional renumbering dictionary.
pub fn load_dict(path: Option<&Path>, check_unique: bool) -> Result<Option<RenumberDict>> {
    path.map(|p| RenumberDict::from_csv_path(p, check_unique))
        .transpose()
        .map_err(CliError::from)
}
