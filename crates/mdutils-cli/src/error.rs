use mdutils::error::{Error as CoreError, ErrorKind};
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("{}", usage_summary(.0))]
    Usage(#[from] clap::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Refusing to overwrite input file '{path}'", path = path.display())]
    OutputIsInput { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Process exit status: 1 for bad input, 2 for I/O failures, 3 for
    /// invalid file content.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Core(e) => match e.kind() {
                ErrorKind::Input => 1,
                ErrorKind::Io => 2,
                ErrorKind::InvalidData => 3,
            },
            Self::Io(_) => 2,
            Self::Usage(_) | Self::Config(_) | Self::OutputIsInput { .. } | Self::Other(_) => 1,
        }
    }
}

/// The first line of a clap error, without its `error:` prefix.
fn usage_summary(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let first = rendered.lines().next().unwrap_or_default();
    first.trim_start_matches("error:").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdutils::error::InvalidDataError;

    #[test]
    fn exit_codes_follow_the_error_kind() {
        let missing: CliError = CoreError::MissingKey("data_tpl_file".into()).into();
        assert_eq!(missing.exit_code(), 1);
        let io: CliError = CoreError::io(
            "absent.data",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        )
        .into();
        assert_eq!(io.exit_code(), 2);
        let bad: CliError = CoreError::from(InvalidDataError::new("bad")).into();
        assert_eq!(bad.exit_code(), 3);
        let same = CliError::OutputIsInput {
            path: PathBuf::from("a.data"),
        };
        assert_eq!(same.exit_code(), 1);
    }

    #[test]
    fn core_messages_pass_through_unchanged() {
        let err: CliError = CoreError::MissingKey("data_tpl_file".into()).into();
        assert_eq!(err.to_string(), "Missing config val for key 'data_tpl_file'");
    }
}
