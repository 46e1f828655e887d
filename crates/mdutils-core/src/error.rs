use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of a failure, used by front ends to pick an exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Input,
    Io,
    InvalidData,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Could not access file '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Stream(#[from] std::io::Error),

    #[error("Malformed configuration file '{path}' (line {line}): {message}", path = path.display())]
    Parsing {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Missing config val for key '{0}'")]
    MissingKey(String),

    #[error("Unexpected key '{key}' in configuration section [{section}]")]
    UnexpectedKey { section: String, key: String },

    #[error(transparent)]
    InvalidData(#[from] InvalidDataError),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } | Self::Stream(_) => ErrorKind::Io,
            Self::Parsing { .. } | Self::MissingKey(_) | Self::UnexpectedKey { .. } => {
                ErrorKind::Input
            }
            Self::InvalidData(_) => ErrorKind::InvalidData,
        }
    }
}

/// A structural or content problem in a parsed file.
///
/// Carries as much location context as the failing layer knows about; outer
/// layers fill in what is missing (typically the file name) on the way up.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvalidDataError {
    pub message: String,
    pub file: Option<String>,
    pub section: Option<String>,
    pub field: Option<String>,
    pub line: Option<usize>,
    pub content: Option<String>,
}

impl InvalidDataError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.file.get_or_insert_with(|| file.into());
        self
    }

    pub fn in_section(mut self, section: impl Into<String>) -> Self {
        self.section.get_or_insert_with(|| section.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn at_line(mut self, line: usize, content: impl Into<String>) -> Self {
        self.line.get_or_insert(line);
        self.content.get_or_insert_with(|| content.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content.get_or_insert_with(|| content.into());
        self
    }
}

impl fmt::Display for InvalidDataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid data")?;
        if let Some(file) = &self.file {
            write!(f, " in file '{}'", file)?;
        }
        if let Some(section) = &self.section {
            write!(f, " (section '{}'", section)?;
            if let Some(line) = self.line {
                write!(f, ", line {}", line)?;
            }
            write!(f, ")")?;
        } else if let Some(line) = self.line {
            write!(f, " (line {})", line)?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(field) = &self.field {
            write!(f, " [field '{}']", field)?;
        }
        if let Some(content) = &self.content {
            write!(f, "; line content: '{}'", content)?;
        }
        Ok(())
    }
}

impl std::error::Error for InvalidDataError {}

/// Attaches a file name to invalid-data errors bubbling out of a parse.
pub(crate) fn with_file(err: Error, file: &str) -> Error {
    match err {
        Error::InvalidData(inner) => Error::InvalidData(inner.in_file(file)),
        other => other,
    }
}
