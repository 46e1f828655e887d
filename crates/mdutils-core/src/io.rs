use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// A file format that can be read into memory and written back out.
pub trait TextFormat: Sized {
    /// Reads the format from a buffered reader.
    ///
    /// `source` names the input in error messages (usually the file path).
    fn read_from(reader: &mut impl BufRead, source: &str) -> Result<Self>;

    /// Writes the in-memory representation to `writer`.
    fn write_to(&self, writer: &mut impl Write) -> Result<()>;

    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader, &path.display().to_string())
    }

    /// Writes to `path` through a temporary file that replaces the target
    /// only once everything has been written.
    fn write_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_atomically(path.as_ref(), |writer| self.write_to(writer))
    }
}

/// Collects all lines of `reader`, attributing read failures to `source`.
pub fn collect_lines(reader: &mut impl BufRead, source: &str) -> Result<Vec<String>> {
    reader
        .lines()
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| Error::io(source, e))
}

pub fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<tempfile::NamedTempFile>) -> Result<()>,
{
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
    let mut writer = BufWriter::new(tmp);
    write(&mut writer)?;
    let tmp = writer
        .into_inner()
        .map_err(|e| Error::io(path, e.into_error()))?;
    tmp.persist(path).map_err(|e| Error::io(path, e.error))?;
    Ok(())
}
