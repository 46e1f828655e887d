use crate::error::{Error, Result};
use std::path::Path;

/// One `[name]` block of an INI file, with its entries in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct IniSection {
    pub name: String,
    pub entries: Vec<(String, String)>,
}

impl IniSection {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IniDocument {
    pub sections: Vec<IniSection>,
}

impl IniDocument {
    pub fn section(&self, name: &str) -> Option<&IniSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Parses INI text. Keys are lower-cased; values keep their inner whitespace.
    ///
    /// Indented lines following an entry are continuation lines and are joined
    /// to the previous value with a newline.
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let mut doc = IniDocument::default();
        let fail = |line: usize, message: String| Error::Parsing {
            path: path.to_path_buf(),
            line,
            message,
        };

        for (idx, raw) in text.lines().enumerate() {
            let line_num = idx + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            let indented = raw.starts_with([' ', '\t']);
            if indented {
                if let Some(entry) = doc.sections.last_mut().and_then(|s| s.entries.last_mut()) {
                    if !entry.1.is_empty() {
                        entry.1.push('\n');
                    }
                    entry.1.push_str(trimmed);
                    continue;
                }
            }

            if trimmed.starts_with('[') {
                let name = trimmed
                    .strip_prefix('[')
                    .and_then(|s| s.strip_suffix(']'))
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| fail(line_num, format!("invalid section header '{}'", trimmed)))?;
                if doc.section(name).is_some() {
                    return Err(fail(line_num, format!("duplicate section [{}]", name)));
                }
                doc.sections.push(IniSection {
                    name: name.to_string(),
                    entries: Vec::new(),
                });
                continue;
            }

            let Some(sep) = trimmed.find(['=', ':']) else {
                return Err(fail(
                    line_num,
                    format!("expected 'key = value', found '{}'", trimmed),
                ));
            };
            let key = trimmed[..sep].trim().to_lowercase();
            let value = trimmed[sep + 1..].trim().to_string();
            if key.is_empty() {
                return Err(fail(line_num, "empty option name".to_string()));
            }

            let Some(section) = doc.sections.last_mut() else {
                return Err(fail(
                    line_num,
                    format!("option '{}' appears before any section header", key),
                ));
            };
            if section.get(&key).is_some() {
                return Err(fail(
                    line_num,
                    format!("duplicate option '{}' in section [{}]", key, section.name),
                ));
            }
            section.entries.push((key, value));
        }

        Ok(doc)
    }
}
