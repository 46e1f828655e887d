use super::{ConfigValue, Configuration, IniDocument, ValueKind};
use crate::error::{Error, InvalidDataError, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::debug;

pub const MAIN_SECTION: &str = "main";

/// Declares which options a tool accepts.
///
/// A defaulted option is coerced to the kind of its default. A required option
/// has no default and is coerced to its declared kind.
#[derive(Debug, Clone, Default)]
pub struct ConfigSchema {
    defaults: BTreeMap<String, ConfigValue>,
    required: BTreeMap<String, ValueKind>,
    sections: BTreeSet<String>,
}

impl ConfigSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(mut self, key: &str, value: ConfigValue) -> Self {
        self.defaults.insert(key.to_lowercase(), value);
        self
    }

    pub fn with_required(mut self, key: &str, kind: ValueKind) -> Self {
        self.required.insert(key.to_lowercase(), kind);
        self
    }

    /// Allows an auxiliary `[name]` section, loaded as a nested mapping.
    pub fn with_section(mut self, name: &str) -> Self {
        self.sections.insert(name.to_string());
        self
    }

    fn kind_of(&self, key: &str) -> Option<ValueKind> {
        self.required
            .get(key)
            .copied()
            .or_else(|| self.defaults.get(key).and_then(ConfigValue::kind))
    }

    /// Validates a parsed INI document against this schema.
    pub fn resolve(&self, doc: &IniDocument, path: &Path) -> Result<Configuration> {
        let main = doc.section(MAIN_SECTION).ok_or_else(|| Error::Parsing {
            path: path.to_path_buf(),
            line: 0,
            message: format!("missing [{}] section", MAIN_SECTION),
        })?;

        let mut values = self.defaults.clone();
        for (key, raw) in &main.entries {
            let kind = self.kind_of(key).ok_or_else(|| Error::UnexpectedKey {
                section: MAIN_SECTION.to_string(),
                key: key.clone(),
            })?;
            let value = ConfigValue::coerce(kind, raw).map_err(|message| {
                InvalidDataError::new(message)
                    .with_field(key.clone())
                    .in_file(path.display().to_string())
            })?;
            values.insert(key.clone(), value);
        }

        if let Some(missing) = self.required.keys().find(|key| main.get(key).is_none()) {
            return Err(Error::MissingKey(missing.clone()));
        }

        for section in doc.sections.iter().filter(|s| s.name != MAIN_SECTION) {
            if !self.sections.contains(&section.name) {
                return Err(Error::UnexpectedKey {
                    section: section.name.clone(),
                    key: format!("[{}]", section.name),
                });
            }
            let nested = section.entries.iter().cloned().collect();
            values.insert(section.name.clone(), ConfigValue::Section(nested));
        }

        Ok(Configuration::from_values(values))
    }
}

/// Reads an INI file and resolves it against `schema`.
pub fn load_config(path: &Path, schema: &ConfigSchema) -> Result<Configuration> {
    debug!("Loading configuration from file: {:?}", path);
    let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let doc = IniDocument::parse(&text, path)?;
    schema.resolve(&doc, path)
}
