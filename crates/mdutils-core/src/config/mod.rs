//! Configuration loading for the command-line tools.
//!
//! Tool options live in the `[main]` section of an INI file. Each tool
//! declares a [`ConfigSchema`] listing its defaults and required keys; the
//! runtime kind of a default decides how an overriding value is coerced.
//! The result is an immutable [`Configuration`].

mod ini;
mod schema;

pub use ini::{IniDocument, IniSection};
pub use schema::{ConfigSchema, MAIN_SECTION, load_config};

use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Str,
    Int,
    Float,
    Bool,
    IntList,
    FloatList,
    StrList,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    IntList(Vec<i64>),
    FloatList(Vec<f64>),
    StrList(Vec<String>),
    /// Key/value pairs of an auxiliary INI section.
    Section(BTreeMap<String, String>),
}

impl ConfigValue {
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Self::Str(_) => Some(ValueKind::Str),
            Self::Int(_) => Some(ValueKind::Int),
            Self::Float(_) => Some(ValueKind::Float),
            Self::Bool(_) => Some(ValueKind::Bool),
            Self::IntList(_) => Some(ValueKind::IntList),
            Self::FloatList(_) => Some(ValueKind::FloatList),
            Self::StrList(_) => Some(ValueKind::StrList),
            Self::Section(_) => None,
        }
    }

    /// Converts raw INI text into a value of the requested kind.
    ///
    /// On failure, returns a short description of what was expected.
    pub fn coerce(kind: ValueKind, raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        match kind {
            ValueKind::Str => Ok(Self::Str(raw.to_string())),
            ValueKind::Int => raw
                .parse()
                .map(Self::Int)
                .map_err(|_| format!("expected an integer, found '{}'", raw)),
            ValueKind::Float => raw
                .parse()
                .map(Self::Float)
                .map_err(|_| format!("expected a number, found '{}'", raw)),
            ValueKind::Bool => parse_bool(raw)
                .map(Self::Bool)
                .ok_or_else(|| format!("expected a boolean, found '{}'", raw)),
            ValueKind::IntList => split_list(raw)
                .map(|item| {
                    item.parse::<i64>()
                        .map_err(|_| format!("expected a list of integers, found '{}'", item))
                })
                .collect::<Result<_, _>>()
                .map(Self::IntList),
            ValueKind::FloatList => split_list(raw)
                .map(|item| {
                    item.parse::<f64>()
                        .map_err(|_| format!("expected a list of numbers, found '{}'", item))
                })
                .collect::<Result<_, _>>()
                .map(Self::FloatList),
            ValueKind::StrList => Ok(Self::StrList(split_list(raw).map(String::from).collect())),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split([',', '\n'])
        .map(str::trim)
        .filter(|item| !item.is_empty())
}

/// The fully-resolved options of one tool invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Configuration {
    values: BTreeMap<String, ConfigValue>,
}

impl Configuration {
    pub(crate) fn from_values(values: BTreeMap<String, ConfigValue>) -> Self {
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(ConfigValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// A string option interpreted as a path; empty strings count as unset.
    pub fn get_path(&self, key: &str) -> Option<PathBuf> {
        self.get_str(key)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.values.get(key) {
            Some(ConfigValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_float(&self, key: &str) -> Option<f64> {
        match self.values.get(key) {
            Some(ConfigValue::Float(v)) => Some(*v),
            Some(ConfigValue::Int(v)) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.values.get(key) {
            Some(ConfigValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_int_list(&self, key: &str) -> Option<&[i64]> {
        match self.values.get(key) {
            Some(ConfigValue::IntList(v)) => Some(v),
            _ => None,
        }
    }

    pub fn get_section(&self, name: &str) -> Option<&BTreeMap<String, String>> {
        match self.values.get(name) {
            Some(ConfigValue::Section(map)) => Some(map),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_follows_the_requested_kind() {
        assert_eq!(ConfigValue::coerce(ValueKind::Int, " 42 "), Ok(ConfigValue::Int(42)));
        assert_eq!(ConfigValue::coerce(ValueKind::Float, "1e-3"), Ok(ConfigValue::Float(1e-3)));
        assert_eq!(ConfigValue::coerce(ValueKind::Bool, "Yes"), Ok(ConfigValue::Bool(true)));
        assert_eq!(ConfigValue::coerce(ValueKind::Bool, "off"), Ok(ConfigValue::Bool(false)));
        assert_eq!(
            ConfigValue::coerce(ValueKind::IntList, "1, 2,3,"),
            Ok(ConfigValue::IntList(vec![1, 2, 3]))
        );
        assert_eq!(
            ConfigValue::coerce(ValueKind::StrList, "a, b"),
            Ok(ConfigValue::StrList(vec!["a".into(), "b".into()]))
        );
        assert_eq!(
            ConfigValue::coerce(ValueKind::FloatList, ""),
            Ok(ConfigValue::FloatList(vec![]))
        );
    }

    #[test]
    fn coerce_reports_the_offending_text() {
        let err = ConfigValue::coerce(ValueKind::IntList, "1, two, 3").unwrap_err();
        assert!(err.contains("two"));
        assert!(ConfigValue::coerce(ValueKind::Bool, "maybe").is_err());
        assert!(ConfigValue::coerce(ValueKind::Int, "1.5").is_err());
    }

    #[test]
    fn typed_accessors_only_match_their_kind() {
        let mut values = BTreeMap::new();
        values.insert("n".to_string(), ConfigValue::Int(3));
        values.insert("path".to_string(), ConfigValue::Str(String::new()));
        let cfg = Configuration::from_values(values);
        assert_eq!(cfg.get_int("n"), Some(3));
        assert_eq!(cfg.get_float("n"), Some(3.0));
        assert_eq!(cfg.get_str("n"), None);
        assert_eq!(cfg.get_path("path"), None);
        assert_eq!(cfg.get_bool("missing"), None);
    }
}
