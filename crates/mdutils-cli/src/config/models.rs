use super::{OutputOptions, editing_schema, required_path};
use crate::error::Result;
use mdutils::config::{ConfigSchema, ConfigValue, Configuration, load_config};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct DataEditConfig {
    pub data_file: PathBuf,
    pub atom_reorder: Option<PathBuf>,
    pub atom_types: Option<PathBuf>,
    pub molecules: Option<PathBuf>,
    /// Atom id to expected atom type, checked after all edits.
    pub atom_type_check: Option<PathBuf>,
    pub check_dict_uniqueness: bool,
    pub output: OutputOptions,
}

impl DataEditConfig {
    pub fn schema() -> ConfigSchema {
        editing_schema("data_tpl_file")
            .with_default("atom_reorder_old_new_file", ConfigValue::Str(String::new()))
            .with_default("atom_type_old_new_file", ConfigValue::Str(String::new()))
            .with_default("mol_renum_old_new_file", ConfigValue::Str(String::new()))
            .with_default("atom_type_check_file", ConfigValue::Str(String::new()))
            .with_default("check_dict_uniqueness", ConfigValue::Bool(false))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let config = load_config(path, &Self::schema())?;
        let parsed = Self::from_config(&config)?;
        debug!("Resolved data-edit configuration: {:?}", parsed);
        Ok(parsed)
    }

    fn from_config(config: &Configuration) -> Result<Self> {
        Ok(Self {
            data_file: required_path(config, "data_tpl_file")?,
            atom_reorder: config.get_path("atom_reorder_old_new_file"),
            atom_types: config.get_path("atom_type_old_new_file"),
            molecules: config.get_path("mol_renum_old_new_file"),
            atom_type_check: config.get_path("atom_type_check_file"),
            check_dict_uniqueness: config.get_bool("check_dict_uniqueness").unwrap_or(false),
            output: OutputOptions::from_config(config),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DumpEditConfig {
    pub dump_file: PathBuf,
    pub atom_reorder: Option<PathBuf>,
    pub atom_types: Option<PathBuf>,
    pub molecules: Option<PathBuf>,
    pub last_frame_only: bool,
    pub output: OutputOptions,
}

impl DumpEditConfig {
    pub fn schema() -> ConfigSchema {
        editing_schema("dump_file")
            .with_default("atom_reorder_old_new_file", ConfigValue::Str(String::new()))
            .with_default("atom_type_old_new_file", ConfigValue::Str(String::new()))
            .with_default("mol_renum_old_new_file", ConfigValue::Str(String::new()))
            .with_default("last_frame_only", ConfigValue::Bool(false))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let config = load_config(path, &Self::schema())?;
        let parsed = Self {
            dump_file: required_path(&config, "dump_file")?,
            atom_reorder: config.get_path("atom_reorder_old_new_file"),
            atom_types: config.get_path("atom_type_old_new_file"),
            molecules: config.get_path("mol_renum_old_new_file"),
            last_frame_only: config.get_bool("last_frame_only").unwrap_or(false),
            output: OutputOptions::from_config(&config),
        };
        debug!("Resolved dump-edit configuration: {:?}", parsed);
        Ok(parsed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PdbEditConfig {
    pub pdb_file: PathBuf,
    pub atom_reorder: Option<PathBuf>,
    /// Renumbers residue sequence numbers.
    pub residues: Option<PathBuf>,
    pub output: OutputOptions,
}

impl PdbEditConfig {
    pub fn schema() -> ConfigSchema {
        editing_schema("pdb_tpl_file")
            .with_default("atom_reorder_old_new_file", ConfigValue::Str(String::new()))
            .with_default("mol_renum_old_new_file", ConfigValue::Str(String::new()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let config = load_config(path, &Self::schema())?;
        Ok(Self {
            pdb_file: required_path(&config, "pdb_tpl_file")?,
            atom_reorder: config.get_path("atom_reorder_old_new_file"),
            residues: config.get_path("mol_renum_old_new_file"),
            output: OutputOptions::from_config(&config),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PsfEditConfig {
    pub psf_file: PathBuf,
    pub residues: Option<PathBuf>,
    pub output: OutputOptions,
}

impl PsfEditConfig {
    pub fn schema() -> ConfigSchema {
        editing_schema("psf_file")
            .with_default("mol_renum_old_new_file", ConfigValue::Str(String::new()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let config = load_config(path, &Self::schema())?;
        Ok(Self {
            psf_file: required_path(&config, "psf_file")?,
            residues: config.get_path("mol_renum_old_new_file"),
            output: OutputOptions::from_config(&config),
        })
    }
}
