use crate::cli::ConfigArgs;
use crate::config::{DataEditConfig, load_dict};
use crate::error::Result;
use mdutils::formats::LammpsData;
use mdutils::io::TextFormat;
use std::path::PathBuf;
use tracing::{info, warn};

pub fn run(args: &ConfigArgs) -> Result<PathBuf> {
    let config = DataEditConfig::load(&args.config)?;
    let output_path = config.output.path_for(&config.data_file, "data")?;
    let unique = config.check_dict_uniqueness;

    info!("Reading LAMMPS data file {:?}", &config.data_file);
    let mut data = LammpsData::read_from_path(&config.data_file)?;
    info!("Read {} atoms", data.num_atoms());

    if let Some(dict) = load_dict(config.atom_reorder.as_deref(), unique)? {
        data.reorder_atoms(&dict)?;
    }
    if let Some(dict) = load_dict(config.atom_types.as_deref(), unique)? {
        data.remap_atom_types(&dict)?;
    }
    if let Some(dict) = load_dict(config.molecules.as_deref(), unique)? {
        data.remap_molecules(&dict)?;
    }
    if let Some(expected) = load_dict(config.atom_type_check.as_deref(), unique)? {
        let mismatches = data.check_atom_types(&expected);
        if mismatches > 0 {
            warn!(
                "{} atoms do not have the type listed in {:?}",
                mismatches, config.atom_type_check
            );
        } else {
            info!("All checked atom types match");
        }
    }

    info!("Writing edited data file to {:?}", &output_path);
    data.write_to_path(&output_path)?;
    Ok(output_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use mdutils::formats::lammps_data::{ATOM_ID, ATOM_TYPE};
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn write_water_box(path: &Path) {
        let mut text = String::from("water box\n\n27 atoms\n2 atom types\n\nAtoms # full\n\n");
        for atom in 1..=27 {
            let ty = if atom % 3 == 1 { 1 } else { 2 };
            text.push_str(&format!(
                "{} {} {} 0.0 {}.0 0.0 0.0\n",
                atom,
                (atom - 1) / 3 + 1,
                ty,
                atom
            ));
        }
        fs::write(path, text).unwrap();
    }

    fn args(dir: &Path, config: &str) -> ConfigArgs {
        let path = dir.join("data_edit.ini");
        fs::write(&path, config).unwrap();
        ConfigArgs { config: path }
    }

    #[test]
    fn reorders_atoms_from_a_dictionary_file() {
        let dir = tempdir().unwrap();
        let data = dir.path().join("water.data");
        write_water_box(&data);
        let dict = dir.path().join("order.csv");
        fs::write(&dict, "old,new\n1,20\n9,2\n").unwrap();
        let args = args(
            dir.path(),
            &format!(
                "[main]\ndata_tpl_file = {}\natom_reorder_old_new_file = {}\n",
                data.display(),
                dict.display()
            ),
        );

        let output = run(&args).unwrap();
        assert_eq!(output, dir.path().join("water_new.data"));

        let original = LammpsData::read_from_path(&data).unwrap();
        let edited = LammpsData::read_from_path(&output).unwrap();
        let moved = &edited.atoms()[19];
        assert_eq!(moved.int(ATOM_ID), Some(20));
        assert_eq!(moved.fields[1..], original.atoms()[0].fields[1..]);
        assert_eq!(edited.atoms()[1].fields[1..], original.atoms()[8].fields[1..]);
    }

    #[test]
    fn type_dictionary_and_output_directory_are_honoured() {
        let dir = tempdir().unwrap();
        let data = dir.path().join("water.data");
        write_water_box(&data);
        let types = dir.path().join("types.csv");
        fs::write(&types, "2,5\n").unwrap();
        let out_dir = dir.path().join("out");
        fs::create_dir(&out_dir).unwrap();
        let args = args(
            dir.path(),
            &format!(
                "[main]\ndata_tpl_file = {}\natom_type_old_new_file = {}\noutput_directory = {}\noutput_suffix = _typed\n",
                data.display(),
                types.display(),
                out_dir.display()
            ),
        );

        let output = run(&args).unwrap();
        assert_eq!(output, out_dir.join("water_typed.data"));
        let edited = LammpsData::read_from_path(&output).unwrap();
        assert_eq!(edited.atoms()[0].int(ATOM_TYPE), Some(1));
        assert_eq!(edited.atoms()[1].int(ATOM_TYPE), Some(5));
    }

    #[test]
    fn missing_template_key_fails_without_writing_output() {
        let dir = tempdir().unwrap();
        let data = dir.path().join("water.data");
        write_water_box(&data);
        let args = args(dir.path(), "[main]\noutput_suffix = _new\n");

        let err = run(&args).unwrap_err();
        assert!(err.to_string().contains("Missing config val"));
        assert_ne!(err.exit_code(), 0);
        assert!(!dir.path().join("water_new.data").exists());
    }

    #[test]
    fn empty_suffix_in_the_input_directory_is_rejected() {
        let dir = tempdir().unwrap();
        let data = dir.path().join("water.data");
        write_water_box(&data);
        let before = fs::read_to_string(&data).unwrap();
        let args = args(
            dir.path(),
            &format!("[main]\ndata_tpl_file = {}\noutput_suffix =\n", data.display()),
        );

        let err = run(&args).unwrap_err();
        assert!(matches!(err, CliError::OutputIsInput { .. }));
        assert_eq!(fs::read_to_string(&data).unwrap(), before);
    }

    #[test]
    fn count_mismatch_exits_with_the_data_error_code() {
        let dir = tempdir().unwrap();
        let data = dir.path().join("water.data");
        write_water_box(&data);
        let text = fs::read_to_string(&data).unwrap().replace("27 atoms", "26 atoms");
        fs::write(&data, text).unwrap();
        let args = args(dir.path(), &format!("[main]\ndata_tpl_file = {}\n", data.display()));

        let err = run(&args).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(!dir.path().join("water_new.data").exists());
    }
}
