use crate::cli::ConfigArgs;
use crate::config::{DumpEditConfig, extension_or, load_dict};
use crate::error::Result;
use mdutils::formats::LammpsDump;
use mdutils::io::TextFormat;
use std::path::PathBuf;
use tracing::info;

pub fn run(args: &ConfigArgs) -> Result<PathBuf> {
    let config = DumpEditConfig::load(&args.config)?;
    let extension = extension_or(&config.dump_file, "dump");
    let output_path = config.output.path_for(&config.dump_file, extension)?;

    info!("Reading LAMMPS dump file {:?}", &config.dump_file);
    let mut dump = LammpsDump::read_from_path(&config.dump_file)?;
    info!("Read {} frames", dump.frames.len());

    if config.last_frame_only {
        dump.keep_last_frame();
    }
    if let Some(dict) = load_dict(config.atom_reorder.as_deref(), false)? {
        dump.reorder_atoms(&dict)?;
    }
    if let Some(dict) = load_dict(config.atom_types.as_deref(), false)? {
        dump.remap_atom_types(&dict)?;
    }
    if let Some(dict) = load_dict(config.molecules.as_deref(), false)? {
        dump.remap_molecules(&dict)?;
    }

    info!("Writing edited dump file to {:?}", &output_path);
    dump.write_to_path(&output_path)?;
    Ok(output_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn frame(timestep: i64) -> String {
        format!(
            "ITEM: TIMESTEP\n{}\nITEM: NUMBER OF ATOMS\n3\nITEM: BOX BOUNDS pp pp pp\n0 5\n0 5\n0 5\nITEM: ATOMS id mol type x y z\n1 1 1 0.1 0 0\n2 1 2 0.2 0 0\n3 1 2 0.3 0 0\n",
            timestep
        )
    }

    #[test]
    fn keeps_the_last_frame_and_reorders_it() {
        let dir = tempdir().unwrap();
        let dump = dir.path().join("traj.lammpstrj");
        fs::write(&dump, format!("{}{}", frame(0), frame(500))).unwrap();
        let dict = dir.path().join("order.csv");
        fs::write(&dict, "3,1\n").unwrap();
        let config = dir.path().join("dump.ini");
        fs::write(
            &config,
            format!(
                "[main]\ndump_file = {}\natom_reorder_old_new_file = {}\nlast_frame_only = true\n",
                dump.display(),
                dict.display()
            ),
        )
        .unwrap();

        let output = run(&ConfigArgs { config }).unwrap();
        assert_eq!(output, dir.path().join("traj_new.lammpstrj"));
        let text = fs::read_to_string(&output).unwrap();
        assert!(!text.contains("ITEM: TIMESTEP\n0\n"));
        assert!(text.contains("ITEM: TIMESTEP\n500\n"));
        assert!(text.ends_with("1 1 2 0.3 0 0\n2 1 1 0.1 0 0\n3 1 2 0.2 0 0\n"));
    }

    #[test]
    fn missing_dump_file_is_an_io_error() {
        let dir = tempdir().unwrap();
        let config = dir.path().join("dump.ini");
        fs::write(
            &config,
            format!("[main]\ndump_file = {}\n", dir.path().join("absent.dump").display()),
        )
        .unwrap();
        let err = run(&ConfigArgs { config }).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
