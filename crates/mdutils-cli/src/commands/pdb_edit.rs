use crate::cli::ConfigArgs;
use crate::config::{PdbEditConfig, load_dict};
use crate::error::Result;
use mdutils::formats::PdbFile;
use mdutils::io::TextFormat;
use std::path::PathBuf;
use tracing::info;

pub fn run(args: &ConfigArgs) -> Result<PathBuf> {
    let config = PdbEditConfig::load(&args.config)?;
    let output_path = config.output.path_for(&config.pdb_file, "pdb")?;

    info!("Reading PDB file {:?}", &config.pdb_file);
    let mut pdb = PdbFile::read_from_path(&config.pdb_file)?;
    info!("Read {} atoms", pdb.num_atoms());

    if let Some(dict) = load_dict(config.atom_reorder.as_deref(), false)? {
        pdb.reorder_atoms(&dict)?;
    }
    if let Some(dict) = load_dict(config.residues.as_deref(), false)? {
        pdb.remap_residues(&dict);
    }

    info!("Writing edited PDB file to {:?}", &output_path);
    pdb.write_to_path(&output_path)?;
    Ok(output_path)
}
