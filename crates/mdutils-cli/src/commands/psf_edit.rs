use crate::cli::ConfigArgs;
use crate::config::{PsfEditConfig, load_dict};
use crate::error::Result;
use mdutils::formats::PsfFile;
use mdutils::io::TextFormat;
use std::path::PathBuf;
use tracing::{info, warn};

pub fn run(args: &ConfigArgs) -> Result<PathBuf> {
    let config = PsfEditConfig::load(&args.config)?;
    let output_path = config.output.path_for(&config.psf_file, "psf")?;

    info!("Reading PSF file {:?}", &config.psf_file);
    let mut psf = PsfFile::read_from_path(&config.psf_file)?;
    info!("Read {} atoms", psf.atoms().len());

    match load_dict(config.residues.as_deref(), false)? {
        Some(dict) => psf.remap_residues(&dict),
        None => warn!("No mol_renum_old_new_file given; the PSF file is copied unchanged"),
    }

    info!("Writing edited PSF file to {:?}", &output_path);
    psf.write_to_path(&output_path)?;
    Ok(output_path)
}
