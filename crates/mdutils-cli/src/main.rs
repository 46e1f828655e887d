mod cli;
mod commands;
mod config;
mod error;
mod logging;

use crate::cli::{Commands, ParsedArgs};
use crate::error::Result;
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::{debug, error, info};

fn main() {
    let code = match run_app(std::env::args_os()) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run_app<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match cli::parse_args(args)? {
        ParsedArgs::Help(text) => {
            print!("{}", text);
            return Ok(());
        }
        ParsedArgs::Run(cli) => cli,
    };
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.clone())?;

    info!("mdutils v{} starting up.", env!("CARGO_PKG_VERSION"));
    debug!("Full CLI arguments parsed: {:?}", &cli);

    match dispatch(&cli.command) {
        Ok(output) => {
            info!("Command completed successfully.");
            println!("Wrote {}", output.display());
            Ok(())
        }
        Err(e) => {
            error!("Command failed: {}", e);
            Err(e)
        }
    }
}

fn dispatch(command: &Commands) -> Result<PathBuf> {
    match command {
        Commands::DataEdit(args) => {
            info!("Dispatching to 'data-edit' command.");
            commands::data_edit::run(args)
        }
        Commands::DumpEdit(args) => {
            info!("Dispatching to 'dump-edit' command.");
            commands::dump_edit::run(args)
        }
        Commands::PdbEdit(args) => {
            info!("Dispatching to 'pdb-edit' command.");
            commands::pdb_edit::run(args)
        }
        Commands::PsfEdit(args) => {
            info!("Dispatching to 'psf-edit' command.");
            commands::psf_edit::run(args)
        }
        Commands::AlignOnCol(args) => {
            info!("Dispatching to 'align-on-col' command.");
            commands::align_on_col::run(args)
        }
    }
}
