//! Merge per-class spectra batches into one file
//!
//! Inputs come from an explicit list, a recursive search of a directory for
//! files whose name contains "templates", or both.

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use mocksim::merge::{find_template_files, merge_files};
use mocksim::MergeOptions;

#[derive(Parser, Debug)]
#[command(
    name = "merge_spectra",
    about = "Merge spectra batches sharing a wavelength grid",
    long_about = None
)]
struct Args {
    /// Batch files to merge, in order
    #[arg(long, num_args = 1..)]
    flist: Vec<PathBuf>,

    /// Directory searched recursively for *templates* files
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Merged output file
    #[arg(long, default_value = "spectra.json")]
    out: PathBuf,

    /// Keep only the first row of each TARGETID
    #[arg(long)]
    dedup: bool,

    /// Delete the inputs after a successful merge
    #[arg(long)]
    rm: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut paths = args.flist.clone();
    if let Some(dir) = &args.dir {
        let found = find_template_files(dir)?;
        log::info!("Found {} batch files under {}", found.len(), dir.display());
        paths.extend(found);
    }
    if paths.is_empty() {
        return Err("nothing to merge: give --flist or --dir".into());
    }

    let merged = merge_files(
        &paths,
        &args.out,
        MergeOptions { dedup: args.dedup },
        args.rm,
    )?;
    log::info!(
        "Merged {} files into {} spectra",
        paths.len(),
        merged.len()
    );
    Ok(())
}
