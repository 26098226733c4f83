//! Generate mock spectra and targets for one or more object classes
//!
//! Each class is read from `{mock-dir}/{CLASS}.json`, restricted to the
//! requested HEALPix pixels, synthesized and selected. One batch per class is
//! written to `{path}/{class}-templates.json` and the merged result to
//! `{path}/{fname}`.

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use mocksim::config::ClassConfig;
use mocksim::io::save_batch;
use mocksim::shared_args::SkyArgs;
use mocksim::{
    run_all, AnalyticTemplates, ClassStatus, ObjectClass, PipelineConfig, ResourceCache,
};

#[derive(Parser, Debug)]
#[command(
    name = "make_spectra",
    about = "Generate mock spectra and target catalogs from simulated sky catalogs",
    long_about = None
)]
struct Args {
    /// Number of objects of every class (overridden per class)
    #[arg(long)]
    nall: Option<usize>,

    #[arg(long)]
    nqso: Option<usize>,

    #[arg(long)]
    nlrg: Option<usize>,

    #[arg(long)]
    nelg: Option<usize>,

    #[arg(long)]
    nbgs: Option<usize>,

    #[arg(long)]
    nsky: Option<usize>,

    #[command(flatten)]
    sky: SkyArgs,

    /// Directory of mock catalogs named {CLASS}.json
    #[arg(long, default_value = ".")]
    mock_dir: PathBuf,

    /// JSON pipeline configuration; command line flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(long, default_value = ".")]
    path: PathBuf,

    /// Merged output file name
    #[arg(long, default_value = "spectra.json")]
    fname: String,
}

impl Args {
    fn count(&self, class: ObjectClass) -> Option<usize> {
        let specific = match class {
            ObjectClass::Qso => self.nqso,
            ObjectClass::Lrg => self.nlrg,
            ObjectClass::Elg => self.nelg,
            ObjectClass::Bgs => self.nbgs,
            ObjectClass::Sky => self.nsky,
        };
        specific.or(self.nall)
    }

    /// Classes named by a count flag, or `None` when no count was given
    fn classes(&self) -> Option<Vec<ClassConfig>> {
        let classes: Vec<ClassConfig> = ObjectClass::ALL
            .into_iter()
            .filter_map(|class| {
                self.count(class).map(|n| ClassConfig {
                    class,
                    mockfile: self.mock_dir.join(format!("{}.json", class.name())),
                    nrand: Some(n),
                })
            })
            .collect();
        (!classes.is_empty()).then_some(classes)
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    args.sky.apply(&mut config);
    config.apply_env();
    if let Some(classes) = args.classes() {
        config.classes = classes;
    } else if config.classes.is_empty() {
        config.classes = ObjectClass::ALL
            .into_iter()
            .map(|class| ClassConfig {
                class,
                mockfile: args.mock_dir.join(format!("{}.json", class.name())),
                nrand: None,
            })
            .collect();
    }

    let progress = ProgressBar::new(config.classes.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("█▉▊▋▌▍▎▏ "),
    );
    progress.set_message("Generating classes");

    let cache = ResourceCache::new();
    let report = run_all(&config, Arc::new(AnalyticTemplates::new()), &cache, |outcome| {
        progress.set_message(format!("{} done", outcome.class));
        progress.inc(1);
    })?;
    progress.finish_with_message("All classes done");

    for (class, batch) in &report.batches {
        let path = args
            .path
            .join(format!("{}-templates.json", class.name().to_lowercase()));
        save_batch(batch, &path)?;
    }
    if let Some(merged) = &report.merged {
        save_batch(merged, &args.path.join(&args.fname))?;
    }

    for outcome in &report.outcomes {
        match &outcome.status {
            ClassStatus::Completed { ntargets } => {
                log::info!("{}: {} spectra", outcome.class, ntargets)
            }
            ClassStatus::Empty => log::info!("{}: no objects in the requested pixels", outcome.class),
            ClassStatus::Failed(reason) => log::error!("{}: {}", outcome.class, reason),
        }
    }

    let failed = report.failures().count();
    if failed > 0 {
        return Err(format!("{failed} of {} classes failed", report.outcomes.len()).into());
    }
    Ok(())
}
