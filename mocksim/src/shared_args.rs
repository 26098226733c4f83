use std::path::PathBuf;

use clap::{Args, ValueEnum};

use crate::config::PipelineConfig;
use crate::selection::Region;

/// Imaging footprint selectable on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RegionArg {
    /// BASS/MzLS photometry
    North,
    /// DECaLS photometry
    South,
}

impl std::fmt::Display for RegionArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegionArg::North => write!(f, "north"),
            RegionArg::South => write!(f, "south"),
        }
    }
}

impl From<RegionArg> for Region {
    fn from(arg: RegionArg) -> Self {
        match arg {
            RegionArg::North => Region::North,
            RegionArg::South => Region::South,
        }
    }
}

/// Sky partition arguments shared by the mock binaries
#[derive(Args, Debug, Clone)]
pub struct SkyArgs {
    /// Master random seed; drawn from the OS when omitted
    #[arg(long)]
    pub seed: Option<u64>,

    /// HEALPix nside for partitioning
    #[arg(long)]
    pub nside: Option<u64>,

    /// HEALPix pixel(s) to generate (repeat or comma-separate); the whole
    /// footprint when omitted
    #[arg(long, value_delimiter = ',')]
    pub healpixel: Vec<u64>,

    /// Directory holding the dust map; falls back to $DUST_DIR
    #[arg(long)]
    pub dust_dir: Option<PathBuf>,

    /// Imaging release root for mask bits
    #[arg(long)]
    pub dr_dir: Option<PathBuf>,

    /// Photometric system of the selection
    #[arg(long, value_enum)]
    pub region: Option<RegionArg>,
}

impl SkyArgs {
    /// Override `config` with whatever was given on the command line
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(nside) = self.nside {
            config.nside = nside;
        }
        if !self.healpixel.is_empty() {
            config.healpixels = self.healpixel.clone();
        }
        if let Some(dir) = &self.dust_dir {
            config.dust_dir = Some(dir.clone());
        }
        if let Some(dir) = &self.dr_dir {
            config.dr_dir = Some(dir.clone());
        }
        if let Some(region) = self.region {
            config.region = region.into();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        sky: SkyArgs,
    }

    #[test]
    fn test_overrides_only_given_fields() {
        let cli = Cli::parse_from(["prog", "--healpixel", "26030,26031", "--region", "north"]);
        let mut config = PipelineConfig {
            seed: Some(5),
            ..PipelineConfig::default()
        };
        cli.sky.apply(&mut config);
        assert_eq!(config.healpixels, vec![26030, 26031]);
        assert_eq!(config.region, Region::North);
        assert_eq!(config.seed, Some(5));
        assert_eq!(config.nside, 64);
    }

    #[test]
    fn test_repeated_healpixel() {
        let cli = Cli::parse_from(["prog", "--healpixel", "1", "--healpixel", "2", "--seed", "9"]);
        let mut config = PipelineConfig::default();
        cli.sky.apply(&mut config);
        assert_eq!(config.healpixels, vec![1, 2]);
        assert_eq!(config.seed, Some(9));
    }
}
