//! Target bit definitions and their observing conditions

use serde::{Deserialize, Serialize};

/// Observing-condition bits a target may be observed in
pub struct ObsConditions;

impl ObsConditions {
    pub const DARK: u64 = 1 << 0;
    pub const GRAY: u64 = 1 << 1;
    pub const BRIGHT: u64 = 1 << 2;
    pub const POOR: u64 = 1 << 3;
    pub const TWILIGHT12: u64 = 1 << 4;
    pub const TWILIGHT18: u64 = 1 << 5;

    pub const ALL: u64 = Self::DARK
        | Self::GRAY
        | Self::BRIGHT
        | Self::POOR
        | Self::TWILIGHT12
        | Self::TWILIGHT18;

    /// Mask for a list of condition names such as `["DARK", "GRAY"]`
    pub fn mask(names: &[&str]) -> Option<u64> {
        names.iter().try_fold(0u64, |acc, name| {
            let bit = match name.to_ascii_uppercase().as_str() {
                "DARK" => Self::DARK,
                "GRAY" => Self::GRAY,
                "BRIGHT" => Self::BRIGHT,
                "POOR" => Self::POOR,
                "TWILIGHT12" => Self::TWILIGHT12,
                "TWILIGHT18" => Self::TWILIGHT18,
                _ => return None,
            };
            Some(acc | bit)
        })
    }
}

/// One named bit of a target mask
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetBit {
    pub name: &'static str,
    pub bit: u32,
    /// Conditions this target class may be observed in
    pub obsconditions: u64,
}

impl TargetBit {
    const fn new(name: &'static str, bit: u32, obsconditions: u64) -> Self {
        Self {
            name,
            bit,
            obsconditions,
        }
    }

    pub const fn mask(&self) -> u64 {
        1 << self.bit
    }

    /// Whether this bit is set in `value`
    pub fn is_set(&self, value: i64) -> bool {
        (value as u64) & self.mask() != 0
    }
}

const DARK: u64 = ObsConditions::DARK;
const DARK_GRAY: u64 = ObsConditions::DARK | ObsConditions::GRAY;
const BRIGHT: u64 = ObsConditions::BRIGHT;

/// Primary survey target bits (`DESI_TARGET`)
pub struct DesiMask;

impl DesiMask {
    pub const LRG: TargetBit = TargetBit::new("LRG", 0, DARK);
    pub const ELG: TargetBit = TargetBit::new("ELG", 1, DARK_GRAY);
    pub const QSO: TargetBit = TargetBit::new("QSO", 2, DARK);

    pub const LRG_NORTH: TargetBit = TargetBit::new("LRG_NORTH", 8, DARK);
    pub const ELG_NORTH: TargetBit = TargetBit::new("ELG_NORTH", 9, DARK_GRAY);
    pub const QSO_NORTH: TargetBit = TargetBit::new("QSO_NORTH", 10, DARK);

    pub const LRG_SOUTH: TargetBit = TargetBit::new("LRG_SOUTH", 16, DARK);
    pub const ELG_SOUTH: TargetBit = TargetBit::new("ELG_SOUTH", 17, DARK_GRAY);
    pub const QSO_SOUTH: TargetBit = TargetBit::new("QSO_SOUTH", 18, DARK);

    pub const SKY: TargetBit = TargetBit::new("SKY", 32, ObsConditions::ALL);

    pub const BGS_ANY: TargetBit = TargetBit::new("BGS_ANY", 60, BRIGHT);
    pub const MWS_ANY: TargetBit = TargetBit::new("MWS_ANY", 61, BRIGHT);

    pub const ALL: [TargetBit; 12] = [
        Self::LRG,
        Self::ELG,
        Self::QSO,
        Self::LRG_NORTH,
        Self::ELG_NORTH,
        Self::QSO_NORTH,
        Self::LRG_SOUTH,
        Self::ELG_SOUTH,
        Self::QSO_SOUTH,
        Self::SKY,
        Self::BGS_ANY,
        Self::MWS_ANY,
    ];

    pub fn by_name(name: &str) -> Option<TargetBit> {
        Self::ALL.into_iter().find(|b| b.name == name)
    }
}

/// Bright galaxy survey bits (`BGS_TARGET`)
pub struct BgsMask;

impl BgsMask {
    pub const BGS_FAINT: TargetBit = TargetBit::new("BGS_FAINT", 0, BRIGHT);
    pub const BGS_BRIGHT: TargetBit = TargetBit::new("BGS_BRIGHT", 1, BRIGHT);

    pub const BGS_FAINT_NORTH: TargetBit = TargetBit::new("BGS_FAINT_NORTH", 8, BRIGHT);
    pub const BGS_BRIGHT_NORTH: TargetBit = TargetBit::new("BGS_BRIGHT_NORTH", 9, BRIGHT);

    pub const BGS_FAINT_SOUTH: TargetBit = TargetBit::new("BGS_FAINT_SOUTH", 16, BRIGHT);
    pub const BGS_BRIGHT_SOUTH: TargetBit = TargetBit::new("BGS_BRIGHT_SOUTH", 17, BRIGHT);

    pub const ALL: [TargetBit; 6] = [
        Self::BGS_FAINT,
        Self::BGS_BRIGHT,
        Self::BGS_FAINT_NORTH,
        Self::BGS_BRIGHT_NORTH,
        Self::BGS_FAINT_SOUTH,
        Self::BGS_BRIGHT_SOUTH,
    ];

    pub fn by_name(name: &str) -> Option<TargetBit> {
        Self::ALL.into_iter().find(|b| b.name == name)
    }
}

/// Imaging footprint a target was selected in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    North,
    #[default]
    South,
}

impl Region {
    /// Photometric system code stored in the `PHOTSYS` column
    pub fn photsys(&self) -> &'static str {
        match self {
            Region::North => "N",
            Region::South => "S",
        }
    }

    /// Regional sub-variant of a primary target bit
    pub fn variant(&self, primary: TargetBit) -> Option<TargetBit> {
        let name = format!(
            "{}_{}",
            primary.name,
            match self {
                Region::North => "NORTH",
                Region::South => "SOUTH",
            }
        );
        DesiMask::by_name(&name).or_else(|| BgsMask::by_name(&name))
    }
}
