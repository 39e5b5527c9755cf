use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;

use cg_lattice::GeometryError;

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Json(serde_json::Error),
    /// `seedType` is `specific` but no `specificSeed` was given.
    SeedNotSet,
    /// `RelativeSeedSize` must stay below 1, the seed cannot exceed the box.
    SeedSizeTooLarge(f64),
    /// `SaturationLevel` is a probability and must lie in [0, 1).
    SaturationOutOfRange(f64),
    /// `cyclesPerOutput` of zero would divide by zero on the output cadence.
    ZeroOutputCadence,
    /// `linearRateScale` must be positive.
    NonPositiveRateScale(f64),
    Geometry(GeometryError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::Json(e) => write!(f, "JSON parse error: {}", e),
            Self::SeedNotSet => write!(f, "Seed not set"),
            Self::SeedSizeTooLarge(v) => {
                write!(f, "RelativeSeedSize {} must be below 1", v)
            }
            Self::SaturationOutOfRange(v) => {
                write!(f, "SaturationLevel {} must lie in [0, 1)", v)
            }
            Self::ZeroOutputCadence => write!(f, "cyclesPerOutput must be positive"),
            Self::NonPositiveRateScale(v) => {
                write!(f, "linearRateScale {} must be positive", v)
            }
            Self::Geometry(e) => write!(f, "{}", e),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::Geometry(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<GeometryError> for ConfigError {
    fn from(e: GeometryError) -> Self {
        Self::Geometry(e)
    }
}

/// How the RNG seed is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SeedType {
    /// Seed from the wall clock at construction. Irreproducible by design.
    FromTime,
    /// Use `specificSeed` verbatim. Required for reproducible runs.
    Specific,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(rename = "BoxSize")]
    pub box_size: [usize; 3],
    #[serde(rename = "nNeighborsLimit")]
    pub n_neighbors_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    #[serde(rename = "nCycles")]
    pub n_cycles: u64,
    #[serde(rename = "cyclesPerOutput")]
    pub cycles_per_output: u64,
    #[serde(rename = "seedType")]
    pub seed_type: SeedType,
    #[serde(rename = "specificSeed", default, skip_serializing_if = "Option::is_none")]
    pub specific_seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializationConfig {
    #[serde(rename = "SaturationLevel")]
    pub saturation: f64,
    #[serde(rename = "RelativeSeedSize")]
    pub relative_seed_size: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffusionConfig {
    #[serde(rename = "rPower")]
    pub r_power: f64,
    pub scale: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionConfig {
    pub beta: f64,
    #[serde(rename = "linearRateScale")]
    pub linear_rate_scale: f64,
    #[serde(rename = "Diffusion")]
    pub diffusion: DiffusionConfig,
}

/// The full simulation configuration, read once at solver construction.
/// Section and key names follow the original configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(rename = "System")]
    pub system: SystemConfig,
    #[serde(rename = "Solver")]
    pub solver: SolverConfig,
    #[serde(rename = "Initialization")]
    pub initialization: InitializationConfig,
    #[serde(rename = "Reactions")]
    pub reactions: ReactionConfig,
}

impl SimulationConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// A small, physically reasonable starting point.
    pub fn template() -> Self {
        Self {
            system: SystemConfig {
                box_size: [10, 10, 10],
                n_neighbors_limit: 2,
            },
            solver: SolverConfig {
                n_cycles: 10_000,
                cycles_per_output: 1_000,
                seed_type: SeedType::FromTime,
                specific_seed: None,
            },
            initialization: InitializationConfig {
                saturation: 0.02,
                relative_seed_size: 0.2,
            },
            reactions: ReactionConfig {
                beta: 0.5,
                linear_rate_scale: 1.0,
                diffusion: DiffusionConfig { r_power: 6.0, scale: 1.0 },
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..1.0).contains(&self.initialization.relative_seed_size) {
            return Err(ConfigError::SeedSizeTooLarge(
                self.initialization.relative_seed_size,
            ));
        }
        if !(0.0..1.0).contains(&self.initialization.saturation) {
            return Err(ConfigError::SaturationOutOfRange(
                self.initialization.saturation,
            ));
        }
        if self.solver.cycles_per_output == 0 {
            return Err(ConfigError::ZeroOutputCadence);
        }
        if self.reactions.linear_rate_scale <= 0.0 {
            return Err(ConfigError::NonPositiveRateScale(
                self.reactions.linear_rate_scale,
            ));
        }
        if self.solver.seed_type == SeedType::Specific
            && self.solver.specific_seed.is_none()
        {
            return Err(ConfigError::SeedNotSet);
        }
        Ok(())
    }

    /// The RNG seed the run will use.
    pub fn resolve_seed(&self) -> Result<u64, ConfigError> {
        match self.solver.seed_type {
            SeedType::Specific => {
                self.solver.specific_seed.ok_or(ConfigError::SeedNotSet)
            }
            SeedType::FromTime => {
                let elapsed = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .expect("system clock before the epoch");
                Ok(elapsed.as_nanos() as u64)
            }
        }
    }
}
