use anyhow::Result;
use anyhow::bail;
use clap::Args;

use cg_kinetics::DiffusionConfig;
use cg_kinetics::InitializationConfig;
use cg_kinetics::ReactionConfig;
use cg_kinetics::SeedType;
use cg_kinetics::SimulationConfig;
use cg_kinetics::SolverConfig;
use cg_kinetics::SystemConfig;

#[derive(Debug, Args)]
pub struct SystemArguments {
    /// Box dimensions NX NY NZ.
    #[arg(long, value_name = "N", num_args = 3, default_values_t = [10, 10, 10])]
    pub box_size: Vec<usize>,

    /// Chebyshev neighbor limit L (neighborhood side 2L + 1).
    #[arg(long, default_value_t = 2)]
    pub neighbor_limit: usize,
}

#[derive(Debug, Args)]
pub struct SolverArguments {
    /// Number of kMC cycles to run.
    #[arg(long, default_value_t = 10_000)]
    pub cycles: u64,

    /// Dump a snapshot every this many cycles.
    #[arg(long, default_value_t = 1_000)]
    pub cycles_per_output: u64,

    /// RNG seed. Taken from the clock when absent.
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Debug, Args)]
pub struct InitializationArguments {
    /// Probability of spawning a free particle per eligible site.
    #[arg(long, default_value_t = 0.02)]
    pub saturation: f64,

    /// Crystal seed cube size relative to the box (must stay below 1).
    #[arg(long, default_value_t = 0.2)]
    pub seed_size: f64,
}

#[derive(Debug, Args)]
pub struct ReactionArguments {
    /// Inverse temperature.
    #[arg(long, default_value_t = 0.5)]
    pub beta: f64,

    /// Attempt frequency prefactor (must be > 0).
    #[arg(long, default_value_t = 1.0)]
    pub rate_scale: f64,

    /// Pair potential exponent.
    #[arg(long, default_value_t = 6.0)]
    pub r_power: f64,

    /// Pair potential strength.
    #[arg(long, default_value_t = 1.0)]
    pub potential_scale: f64,
}

/// Assemble a full configuration from the flag groups.
pub fn build_config(
    system: &SystemArguments,
    solver: &SolverArguments,
    initialization: &InitializationArguments,
    reactions: &ReactionArguments,
) -> Result<SimulationConfig> {
    if system.box_size.len() != 3 {
        bail!("--box-size takes exactly three dimensions");
    }
    let config = SimulationConfig {
        system: SystemConfig {
            box_size: [system.box_size[0], system.box_size[1], system.box_size[2]],
            n_neighbors_limit: system.neighbor_limit,
        },
        solver: SolverConfig {
            n_cycles: solver.cycles,
            cycles_per_output: solver.cycles_per_output,
            seed_type: if solver.seed.is_some() {
                SeedType::Specific
            } else {
                SeedType::FromTime
            },
            specific_seed: solver.seed,
        },
        initialization: InitializationConfig {
            saturation: initialization.saturation,
            relative_seed_size: initialization.seed_size,
        },
        reactions: ReactionConfig {
            beta: reactions.beta,
            linear_rate_scale: reactions.rate_scale,
            diffusion: DiffusionConfig {
                r_power: reactions.r_power,
                scale: reactions.potential_scale,
            },
        },
    };
    config.validate()?;
    Ok(config)
}


#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> (
        SystemArguments,
        SolverArguments,
        InitializationArguments,
        ReactionArguments,
    ) {
        (
            SystemArguments { box_size: vec![10, 10, 10], neighbor_limit: 2 },
            SolverArguments { cycles: 100, cycles_per_output: 10, seed: Some(7) },
            InitializationArguments { saturation: 0.02, seed_size: 0.2 },
            ReactionArguments {
                beta: 0.5,
                rate_scale: 1.0,
                r_power: 6.0,
                potential_scale: 1.0,
            },
        )
    }

    #[test]
    fn test_build_config_from_flags() {
        let (system, solver, initialization, reactions) = defaults();
        let config = build_config(&system, &solver, &initialization, &reactions).unwrap();
        assert_eq!(config.system.box_size, [10, 10, 10]);
        assert_eq!(config.solver.seed_type, SeedType::Specific);
        assert_eq!(config.resolve_seed().unwrap(), 7);
    }

    #[test]
    fn test_absent_seed_falls_back_to_clock() {
        let (system, mut solver, initialization, reactions) = defaults();
        solver.seed = None;
        let config = build_config(&system, &solver, &initialization, &reactions).unwrap();
        assert_eq!(config.solver.seed_type, SeedType::FromTime);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let (system, solver, mut initialization, reactions) = defaults();
        initialization.seed_size = 1.2;
        assert!(build_config(&system, &solver, &initialization, &reactions).is_err());
    }
}
