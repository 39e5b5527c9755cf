use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use colored::*;

use cg_kinetics::SimulationConfig;

#[derive(Debug, Parser)]
#[command(name = "cg-config")]
#[command(version, about = "Emit or validate crystalgrow configuration files")]
pub struct Cli {
    /// Validate this configuration file instead of printing the template.
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Write the template here instead of stdout.
    #[arg(long, value_name = "FILE")]
    write: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        let config = SimulationConfig::from_path(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let seed = config.resolve_seed()?;
        println!("{} {}", path.display(), "is valid".green());
        println!(
            "  {}x{}x{} box, L = {}, {} cycles, seed {}",
            config.system.box_size[0],
            config.system.box_size[1],
            config.system.box_size[2],
            config.system.n_neighbors_limit,
            config.solver.n_cycles,
            seed,
        );
        return Ok(());
    }

    let template = serde_json::to_string_pretty(&SimulationConfig::template())?;
    match &cli.write {
        Some(path) => {
            fs::write(path, template + "\n")
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Template written to {}.", path.display());
        }
        None => println!("{}", template),
    }
    Ok(())
}
