use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use clap::ArgAction;
use clap::Parser;
use colored::*;
use env_logger::Builder;
use indicatif::ProgressBar;
use indicatif::ProgressStyle;
use log::LevelFilter;
use log::debug;

use cg_kinetics::SimulationConfig;
use cg_kinetics::Solver;
use cg_kinetics::trajectory::XyzWriter;

use crystalgrow::config_parsers::InitializationArguments;
use crystalgrow::config_parsers::ReactionArguments;
use crystalgrow::config_parsers::SolverArguments;
use crystalgrow::config_parsers::SystemArguments;
use crystalgrow::config_parsers::build_config;

#[derive(Debug, Parser)]
#[command(name = "cg-grow")]
#[command(version, about = "Kinetic Monte Carlo crystal growth on a periodic lattice")]
pub struct Cli {
    /// Configuration file (JSON). Flags below are used when absent.
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Directory for trajectory snapshots.
    #[arg(long, default_value = "outfiles")]
    outdir: PathBuf,

    /// Print the last N executed reactions when the run finishes.
    #[arg(long, value_name = "N", default_value_t = 0)]
    trace: usize,

    /// Verbosity (-v = info, -vv = debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[command(flatten, next_help_heading = "System")]
    system: SystemArguments,

    #[command(flatten, next_help_heading = "Solver")]
    solver: SolverArguments,

    #[command(flatten, next_help_heading = "Initialization")]
    initialization: InitializationArguments,

    #[command(flatten, next_help_heading = "Reactions")]
    reactions: ReactionArguments,
}

fn init_logging(verbosity: u8) {
    // -v raises the floor; RUST_LOG still wins when set
    let floor = [LevelFilter::Warn, LevelFilter::Info, LevelFilter::Debug];
    let floor = floor[(verbosity as usize).min(floor.len() - 1)];

    Builder::new()
        .filter_level(floor)
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => SimulationConfig::from_path(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => build_config(&cli.system, &cli.solver, &cli.initialization, &cli.reactions)?,
    };
    debug!("{:#?}", config);

    let mut solver = Solver::from_config(&config)?;
    if cli.trace > 0 {
        solver.enable_trace(cli.trace);
    }

    solver.initialize();
    println!(
        "Initialized {} active sites in a {}x{}x{} box.",
        solver.lattice().total_active_sites().to_string().green(),
        config.system.box_size[0],
        config.system.box_size[1],
        config.system.box_size[2],
    );

    let mut writer = XyzWriter::new(&cli.outdir, "kMC")?;
    writer.dump(solver.lattice())?;

    let pb = ProgressBar::new(config.solver.n_cycles);
    pb.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] {bar:38.green/white} {pos}/{len} cycles ({eta} left)",
        )
        .unwrap()
        .progress_chars("=> "),
    );

    solver.run(|cycle, _time, lattice| {
        pb.set_position(cycle);
        if let Err(e) = writer.dump(lattice) {
            pb.suspend(|| eprintln!("{} {}", "snapshot failed:".red(), e));
        }
    });
    pb.finish();

    println!(
        "Ran {} cycles to t = {}, {} particles, total energy {}.",
        solver.cycle().to_string().green(),
        format!("{:.6e}", solver.time()).cyan(),
        solver.lattice().total_active_sites().to_string().green(),
        format!("{:.6}", solver.lattice().total_energy()).cyan(),
    );
    println!("{} snapshots in {}.", writer.count(), cli.outdir.display());

    if cli.trace > 0 {
        println!("Last {} reactions:", solver.trace().len());
        for record in solver.trace().iter() {
            println!("  {}", record);
        }
    }

    Ok(())
}
