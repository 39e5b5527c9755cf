use std::hint::black_box;
use criterion::Criterion;
use criterion::criterion_group;
use criterion::criterion_main;

use cg_kinetics::DiffusionConfig;
use cg_kinetics::InitializationConfig;
use cg_kinetics::ReactionConfig;
use cg_kinetics::SeedType;
use cg_kinetics::SimulationConfig;
use cg_kinetics::Solver;
use cg_kinetics::SolverConfig;
use cg_kinetics::SystemConfig;

fn run_seeded(n: usize, limit: usize, n_cycles: u64) {
    let config = SimulationConfig {
        system: SystemConfig {
            box_size: [n, n, n],
            n_neighbors_limit: limit,
        },
        solver: SolverConfig {
            n_cycles,
            cycles_per_output: n_cycles,
            seed_type: SeedType::Specific,
            specific_seed: Some(42),
        },
        initialization: InitializationConfig {
            saturation: 0.05,
            relative_seed_size: 0.3,
        },
        reactions: ReactionConfig {
            beta: 0.9,
            linear_rate_scale: 1.0,
            diffusion: DiffusionConfig { r_power: 5.0, scale: 1.0 },
        },
    };

    let mut solver = Solver::from_config(&config).expect("valid benchmark config");
    solver.run(|_, _, lattice| {
        black_box(lattice.total_energy());
    });
}

fn step_loop_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("Seeded growth runs.");
    group.bench_function("grow_08_l1_0500", |b| {
        b.iter(|| run_seeded(8, 1, black_box(500)))
    });
    group.bench_function("grow_10_l2_0500", |b| {
        b.iter(|| run_seeded(10, 2, black_box(500)))
    });
    group.bench_function("grow_16_l2_1000", |b| {
        b.iter(|| run_seeded(16, 2, black_box(1000)))
    });
    group.finish();
}

criterion_group!(benches, step_loop_benchmark);
criterion_main!(benches);
