use log::info;
use log::warn;

use cg_lattice::BoundarySet;
use cg_lattice::Geometry;
use cg_rates::Arrhenius;
use cg_rates::PairPotential;
use cg_rates::RateModel;

use crate::ConfigError;
use crate::KmcRng;
use crate::RateIndex;
use crate::SimulationConfig;
use crate::SiteLattice;
use crate::trace::StepRecord;
use crate::trace::TraceBuffer;

/// Run-scoped parameters the solver keeps next to the lattice.
#[derive(Debug, Clone, Copy)]
pub struct RunParameters {
    pub n_cycles: u64,
    pub cycles_per_output: u64,
    pub saturation: f64,
    pub relative_seed_size: f64,
}

impl RunParameters {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            n_cycles: config.solver.n_cycles,
            cycles_per_output: config.solver.cycles_per_output,
            saturation: config.initialization.saturation,
            relative_seed_size: config.initialization.relative_seed_size,
        }
    }
}

/// The top-level kMC loop: seed the lattice, then repeatedly rebuild the
/// rate index, draw one reaction, execute it and advance simulated time by
/// the inverse total rate.
///
/// Each step selects against a frozen snapshot of the rate index; the
/// lattice mutates only through `execute` between snapshots. All state that
/// the original kept in statics lives on this struct (or the lattice it
/// owns), so solvers can coexist and tests stay deterministic.
pub struct Solver<K: RateModel> {
    lattice: SiteLattice<K>,
    boundaries: BoundarySet,
    rate_index: RateIndex,
    rng: KmcRng,
    parameters: RunParameters,
    cycle: u64,
    time: f64,
    initialized: bool,
    trace: TraceBuffer,
}

impl Solver<Arrhenius> {
    /// Build a solver with Arrhenius kinetics from a validated
    /// configuration. Fails on any configuration or geometry error.
    pub fn from_config(config: &SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let geometry = Geometry::new(
            config.system.box_size,
            config.system.n_neighbors_limit,
        )?;
        let potential = PairPotential::new(
            geometry.limit(),
            config.reactions.diffusion.r_power,
            config.reactions.diffusion.scale,
        );
        let model = Arrhenius::new(
            config.reactions.beta,
            config.reactions.linear_rate_scale,
        );
        let rng = KmcRng::new(config.resolve_seed()?);
        let lattice = SiteLattice::new(geometry, potential, model);

        Ok(Self::new(lattice, rng, RunParameters::from_config(config)))
    }
}

impl<K: RateModel> Solver<K> {
    pub fn new(lattice: SiteLattice<K>, rng: KmcRng, parameters: RunParameters) -> Self {
        assert!(parameters.cycles_per_output > 0, "cyclesPerOutput must be positive");
        let boundaries = BoundarySet::periodic();
        boundaries
            .check_compatibility()
            .expect("periodic faces are mutually compatible");
        Self {
            lattice,
            boundaries,
            rate_index: RateIndex::new(),
            rng,
            parameters,
            cycle: 0,
            time: 0.0,
            initialized: false,
            trace: TraceBuffer::disabled(),
        }
    }

    pub fn lattice(&self) -> &SiteLattice<K> {
        &self.lattice
    }

    /// Mutable lattice access, for setups that place particles by hand
    /// before (or instead of) the configured seeding.
    pub fn lattice_mut(&mut self) -> &mut SiteLattice<K> {
        &mut self.lattice
    }

    pub fn rate_index(&self) -> &RateIndex {
        &self.rate_index
    }

    pub fn parameters(&self) -> &RunParameters {
        &self.parameters
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Simulated time accumulated so far.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn trace(&self) -> &TraceBuffer {
        &self.trace
    }

    /// Keep the most recent `capacity` step records around.
    pub fn enable_trace(&mut self, capacity: usize) {
        self.trace = TraceBuffer::bounded(capacity);
    }

    /// Seed the crystal: a fixed crystal particle at the box center, a
    /// centered cube of activations of half-extent `floor(N*rel/2)` per
    /// axis, and outside an exclusion ring of one neighbor limit around
    /// that cube, independent activations with probability `saturation`
    /// wherever spawning is legal.
    pub fn initialize(&mut self) {
        assert!(!self.initialized, "solver initialized twice");

        let geometry = self.lattice.geometry().clone();
        self.boundaries.initialize(&geometry);

        let (cx, cy, cz) = geometry.center();
        self.lattice.spawn_as_fixed_crystal(geometry.index_of(cx, cy, cz));

        let rel = self.parameters.relative_seed_size;
        let hx = (geometry.nx() as f64 * rel / 2.0) as i64;
        let hy = (geometry.ny() as f64 * rel / 2.0) as i64;
        let hz = (geometry.nz() as f64 * rel / 2.0) as i64;

        for dx in -hx..hx {
            for dy in -hy..hy {
                for dz in -hz..hz {
                    let (x, y, z) = geometry.translate((cx, cy, cz), (dx, dy, dz));
                    let index = geometry.index_of(x, y, z);
                    if !self.lattice.site(index).is_active() {
                        self.lattice.activate(index);
                    }
                }
            }
        }

        let limit = geometry.limit() as i64;
        for index in 0..self.lattice.len() {
            let (dx, dy, dz) = geometry.distance((cx, cy, cz), geometry.coords_of(index));
            let excluded = (-hx - limit..hx + limit).contains(&dx)
                && (-hy - limit..hy + limit).contains(&dy)
                && (-hz - limit..hz + limit).contains(&dz);
            if excluded {
                continue;
            }
            if self.rng.uniform() < self.parameters.saturation
                && self.lattice.is_legal_to_spawn(index)
            {
                self.lattice.activate(index);
            }
        }

        self.lattice.refresh_all_reactions();
        self.initialized = true;

        info!("initialized {} active sites", self.lattice.total_active_sites());
    }

    /// One kMC step with the next uniform draw from the solver's stream.
    /// Returns false when no reaction is eligible anywhere.
    pub fn step(&mut self) -> bool {
        assert!(self.initialized, "stepping an unseeded solver");
        let u = self.rng.uniform();
        self.step_with_draw(u)
    }

    /// One kMC step with an injected uniform draw in [0, 1). Drains any
    /// pending affected sites, rebuilds the rate index, selects by binary
    /// search over the cumulative rates, executes, and advances time.
    pub fn step_with_draw(&mut self, u: f64) -> bool {
        assert!(self.initialized, "stepping an unseeded solver");

        self.lattice.process_affected();
        self.rate_index.rebuild(&self.lattice);
        if self.rate_index.is_empty() {
            warn!("no eligible reactions left at cycle {}", self.cycle);
            return false;
        }

        let k_tot = self.rate_index.k_tot();
        let choice = self.rate_index.choose(k_tot * u);
        let (origin, position) = self.rate_index.reaction(choice);

        let origin_coords = self.lattice.site(origin).coords();
        let destination = self.lattice.site(origin).reactions()[position].destination();
        let destination_coords = self.lattice.site(destination).coords();

        self.lattice.execute(origin, position);
        self.boundaries.update();

        self.time += self.lattice.rate_model().attempt_frequency() / k_tot;
        self.trace.push(StepRecord {
            cycle: self.cycle,
            time: self.time,
            k_tot,
            choice,
            origin: origin_coords,
            destination: destination_coords,
        });
        self.cycle += 1;
        true
    }

    /// Seed if necessary, then step for the configured number of cycles,
    /// handing a snapshot to `on_output` every `cycles_per_output` cycles.
    pub fn run<F>(&mut self, mut on_output: F)
    where
        F: FnMut(u64, f64, &SiteLattice<K>),
    {
        if !self.initialized {
            self.initialize();
        }
        while self.cycle < self.parameters.n_cycles {
            let executing = self.cycle;
            if !self.step() {
                break;
            }
            if executing % self.parameters.cycles_per_output == 0 {
                on_output(self.cycle, self.time, &self.lattice);
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::DiffusionConfig;
    use crate::InitializationConfig;
    use crate::ReactionConfig;
    use crate::SeedType;
    use crate::SolverConfig;
    use crate::SystemConfig;

    fn config(
        n: usize,
        limit: usize,
        n_cycles: u64,
        saturation: f64,
        relative_seed_size: f64,
        seed: u64,
    ) -> SimulationConfig {
        SimulationConfig {
            system: SystemConfig {
                box_size: [n, n, n],
                n_neighbors_limit: limit,
            },
            solver: SolverConfig {
                n_cycles,
                cycles_per_output: 1,
                seed_type: SeedType::Specific,
                specific_seed: Some(seed),
            },
            initialization: InitializationConfig {
                saturation,
                relative_seed_size,
            },
            reactions: ReactionConfig {
                beta: 1.0,
                linear_rate_scale: 1.0,
                diffusion: DiffusionConfig { r_power: 3.0, scale: 1.0 },
            },
        }
    }

    #[test]
    fn test_seed_only_init_on_tiny_box() {
        // 3x3x3, L = 1, saturation 0, seed size 0.6: the truncated cube
        // half-extent is zero, so only the fixed seed appears. Every other
        // site of the tiny box touches it and turns surface.
        let mut solver = Solver::from_config(&config(3, 1, 0, 0.0, 0.6, 1)).unwrap();
        solver.initialize();

        let lattice = solver.lattice();
        let center = lattice.site_at(1, 1, 1);
        assert!(center.is_crystal() && center.is_active() && center.is_seed());
        let surfaces = lattice.sites().iter().filter(|s| s.is_surface()).count();
        assert_eq!(surfaces, 26);
        assert_eq!(lattice.total_active_sites(), 1);
        assert_eq!(lattice.total_energy(), 0.0);
        lattice.verify_bookkeeping();
    }

    #[test]
    fn test_first_bucket_draw_executes_reaction_zero() {
        let mut solver = Solver::from_config(&config(3, 1, 1, 0.0, 0.6, 1)).unwrap();
        solver.enable_trace(4);
        solver.initialize();

        // 26 unblocked hops off the seed, all with unit rate
        assert!(solver.step_with_draw(0.001));
        let record = *solver.trace().latest().unwrap();
        assert_eq!(record.choice, 0);
        assert_eq!(record.k_tot, 26.0);
        assert_eq!(record.origin, (1, 1, 1));
        assert_eq!(record.destination, (0, 0, 0));
        assert_eq!(solver.time(), 1.0 / 26.0);
        assert_eq!(solver.lattice().total_active_sites(), 1);
        assert!(solver.lattice().site_at(0, 0, 0).is_active());
    }

    #[test]
    fn test_run_executes_the_configured_cycles() {
        let mut solver = Solver::from_config(&config(6, 1, 25, 0.0, 0.5, 9)).unwrap();
        let mut outputs = 0;
        solver.run(|_, _, lattice| {
            outputs += 1;
            assert!(lattice.total_active_sites() > 0);
        });
        assert_eq!(solver.cycle(), 25);
        assert_eq!(outputs, 25); // cycles_per_output = 1
        assert!(solver.time() > 0.0);
        solver.lattice().verify_bookkeeping();
    }

    #[test]
    fn test_long_run_keeps_every_invariant() {
        // 10^3 box, L = 2: a seeded crystal plus sprinkled solution, run for
        // 1000 cycles, then audited from scratch.
        let mut solver = Solver::from_config(&config(10, 2, 1000, 0.05, 0.3, 1337)).unwrap();
        solver.run(|_, _, _| {});
        assert_eq!(solver.cycle(), 1000);

        let lattice = solver.lattice();
        lattice.verify_bookkeeping();

        // the cumulative-rate vector stays sorted with kTot on top
        let mut index = RateIndex::new();
        index.rebuild(lattice);
        let cumulative = index.cumulative();
        assert!(!cumulative.is_empty());
        for pair in cumulative.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
        assert_eq!(*cumulative.last().unwrap(), index.k_tot());
    }

    #[test]
    fn test_binary_search_matches_linear_scan_on_seeded_lattice() {
        let mut solver = Solver::from_config(&config(10, 2, 0, 0.08, 0.3, 77)).unwrap();
        solver.initialize();

        let mut index = RateIndex::new();
        index.rebuild(solver.lattice());
        assert!(index.len() > 100);

        let mut rng = KmcRng::new(5);
        for _ in 0..100_000 {
            let target = index.k_tot() * rng.uniform();
            assert_eq!(index.choose(target), index.choose_linear(target));
        }
    }

    #[test]
    fn test_bucket_midpoints_resolve_to_their_own_reaction() {
        // the midpoint of every cumulative bucket must select that bucket,
        // and the handle must agree with a manual walk over the sites
        let mut solver = Solver::from_config(&config(10, 2, 0, 0.05, 0.3, 21)).unwrap();
        solver.initialize();

        let mut index = RateIndex::new();
        index.rebuild(solver.lattice());

        let walk: Vec<(usize, usize)> = solver
            .lattice()
            .sites()
            .iter()
            .flat_map(|site| {
                site.active_reactions()
                    .iter()
                    .map(move |&position| (site.index(), position))
            })
            .collect();
        assert_eq!(walk.len(), index.len());

        let mut previous = 0.0;
        for (choice, &accumulated) in index.cumulative().iter().enumerate() {
            let target = (previous + accumulated) / 2.0;
            assert_eq!(index.choose(target), choice);
            assert_eq!(index.reaction(choice), walk[choice]);
            previous = accumulated;
        }
    }

    #[test]
    fn test_seed_shell_layout_and_reaction_count() {
        // Seed only, then a full shell of particles at Chebyshev distance
        // two. Crystal at distance zero, surface at one, live solution at
        // two. The enabled hop count then matches the surface shell's
        // neighbor tally plus the eight corner hops onto isolated sites.
        let mut solver = Solver::from_config(&config(10, 2, 0, 0.0, 0.0, 4)).unwrap();
        solver.initialize();

        let center = solver.lattice().geometry().center();
        let shell: Vec<usize> = solver
            .lattice()
            .sites()
            .iter()
            .filter(|s| solver.lattice().geometry().chebyshev(s.coords(), center) == 2)
            .map(|s| s.index())
            .collect();
        assert_eq!(shell.len(), 98);
        for index in shell {
            solver.lattice_mut().activate(index);
        }

        let lattice = solver.lattice();
        let mut surface_neighbor_sum = 0u32;
        for site in lattice.sites() {
            match lattice.geometry().chebyshev(site.coords(), center) {
                0 => assert!(site.is_crystal()),
                1 => {
                    assert!(site.is_surface() && !site.is_active());
                    surface_neighbor_sum += site.n_neighbors(0);
                }
                2 => assert!(site.is_solution() && site.is_active()),
                _ => assert!(!site.is_active()),
            }
        }

        let enabled: usize = lattice
            .sites()
            .iter()
            .map(|s| s.active_reactions().len())
            .sum();
        assert_eq!(enabled, surface_neighbor_sum as usize + 8);
        lattice.verify_bookkeeping();
    }

    #[test]
    fn test_identical_seeds_reproduce_bitwise() {
        let run = |seed: u64| {
            let mut solver =
                Solver::from_config(&config(8, 1, 200, 0.1, 0.25, seed)).unwrap();
            solver.run(|_, _, _| {});
            (solver.time(), solver.lattice().total_energy())
        };
        assert_eq!(run(11), run(11));
        assert_ne!(run(11), run(12));
    }
}
