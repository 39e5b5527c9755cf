use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::StandardNormal;

/// The simulator's random source: one uniform stream and one standard
/// normal stream, both derived from a single integer seed so a run is
/// reproducible from its seed alone.
///
/// The uniform stream is seeded with three times the base seed, keeping the
/// two streams decoupled the same way the original twin-generator setup did.
#[derive(Debug)]
pub struct KmcRng {
    seed: u64,
    uniform: StdRng,
    normal: StdRng,
}

impl KmcRng {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            uniform: StdRng::seed_from_u64(seed.wrapping_mul(3)),
            normal: StdRng::seed_from_u64(seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform sample in [0, 1).
    pub fn uniform(&mut self) -> f64 {
        self.uniform.random::<f64>()
    }

    /// Standard normal sample.
    pub fn normal(&mut self) -> f64 {
        self.normal.sample(StandardNormal)
    }
}
