//! Randomness sources for the market simulator
//!
//! All stochastic draws go through the `UniformSource` capability so tests can
//! substitute a seeded generator for the ambient thread RNG.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Uniform(0,1) draw capability injected into the simulator
pub trait UniformSource: Send {
    /// Next uniform sample in [0, 1)
    fn next_uniform(&mut self) -> f64;
}

/// Default source backed by the thread-local RNG
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngUniform;

impl UniformSource for ThreadRngUniform {
    fn next_uniform(&mut self) -> f64 {
        rand::thread_rng().gen()
    }
}

/// Deterministic source for reproducible paths
#[derive(Debug, Clone)]
pub struct SeededUniform {
    rng: StdRng,
}

impl SeededUniform {
    /// Create a source from a fixed seed
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl UniformSource for SeededUniform {
    fn next_uniform(&mut self) -> f64 {
        self.rng.gen()
    }
}

/// Draw one standard-normal deviate via the Box-Muller transform.
///
/// Both uniforms are redrawn until strictly positive so the logarithm never
/// sees zero.
pub fn next_standard_normal(rng: &mut dyn UniformSource) -> f64 {
    let mut u = 0.0;
    while u <= 0.0 {
        u = rng.next_uniform();
    }
    let mut v = 0.0;
    while v <= 0.0 {
        v = rng.next_uniform();
    }
    (-2.0 * u.ln()).sqrt() * (2.0 * std::f64::consts::PI * v).cos()
}
