//! Procedural market-data simulator
//!
//! Produces the bounded OHLCV path each round is played against: a clamped
//! GBM close-to-close walk with randomized wicks and body-correlated volume.
//! Tuned for plausible-looking charts, not statistical realism.

mod rng;

pub use rng::{next_standard_normal, SeededUniform, ThreadRngUniform, UniformSource};

use anyhow::{bail, Result};

use crate::types::{Bar, Path};

/// Parameters of the stochastic return model
#[derive(Debug, Clone)]
pub struct GbmParams {
    /// Drift per step
    pub mu: f64,
    /// Volatility per step
    pub sigma: f64,
    /// Hard cap on the fractional close-to-open move
    pub max_move: f64,
    /// Lower bound of the starting price
    pub start_base: f64,
    /// Width of the uniform band added to the starting price
    pub start_span: f64,
}

impl Default for GbmParams {
    fn default() -> Self {
        Self {
            mu: 0.0005,
            sigma: 0.02,
            max_move: 0.035,
            start_base: 100.0,
            start_span: 20.0,
        }
    }
}

/// Stochastic OHLCV path generator
pub struct PathGenerator {
    params: GbmParams,
    rng: Box<dyn UniformSource>,
}

impl Default for PathGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl PathGenerator {
    /// Generator with default parameters and the thread-local RNG
    pub fn new() -> Self {
        Self::with_source(ThreadRngUniform)
    }

    /// Generator drawing from the given uniform source
    pub fn with_source(rng: impl UniformSource + 'static) -> Self {
        Self {
            params: GbmParams::default(),
            rng: Box::new(rng),
        }
    }

    /// Override the return-model parameters
    pub fn with_params(mut self, params: GbmParams) -> Self {
        self.params = params;
        self
    }

    /// Generate a fresh path of `count` bars.
    ///
    /// Every returned path is a new allocation; previously returned paths are
    /// never touched. Fails fast on a zero count or a non-positive price
    /// before any bar is built.
    pub fn generate(&mut self, count: usize) -> Result<Path> {
        if count == 0 {
            bail!("bar count must be at least 1, got {}", count);
        }

        let start = self.params.start_base + self.rng.next_uniform() * self.params.start_span;
        let mut bars = Vec::with_capacity(count);
        let mut prev_close = start;

        for _ in 0..count {
            let open = prev_close;
            if open <= 0.0 {
                bail!("non-positive open price {}; check model parameters", open);
            }

            let z = next_standard_normal(self.rng.as_mut());
            let ret = ((self.params.mu - 0.5 * self.params.sigma * self.params.sigma)
                + self.params.sigma * z)
                .exp();
            let mut close = open * ret;

            // Bound single-step moves so one bar can never dominate the chart
            let clamp = ((close - open) / open).clamp(-self.params.max_move, self.params.max_move);
            close = open * (1.0 + clamp);

            let body = (close - open).abs();
            let wick_amp = body * (0.6 + self.rng.next_uniform() * 1.2)
                + open * (0.001 + self.rng.next_uniform() * 0.004);

            let high = open.max(close) + wick_amp * (0.4 + self.rng.next_uniform() * 0.8);
            let low = open.min(close) - wick_amp * (0.4 + self.rng.next_uniform() * 0.8);

            // Volume tracks relative body size plus noise
            let vol_base = 1_000.0 + self.rng.next_uniform() * 2_000.0;
            let volume = vol_base * (0.7 + (body / open) * 180.0 + self.rng.next_uniform() * 0.6);

            bars.push(Bar {
                open,
                high,
                low,
                close,
                volume,
            });
            prev_close = close;
        }

        Ok(bars)
    }
}
