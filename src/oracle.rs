//! Ground-truth labelling for generated paths
//!
//! Fixes the round's correct answer: whether the path netted up or down
//! between the first open and the last close.

use crate::market::{ThreadRngUniform, UniformSource};
use crate::types::{Bar, Direction};

/// Label a path `Up` when the last close finishes at or above the first open.
///
/// An empty path has nothing to compare; it falls back to an unbiased coin
/// flip. Normal operation never hits that branch because the generator always
/// produces at least one bar.
pub fn label(path: &[Bar]) -> Direction {
    label_with(path, &mut ThreadRngUniform)
}

/// `label` with an injected uniform source, so the empty-path fallback is
/// deterministic under test.
pub fn label_with(path: &[Bar], rng: &mut dyn UniformSource) -> Direction {
    let (first, last) = match (path.first(), path.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            return if rng.next_uniform() < 0.5 {
                Direction::Up
            } else {
                Direction::Down
            }
        }
    };

    if last.close >= first.open {
        Direction::Up
    } else {
        Direction::Down
    }
}
