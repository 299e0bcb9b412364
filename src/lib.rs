//! tradefade
//!
//! Timed reflex game core: a procedural OHLCV market simulator and the
//! round-based state machine that scores up/down predictions against it.
//! Rendering, audio, and input layers consume the event stream and snapshot
//! API; persistence goes through the `BestScoreStore` capability.

pub mod config;
pub mod engine;
pub mod events;
pub mod indicators;
pub mod market;
pub mod oracle;
pub mod persistence;
pub mod types;
