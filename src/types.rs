//! Core types used throughout tradefade
//!
//! Defines the shared data model for simulated bars, rounds, and game state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a price move — both the player's guess and the ground truth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
}

impl Default for Direction {
    fn default() -> Self {
        Direction::Up
    }
}

impl Direction {
    /// The opposite direction
    pub fn flipped(&self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "up" | "u" => Some(Direction::Up),
            "down" | "d" => Some(Direction::Down),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "UP"),
            Direction::Down => write!(f, "DOWN"),
        }
    }
}

/// Result of resolving one round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Correct,
    Wrong,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Correct => write!(f, "CORRECT"),
            Outcome::Wrong => write!(f, "WRONG"),
        }
    }
}

/// Lifecycle phase of the game state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// No game has been started yet
    Idle,
    /// A round is live and accepting input
    RoundActive,
    /// A round was just resolved; input is disabled until the next round arms
    Resolving,
    /// Lives are exhausted; only a restart leaves this phase
    Ended,
}

impl Default for GamePhase {
    fn default() -> Self {
        GamePhase::Idle
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GamePhase::Idle => write!(f, "IDLE"),
            GamePhase::RoundActive => write!(f, "ROUND_ACTIVE"),
            GamePhase::Resolving => write!(f, "RESOLVING"),
            GamePhase::Ended => write!(f, "ENDED"),
        }
    }
}

/// HUD difficulty tier, derived from the armed countdown length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Derive the tier from a round's countdown length in seconds
    pub fn from_timer_secs(secs: u32) -> Self {
        if secs >= 3 {
            Difficulty::Easy
        } else if secs == 2 {
            Difficulty::Medium
        } else {
            Difficulty::Hard
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "Easy"),
            Difficulty::Medium => write!(f, "Medium"),
            Difficulty::Hard => write!(f, "Hard"),
        }
    }
}

/// One simulated OHLCV interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Open price
    pub open: f64,
    /// High price
    pub high: f64,
    /// Low price
    pub low: f64,
    /// Close price
    pub close: f64,
    /// Synthetic traded volume
    pub volume: f64,
}

/// Chronologically ordered bars for one round, replaced wholesale each round
pub type Path = Vec<Bar>;

/// Trend-line values aligned index-for-index with the path they came from
pub type IndicatorSeries = Vec<f64>;

/// HUD-facing copy of the game state, taken at boundary events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSnapshot {
    /// Lifecycle phase
    pub phase: GamePhase,
    /// Current score
    pub score: u32,
    /// Remaining lives
    pub lives: u32,
    /// Current level
    pub level: u32,
    /// Best score ever observed (survives restarts)
    pub best_score: u32,
    /// Whether this game has already beaten the stored best
    pub new_record: bool,
    /// Countdown seconds left in the live round (0 when none is live)
    pub seconds_remaining: u32,
    /// Difficulty tier at the current score
    pub difficulty: Difficulty,
    /// Rounds started within the current game
    pub rounds_played: u32,
}
