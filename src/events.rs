//! Game event stream
//!
//! Everything the presentation, audio, and input layers consume crosses this
//! boundary as one broadcast event type. The engine fires events; any number
//! of subscribers render, play cues, or log them.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

use crate::types::{Difficulty, Direction, GameSnapshot, IndicatorSeries, Outcome, Path};

/// Boundary events emitted by the game engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GameEvent {
    /// A round armed: freshly generated chart data plus the countdown length
    RoundStarted {
        path: Path,
        ema: IndicatorSeries,
        timer_secs: u32,
        difficulty: Difficulty,
        level: u32,
    },
    /// One countdown second elapsed
    Tick { seconds_remaining: u32 },
    /// A round resolved, by decision or by timeout
    RoundResolved {
        outcome: Outcome,
        /// The player's pick; `None` when the countdown expired
        choice: Option<Direction>,
        direction: Direction,
        snapshot: GameSnapshot,
    },
    /// Cue: the player guessed right
    Correct,
    /// Cue: the player guessed wrong or timed out
    Wrong,
    /// Cue: the running score beat the stored best, first time this game
    NewRecord { score: u32 },
    /// Cue: lives exhausted, terminal until restart
    GameOver { snapshot: GameSnapshot },
}

impl GameEvent {
    /// Event name consumed by the audio/input collaborators
    pub fn name(&self) -> &'static str {
        match self {
            GameEvent::RoundStarted { .. } => "round-started",
            GameEvent::Tick { .. } => "tick",
            GameEvent::RoundResolved { .. } => "round-resolved",
            GameEvent::Correct => "correct",
            GameEvent::Wrong => "wrong",
            GameEvent::NewRecord { .. } => "new-record",
            GameEvent::GameOver { .. } => "game-over",
        }
    }
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Channel fanning engine events out to all subscribers
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<GameEvent>,
}

impl Notifier {
    /// Create a notifier with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to receive events
    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    pub fn emit(&self, event: GameEvent) {
        // Ignore send errors (no receivers is fine)
        let _ = self.tx.send(event);
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(100)
    }
}
