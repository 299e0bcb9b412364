//! Round state machine
//!
//! Owns score, lives, level, and the per-round countdown; orchestrates the
//! simulator, trend indicator, and oracle each round and evaluates player
//! input against the fixed label. One round is live at a time; the countdown
//! task and the next-round delay task are the only suspension points, and
//! both re-validate the round serial before acting so a late callback can
//! never double-resolve a round.

use anyhow::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::config::GameConfig;
use crate::events::{GameEvent, Notifier};
use crate::indicators;
use crate::market::PathGenerator;
use crate::oracle;
use crate::persistence::{BestScoreStore, SessionLog, SessionRecord};
use crate::types::{Difficulty, Direction, GamePhase, GameSnapshot, Outcome};

/// Engine tuning knobs
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Bars generated per round
    pub bars_per_round: usize,
    /// EMA period for the trend line
    pub ema_period: usize,
    /// Countdown at zero score, in seconds
    pub base_timer_secs: u32,
    /// Lives at the start of a game
    pub starting_lives: u32,
    /// Pause between resolving a round and arming the next
    pub resolve_delay_ms: u64,
    /// Points per correct answer
    pub points_per_correct: u32,
    /// Points between level-ups and difficulty steps
    pub level_step_points: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bars_per_round: 48,
            ema_period: 20,
            base_timer_secs: 3,
            starting_lives: 3,
            resolve_delay_ms: 600,
            points_per_correct: 10,
            level_step_points: 50,
        }
    }
}

impl From<&GameConfig> for EngineConfig {
    fn from(cfg: &GameConfig) -> Self {
        Self {
            bars_per_round: cfg.bars_per_round,
            ema_period: cfg.ema_period,
            base_timer_secs: cfg.base_timer_secs,
            starting_lives: cfg.starting_lives,
            resolve_delay_ms: cfg.resolve_delay_ms,
            points_per_correct: cfg.points_per_correct,
            level_step_points: cfg.level_step_points,
        }
    }
}

impl EngineConfig {
    /// Countdown length for a given score: one second shorter per
    /// `level_step_points` scored, floored at one second
    pub fn countdown_secs(&self, score: u32) -> u32 {
        let step = score / self.level_step_points;
        self.base_timer_secs.saturating_sub(step).max(1)
    }
}

/// Mutable game aggregate, mutated only under the state lock
#[derive(Debug, Clone)]
struct GameState {
    phase: GamePhase,
    score: u32,
    lives: u32,
    level: u32,
    best_score: u32,
    new_record: bool,
    rounds_played: u32,
}

/// One live round; replaced wholesale at every round start
#[derive(Debug, Clone)]
struct Round {
    direction: Direction,
    timer_secs: u32,
    seconds_remaining: u32,
    serial: u64,
}

/// The round state machine
///
/// Shared as an `Arc`; all mutation goes through `&self` methods over short
/// lock-held critical sections with no `await` while a lock is held.
pub struct GameEngine {
    config: EngineConfig,
    state: RwLock<GameState>,
    round: RwLock<Option<Round>>,
    next_serial: AtomicU64,
    generator: Mutex<PathGenerator>,
    countdown: Mutex<Option<JoinHandle<()>>>,
    store: Arc<dyn BestScoreStore>,
    session_log: Option<SessionLog>,
    notifier: Notifier,
}

impl GameEngine {
    /// Build an engine; reads the stored best score once at startup
    pub fn new(config: EngineConfig, store: Arc<dyn BestScoreStore>) -> Self {
        let best_score = store.read_best().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read best score, starting at 0");
            0
        });

        let state = GameState {
            phase: GamePhase::Idle,
            score: 0,
            lives: config.starting_lives,
            level: 1,
            best_score,
            new_record: false,
            rounds_played: 0,
        };

        Self {
            config,
            state: RwLock::new(state),
            round: RwLock::new(None),
            next_serial: AtomicU64::new(0),
            generator: Mutex::new(PathGenerator::new()),
            countdown: Mutex::new(None),
            store,
            session_log: None,
            notifier: Notifier::default(),
        }
    }

    /// Substitute the path generator (e.g. a seeded one for tests)
    pub fn with_generator(mut self, generator: PathGenerator) -> Self {
        self.generator = Mutex::new(generator);
        self
    }

    /// Attach a session log receiving one record per finished game
    pub fn with_session_log(mut self, log: SessionLog) -> Self {
        self.session_log = Some(log);
        self
    }

    /// Subscribe to the engine's event stream
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<GameEvent> {
        self.notifier.subscribe()
    }

    /// Begin the first game. Ignored unless the engine is idle.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        {
            let state = self.state.read().unwrap();
            if state.phase != GamePhase::Idle {
                return Ok(());
            }
        }
        info!("Starting game");
        self.start_round()
    }

    /// Restart after a game over. Ignored from any other phase.
    pub fn restart(self: &Arc<Self>) -> Result<()> {
        {
            let mut state = self.state.write().unwrap();
            if state.phase != GamePhase::Ended {
                return Ok(());
            }
            state.phase = GamePhase::Idle;
            state.score = 0;
            state.lives = self.config.starting_lives;
            state.level = 1;
            state.new_record = false;
            state.rounds_played = 0;
        }
        info!("Restarting game");
        self.start_round()
    }

    /// Submit the player's pick for the live round.
    ///
    /// Ignored while a resolution is pending or after the game has ended;
    /// that is normal flow control, not an error.
    pub fn choose(self: &Arc<Self>, choice: Direction) {
        let serial = match self.round.read().unwrap().as_ref() {
            Some(round) => round.serial,
            None => return,
        };
        self.resolve(serial, Some(choice));
    }

    /// HUD-facing copy of the current state
    pub fn snapshot(&self) -> GameSnapshot {
        let state = self.state.read().unwrap();
        let round = self.round.read().unwrap();
        self.build_snapshot(&state, round.as_ref())
    }

    fn build_snapshot(&self, state: &GameState, round: Option<&Round>) -> GameSnapshot {
        let (seconds_remaining, timer_secs) = match round {
            Some(r) if state.phase == GamePhase::RoundActive => (r.seconds_remaining, r.timer_secs),
            _ => (0, self.config.countdown_secs(state.score)),
        };
        GameSnapshot {
            phase: state.phase,
            score: state.score,
            lives: state.lives,
            level: state.level,
            best_score: state.best_score,
            new_record: state.new_record,
            seconds_remaining,
            difficulty: Difficulty::from_timer_secs(timer_secs),
            rounds_played: state.rounds_played,
        }
    }

    /// Arm a fresh round: new path, new trend line, new label, new countdown
    fn start_round(self: &Arc<Self>) -> Result<()> {
        let path = {
            let mut generator = self.generator.lock().unwrap();
            generator.generate(self.config.bars_per_round)?
        };
        let ema = indicators::ema(&path, self.config.ema_period)?;
        let direction = oracle::label(&path);
        let serial = self.next_serial.fetch_add(1, Ordering::SeqCst) + 1;

        let (timer_secs, level) = {
            let mut state = self.state.write().unwrap();
            let mut round = self.round.write().unwrap();
            let timer_secs = self.config.countdown_secs(state.score);
            state.phase = GamePhase::RoundActive;
            state.rounds_played += 1;
            *round = Some(Round {
                direction,
                timer_secs,
                seconds_remaining: timer_secs,
                serial,
            });
            (timer_secs, state.level)
        };

        debug!(serial, timer_secs, answer = %direction, "Round armed");
        self.notifier.emit(GameEvent::RoundStarted {
            path,
            ema,
            timer_secs,
            difficulty: Difficulty::from_timer_secs(timer_secs),
            level,
        });
        self.arm_countdown(serial, timer_secs);
        Ok(())
    }

    /// Spawn the countdown for round `serial`, replacing any previous handle
    fn arm_countdown(self: &Arc<Self>, serial: u64, timer_secs: u32) {
        let engine = Arc::clone(self);
        let handle = tokio::spawn(async move {
            for _ in 0..timer_secs {
                sleep(Duration::from_secs(1)).await;

                let seconds_remaining = {
                    let state = engine.state.read().unwrap();
                    let mut round = engine.round.write().unwrap();
                    match round.as_mut() {
                        Some(r) if r.serial == serial && state.phase == GamePhase::RoundActive => {
                            r.seconds_remaining = r.seconds_remaining.saturating_sub(1);
                            r.seconds_remaining
                        }
                        // Round resolved or replaced while we slept
                        _ => return,
                    }
                };

                engine
                    .notifier
                    .emit(GameEvent::Tick { seconds_remaining });
                if seconds_remaining == 0 {
                    engine.resolve(serial, None);
                    return;
                }
            }
        });

        let mut slot = self.countdown.lock().unwrap();
        if let Some(old) = slot.replace(handle) {
            // Aborting an already-finished task is a no-op
            old.abort();
        }
    }

    /// Resolve round `serial` with the player's pick, or as a timeout when
    /// `choice` is `None`. At most one resolution happens per round: the
    /// phase flips to `Resolving` synchronously under the state lock, and any
    /// caller that finds the round stale backs out without effect.
    fn resolve(self: &Arc<Self>, serial: u64, choice: Option<Direction>) {
        let resolution = {
            let mut state = self.state.write().unwrap();
            let round_guard = self.round.read().unwrap();
            let round = match round_guard.as_ref() {
                Some(r) if r.serial == serial && state.phase == GamePhase::RoundActive => r.clone(),
                _ => return,
            };

            // Input is disabled here, before any task is scheduled
            state.phase = GamePhase::Resolving;

            let outcome = if choice == Some(round.direction) {
                Outcome::Correct
            } else {
                Outcome::Wrong
            };

            let mut best_to_write = None;
            let mut record_set = false;
            let mut ended = false;

            match outcome {
                Outcome::Correct => {
                    state.score += self.config.points_per_correct;
                    if state.score % self.config.level_step_points == 0 {
                        state.level += 1;
                    }
                    if state.score > state.best_score {
                        state.best_score = state.score;
                        best_to_write = Some(state.score);
                        if !state.new_record {
                            state.new_record = true;
                            record_set = true;
                        }
                    }
                }
                Outcome::Wrong => {
                    state.lives = state.lives.saturating_sub(1);
                    if state.lives == 0 {
                        state.phase = GamePhase::Ended;
                        ended = true;
                    }
                }
            }

            let snapshot = self.build_snapshot(&state, Some(&round));
            (outcome, round.direction, best_to_write, record_set, ended, snapshot)
        };
        let (outcome, direction, best_to_write, record_set, ended, snapshot) = resolution;

        // Cancel the countdown; if it fired first we are the no-op side and
        // never get here, so this only runs on the authoritative path
        if let Some(handle) = self.countdown.lock().unwrap().take() {
            handle.abort();
        }

        info!(
            serial,
            outcome = %outcome,
            choice = ?choice,
            answer = %direction,
            score = snapshot.score,
            lives = snapshot.lives,
            "Round resolved"
        );

        // In-memory best score is already updated; a failed write-through
        // must not corrupt the game
        if let Some(value) = best_to_write {
            if let Err(e) = self.store.write_best(value) {
                warn!(error = %e, best_score = value, "Best-score write failed");
            }
        }

        match outcome {
            Outcome::Correct => self.notifier.emit(GameEvent::Correct),
            Outcome::Wrong => self.notifier.emit(GameEvent::Wrong),
        }
        if record_set {
            self.notifier.emit(GameEvent::NewRecord {
                score: snapshot.score,
            });
        }
        self.notifier.emit(GameEvent::RoundResolved {
            outcome,
            choice,
            direction,
            snapshot: snapshot.clone(),
        });

        if ended {
            info!(
                score = snapshot.score,
                best_score = snapshot.best_score,
                rounds = snapshot.rounds_played,
                "Game over"
            );
            if let Some(log) = &self.session_log {
                let record = SessionRecord {
                    timestamp: chrono::Utc::now().timestamp_millis(),
                    score: snapshot.score,
                    level: snapshot.level,
                    rounds_played: snapshot.rounds_played,
                    best_score: snapshot.best_score,
                    new_record: snapshot.new_record,
                };
                if let Err(e) = log.append(&record) {
                    warn!(error = %e, "Session log append failed");
                }
            }
            self.notifier.emit(GameEvent::GameOver { snapshot });
            return;
        }

        self.schedule_next_round();
    }

    /// Arm the next round after the fixed post-resolution pause
    fn schedule_next_round(self: &Arc<Self>) {
        let engine = Arc::clone(self);
        let delay = Duration::from_millis(self.config.resolve_delay_ms);
        tokio::spawn(async move {
            sleep(delay).await;
            {
                let state = engine.state.read().unwrap();
                if state.phase != GamePhase::Resolving {
                    return;
                }
            }
            if let Err(e) = engine.start_round() {
                warn!(error = %e, "Failed to start next round");
            }
        });
    }
}
