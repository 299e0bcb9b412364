//! Configuration management for tradefade
//!
//! Loads built-in defaults, then an optional config file, then environment
//! variables via .env

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub game: GameConfig,
    pub persistence: PersistenceConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameConfig {
    /// Bars generated per round
    pub bars_per_round: usize,
    /// EMA period for the trend line
    pub ema_period: usize,
    /// Countdown at zero score, in seconds
    pub base_timer_secs: u32,
    /// Lives at the start of a game
    pub starting_lives: u32,
    /// Pause between resolving one round and arming the next, in milliseconds
    pub resolve_delay_ms: u64,
    /// Points awarded per correct answer
    pub points_per_correct: u32,
    /// Points between level-ups (also the difficulty step)
    pub level_step_points: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
    /// Data directory
    pub data_dir: String,
    /// Best-score file name inside the data directory
    pub best_score_file: String,
    /// Session log file name inside the data directory
    pub session_log_file: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of the human format
    pub json: bool,
}

impl Default for GameConfig {
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

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            best_score_file: "best_score.json".to_string(),
            session_log_file: "sessions.csv".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { json: false }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            game: GameConfig::default(),
            persistence: PersistenceConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let config = Config::builder()
            // Game defaults
            .set_default("game.bars_per_round", 48)?
            .set_default("game.ema_period", 20)?
            .set_default("game.base_timer_secs", 3)?
            .set_default("game.starting_lives", 3)?
            .set_default("game.resolve_delay_ms", 600)?
            .set_default("game.points_per_correct", 10)?
            .set_default("game.level_step_points", 50)?
            // Persistence defaults
            .set_default("persistence.data_dir", "./data")?
            .set_default("persistence.best_score_file", "best_score.json")?
            .set_default("persistence.session_log_file", "sessions.csv")?
            // Logging defaults
            .set_default("logging.json", false)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (TRADEFADE_*)
            .add_source(Environment::with_prefix("TRADEFADE").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config.validate()?;
        Ok(app_config)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.game.bars_per_round == 0 {
            bail!("game.bars_per_round must be at least 1");
        }
        if self.game.ema_period == 0 {
            bail!("game.ema_period must be at least 1");
        }
        if self.game.base_timer_secs == 0 {
            bail!("game.base_timer_secs must be at least 1");
        }
        if self.game.starting_lives == 0 {
            bail!("game.starting_lives must be at least 1");
        }
        if self.game.points_per_correct == 0 || self.game.level_step_points == 0 {
            bail!("game.points_per_correct and game.level_step_points must be positive");
        }
        Ok(())
    }

    /// Generate a digest of the config for startup logging
    pub fn digest(&self) -> String {
        format!(
            "bars={} ema={} timer={}s lives={} delay={}ms data_dir={}",
            self.game.bars_per_round,
            self.game.ema_period,
            self.game.base_timer_secs,
            self.game.starting_lives,
            self.game.resolve_delay_ms,
            self.persistence.data_dir
        )
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}
