//! tradefade — terminal reflex game
//!
//! Wires the game engine to a line-based terminal: renders each round's chart
//! as a sparkline, maps `u`/`d`/`r` keys onto the engine's three inputs, and
//! persists the best score under the configured data directory.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tradefade::config::AppConfig;
use tradefade::engine::{EngineConfig, GameEngine};
use tradefade::events::GameEvent;
use tradefade::persistence::{FileBestScore, SessionLog};
use tradefade::types::{Bar, Direction, Outcome};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_tracing(config.logging.json);
    info!(config = %config.digest(), "tradefade starting");

    let data_dir = PathBuf::from(&config.persistence.data_dir);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data dir {}", data_dir.display()))?;

    let store = Arc::new(FileBestScore::new(
        data_dir.join(&config.persistence.best_score_file),
    ));
    let session_log = SessionLog::new(data_dir.join(&config.persistence.session_log_file));

    let engine = Arc::new(
        GameEngine::new(EngineConfig::from(&config.game), store).with_session_log(session_log),
    );

    // Render engine events as they arrive
    let mut events = engine.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => render(&event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event consumer lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    println!("Will the chart close UP or DOWN? [u]p / [d]own / [r]estart / [q]uit");
    engine.start()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(input) = line.context("Failed to read stdin")? else {
                    break; // EOF
                };
                match input.trim() {
                    "" => continue,
                    "q" | "quit" => break,
                    "r" | "restart" => engine.restart()?,
                    other => match Direction::from_str(other) {
                        Some(choice) => engine.choose(choice),
                        None => println!("Unrecognized input '{}'; use u, d, r or q", other),
                    },
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    info!(best_score = engine.snapshot().best_score, "Shutting down");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn render(event: &GameEvent) {
    match event {
        GameEvent::RoundStarted {
            path,
            timer_secs,
            difficulty,
            level,
            ..
        } => {
            println!();
            println!("  {}", sparkline(path));
            println!(
                "  level {} | {} | {}s on the clock — up or down?",
                level, difficulty, timer_secs
            );
        }
        GameEvent::Tick { seconds_remaining } if *seconds_remaining > 0 => {
            println!("  ...{}", seconds_remaining);
        }
        GameEvent::Tick { .. } => {}
        GameEvent::RoundResolved {
            outcome,
            direction,
            snapshot,
            ..
        } => {
            let verdict = match outcome {
                Outcome::Correct => "✓ correct",
                Outcome::Wrong => "✗ wrong",
            };
            println!(
                "  {} (chart closed {}) | score {} | lives {}",
                verdict, direction, snapshot.score, snapshot.lives
            );
        }
        GameEvent::NewRecord { score } => {
            println!("  ★ new record: {}", score);
        }
        GameEvent::GameOver { snapshot } => {
            println!(
                "  game over — final score {} | best {} | [r] to play again",
                snapshot.score, snapshot.best_score
            );
        }
        GameEvent::Correct | GameEvent::Wrong => {}
    }
}

/// Compress the path's closes into one line of block glyphs
fn sparkline(path: &[Bar]) -> String {
    const LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

    let closes: Vec<f64> = path.iter().map(|b| b.close).collect();
    let min = closes.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = closes.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let span = (max - min).max(f64::EPSILON);

    closes
        .iter()
        .map(|c| {
            let idx = ((c - min) / span * (LEVELS.len() - 1) as f64).round() as usize;
            LEVELS[idx.min(LEVELS.len() - 1)]
        })
        .collect()
}
