//! Cross-module game properties

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use tokio::sync::broadcast;
    use tokio::time::Duration;

    use tradefade::engine::{EngineConfig, GameEngine};
    use tradefade::events::GameEvent;
    use tradefade::indicators::ema;
    use tradefade::market::{PathGenerator, SeededUniform};
    use tradefade::oracle;
    use tradefade::persistence::{MemoryBestScore, SessionLog, SessionRecord};
    use tradefade::types::{GamePhase, GameSnapshot, Outcome, Path};

    fn make_engine(
        best: u32,
        seed: u64,
    ) -> (
        Arc<GameEngine>,
        broadcast::Receiver<GameEvent>,
        Arc<MemoryBestScore>,
    ) {
        let store = Arc::new(MemoryBestScore::new(best));
        let engine = Arc::new(
            GameEngine::new(EngineConfig::default(), store.clone())
                .with_generator(PathGenerator::with_source(SeededUniform::new(seed))),
        );
        let rx = engine.subscribe();
        (engine, rx, store)
    }

    async fn next_round(rx: &mut broadcast::Receiver<GameEvent>) -> Path {
        loop {
            if let GameEvent::RoundStarted { path, .. } = rx.recv().await.unwrap() {
                return path;
            }
        }
    }

    async fn next_resolution(
        rx: &mut broadcast::Receiver<GameEvent>,
    ) -> (Outcome, GameSnapshot) {
        loop {
            if let GameEvent::RoundResolved {
                outcome, snapshot, ..
            } = rx.recv().await.unwrap()
            {
                return (outcome, snapshot);
            }
        }
    }

    /// Play one round, answering correctly when `win` is true
    async fn play_round(
        engine: &Arc<GameEngine>,
        rx: &mut broadcast::Receiver<GameEvent>,
        win: bool,
    ) -> (Outcome, GameSnapshot) {
        let path = next_round(rx).await;
        let answer = oracle::label(&path);
        engine.choose(if win { answer } else { answer.flipped() });
        next_resolution(rx).await
    }

    // ========================================================================
    // Simulator + indicator + oracle, as the engine wires them together
    // ========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_emitted_chart_data_is_consistent() {
        let (engine, mut rx, _) = make_engine(0, 7);
        engine.start().unwrap();

        let event = loop {
            let event = rx.recv().await.unwrap();
            if matches!(event, GameEvent::RoundStarted { .. }) {
                break event;
            }
        };
        let GameEvent::RoundStarted {
            path,
            ema: trend,
            timer_secs,
            ..
        } = event
        else {
            unreachable!()
        };

        assert_eq!(path.len(), 48);
        assert_eq!(trend.len(), path.len());
        assert_eq!(trend[0], path[0].close);
        assert_eq!(trend, ema(&path, 20).unwrap());
        assert_eq!(timer_secs, 3);

        for bar in &path {
            assert!(bar.low <= bar.open.min(bar.close));
            assert!(bar.high >= bar.open.max(bar.close));
            assert!(bar.volume >= 0.0);
        }

        // The resolved direction matches what the oracle says about the path
        let expected = oracle::label(&path);
        engine.choose(expected);
        let (outcome, _) = next_resolution(&mut rx).await;
        assert_eq!(outcome, Outcome::Correct);
    }

    // ========================================================================
    // Scoring invariants
    // ========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_score_is_monotonic_and_in_tens() {
        let (engine, mut rx, _) = make_engine(0, 11);
        engine.start().unwrap();

        let mut last_score = 0;
        for i in 0..8 {
            let win = i % 4 != 0; // mix of right and wrong, lives never run out
            let (_, snapshot) = play_round(&engine, &mut rx, win).await;
            assert!(snapshot.score >= last_score, "score decreased");
            assert_eq!(snapshot.score % 10, 0);
            last_score = snapshot.score;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_level_up_exactly_at_fifty_points() {
        let (engine, mut rx, _) = make_engine(0, 13);
        engine.start().unwrap();

        for expected_score in [10, 20, 30, 40] {
            let (_, snapshot) = play_round(&engine, &mut rx, true).await;
            assert_eq!(snapshot.score, expected_score);
            assert_eq!(snapshot.level, 1);
        }

        // Crossing the 50-point boundary bumps the level exactly once
        let (_, snapshot) = play_round(&engine, &mut rx, true).await;
        assert_eq!(snapshot.score, 50);
        assert_eq!(snapshot.level, 2);

        let (_, snapshot) = play_round(&engine, &mut rx, true).await;
        assert_eq!(snapshot.score, 60);
        assert_eq!(snapshot.level, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_difficulty_shortens_timer_after_fifty_points() {
        let (engine, mut rx, _) = make_engine(0, 17);
        engine.start().unwrap();

        for _ in 0..5 {
            play_round(&engine, &mut rx, true).await;
        }
        // score is now 50, so the next round arms with a 2-second clock
        let _ = next_round(&mut rx).await;
        assert_eq!(engine.snapshot().seconds_remaining, 2);
    }

    // ========================================================================
    // Lives and game over
    // ========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_lives_exhaustion_is_terminal() {
        let (engine, mut rx, _) = make_engine(0, 19);
        engine.start().unwrap();

        for _ in 0..3 {
            play_round(&engine, &mut rx, false).await;
        }
        let ended = engine.snapshot();
        assert_eq!(ended.phase, GamePhase::Ended);
        assert_eq!(ended.lives, 0);

        // Neither late decisions nor the passage of time change anything
        engine.choose(tradefade::types::Direction::Up);
        engine.choose(tradefade::types::Direction::Down);
        tokio::time::advance(Duration::from_secs(30)).await;
        let after = engine.snapshot();
        assert_eq!(after.score, ended.score);
        assert_eq!(after.lives, 0);
        assert_eq!(after.phase, GamePhase::Ended);
    }

    #[tokio::test(start_paused = true)]
    async fn test_game_over_event_carries_final_snapshot() {
        let (engine, mut rx, _) = make_engine(0, 23);
        engine.start().unwrap();

        play_round(&engine, &mut rx, true).await;
        for _ in 0..3 {
            play_round(&engine, &mut rx, false).await;
        }

        let snapshot = loop {
            if let GameEvent::GameOver { snapshot } = rx.recv().await.unwrap() {
                break snapshot;
            }
        };
        assert_eq!(snapshot.phase, GamePhase::Ended);
        assert_eq!(snapshot.score, 10);
        assert_eq!(snapshot.rounds_played, 4);
    }

    // ========================================================================
    // Best-score write-through
    // ========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_best_score_written_only_on_strict_improvement() {
        let (engine, mut rx, store) = make_engine(100, 29);
        engine.start().unwrap();

        // Reach 110: the only write is the one that first beats 100... plus
        // each further improvement
        for _ in 0..11 {
            play_round(&engine, &mut rx, true).await;
        }
        assert_eq!(store.writes(), vec![110]);
        assert_eq!(engine.snapshot().best_score, 110);

        // End the game, then stay below 110 in the next one: no new writes
        for _ in 0..3 {
            play_round(&engine, &mut rx, false).await;
        }
        engine.restart().unwrap();
        for _ in 0..10 {
            play_round(&engine, &mut rx, true).await;
        }
        assert_eq!(engine.snapshot().score, 100);
        assert_eq!(store.writes(), vec![110]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_record_event_fires_once_per_game() {
        let (engine, mut rx, _) = make_engine(10, 31);
        engine.start().unwrap();

        let mut record_events = 0;
        for _ in 0..4 {
            let path = next_round(&mut rx).await;
            engine.choose(oracle::label(&path));
            loop {
                match rx.recv().await.unwrap() {
                    GameEvent::NewRecord { .. } => record_events += 1,
                    GameEvent::RoundResolved { .. } => break,
                    _ => continue,
                }
            }
        }

        // 20, 30 and 40 all beat the stored 10, but only the first fires
        assert_eq!(engine.snapshot().score, 40);
        assert_eq!(record_events, 1);
        assert!(engine.snapshot().new_record);
    }

    // ========================================================================
    // Timeout and race guard
    // ========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_timeout_scores_like_a_wrong_answer() {
        let (engine, mut rx, _) = make_engine(0, 37);
        engine.start().unwrap();
        let _ = next_round(&mut rx).await;

        // Let the countdown run out with no decision
        let (outcome, snapshot) = next_resolution(&mut rx).await;
        assert_eq!(outcome, Outcome::Wrong);
        assert_eq!(snapshot.lives, 2);
        assert_eq!(snapshot.score, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_decision_racing_timeout_resolves_exactly_once() {
        let (engine, mut rx, _) = make_engine(0, 41);
        engine.start().unwrap();

        // Each round is pushed to the exact expiry instant with a decision
        // landing on top of it; whichever side wins, the round must resolve
        // exactly once with exactly one score-or-lives delta
        let mut prev_score = 0u32;
        let mut prev_lives = 3u32;
        let mut pending_path: Option<Path> = None;
        for round in 0..4 {
            let path = match pending_path.take() {
                Some(p) => p,
                None => next_round(&mut rx).await,
            };
            tokio::time::advance(Duration::from_secs(3)).await;
            engine.choose(oracle::label(&path));

            let mut resolutions = 0;
            let mut last: Option<GameSnapshot> = None;
            loop {
                match rx.recv().await.unwrap() {
                    GameEvent::RoundResolved { snapshot, .. } => {
                        resolutions += 1;
                        let ended = snapshot.phase == GamePhase::Ended;
                        last = Some(snapshot);
                        if ended {
                            break;
                        }
                    }
                    GameEvent::RoundStarted { path, .. } => {
                        pending_path = Some(path);
                        break;
                    }
                    _ => continue,
                }
            }

            assert_eq!(resolutions, 1, "round {} resolved more than once", round);
            let snap = last.expect("round ended without a resolution event");
            let scored = snap.score == prev_score + 10 && snap.lives == prev_lives;
            let lost = snap.lives + 1 == prev_lives && snap.score == prev_score;
            assert!(
                scored ^ lost,
                "round {}: expected exactly one delta, got {:?}",
                round,
                snap
            );

            if snap.phase == GamePhase::Ended {
                engine.restart().unwrap();
                prev_score = 0;
                prev_lives = 3;
            } else {
                prev_score = snap.score;
                prev_lives = snap.lives;
            }
        }
    }

    // ========================================================================
    // Session log
    // ========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_finished_game_is_logged_once() {
        let dir = std::env::temp_dir().join(format!("tradefade_it_{}", uuid::Uuid::new_v4()));
        let log = SessionLog::new(dir.join("sessions.csv"));

        let store = Arc::new(MemoryBestScore::new(0));
        let engine = Arc::new(
            GameEngine::new(EngineConfig::default(), store)
                .with_generator(PathGenerator::with_source(SeededUniform::new(43)))
                .with_session_log(SessionLog::new(dir.join("sessions.csv"))),
        );
        let mut rx = engine.subscribe();

        engine.start().unwrap();
        play_round(&engine, &mut rx, true).await;
        play_round(&engine, &mut rx, true).await;
        for _ in 0..3 {
            play_round(&engine, &mut rx, false).await;
        }

        let records: Vec<SessionRecord> = log.load().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].score, 20);
        assert_eq!(records[0].rounds_played, 5);
        assert_eq!(records[0].best_score, 20);

        let _ = std::fs::remove_dir_all(dir);
    }
}
