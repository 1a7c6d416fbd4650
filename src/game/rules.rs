use serde::{Deserialize, Serialize};

use super::state::{
    outcome_of, winning_line, GameEvent, GameMode, GameOutcome, GameState, IntegrityError, Mark,
    BOARD_CELLS,
};

/// 落子动作：格子下标来自前端的点击事件。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlaceMarkAction {
    pub index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum RuleError {
    GameFinished,
    CellOutOfRange { index: usize },
    CellOccupied { index: usize },
    NoLegalMove,
    IntegrityViolation { error: IntegrityError },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleResolution {
    pub state: GameState,
    pub events: Vec<GameEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<GameOutcome>,
}

impl RuleResolution {
    pub fn new(state: GameState, mut events: Vec<GameEvent>) -> Self {
        let outcome = state.outcome;
        match outcome {
            Some(GameOutcome::Won { winner }) => {
                let has_event = events
                    .iter()
                    .any(|event| matches!(event, GameEvent::GameWon { .. }));
                if !has_event {
                    if let Some((_, line)) = winning_line(&state.cells) {
                        events.push(GameEvent::GameWon { winner, line });
                    }
                }
            }
            Some(GameOutcome::Draw) => {
                let has_event = events
                    .iter()
                    .any(|event| matches!(event, GameEvent::GameDrawn));
                if !has_event {
                    events.push(GameEvent::GameDrawn);
                }
            }
            _ => {}
        }

        Self {
            state,
            events,
            outcome,
        }
    }
}

#[derive(Debug, Default)]
pub struct RuleEngine;

impl RuleEngine {
    pub fn new() -> Self {
        Self
    }

    fn ensure_active(state: &GameState) -> Result<(), RuleError> {
        if state.is_finished() {
            return Err(RuleError::GameFinished);
        }
        Ok(())
    }

    fn ensure_integrity(state: &GameState) -> Result<(), RuleError> {
        state
            .integrity_check()
            .map_err(|error| RuleError::IntegrityViolation { error })
    }

    /// 底层落子：只校验下标与占用，不做回合管理。
    pub fn apply_mark(state: &mut GameState, index: usize, mark: Mark) -> Result<(), RuleError> {
        if index >= BOARD_CELLS {
            return Err(RuleError::CellOutOfRange { index });
        }
        if state.cells[index].is_some() {
            return Err(RuleError::CellOccupied { index });
        }
        state.cells[index] = Some(mark);
        Ok(())
    }

    /// Session-level move: plays the current mark, evaluates win before
    /// draw, and hands the turn over only while the game is still open.
    pub fn place_mark(
        &self,
        state: &mut GameState,
        action: PlaceMarkAction,
    ) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_active(state)?;
        Self::ensure_integrity(state)?;

        let mark = state.current_mark;
        Self::apply_mark(state, action.index, mark)?;

        let mut events = Vec::new();
        let placed = GameEvent::MarkPlaced {
            index: action.index,
            mark,
        };
        state.record_event(placed.clone());
        events.push(placed);

        match state.evaluate_outcome() {
            GameOutcome::InProgress => {
                state.switch_turn();
                let switched = GameEvent::TurnSwitched {
                    mark: state.current_mark,
                };
                state.record_event(switched.clone());
                events.push(switched);
            }
            GameOutcome::Won { winner } => {
                if let Some((_, line)) = winning_line(&state.cells) {
                    events.push(GameEvent::GameWon { winner, line });
                }
            }
            GameOutcome::Draw => {
                events.push(GameEvent::GameDrawn);
            }
        }

        Ok(events)
    }

    /// 开始新的一局：清空棋盘，保留比分与模式。
    pub fn reset_round(&self, state: &mut GameState) -> Vec<GameEvent> {
        state.reset_board();
        let event = GameEvent::BoardReset;
        state.record_event(event.clone());
        vec![event]
    }

    pub fn switch_mode(&self, state: &mut GameState, mode: GameMode) -> Vec<GameEvent> {
        state.mode = mode;
        state.reset_board();
        let mode_event = GameEvent::ModeChanged { mode };
        state.record_event(mode_event.clone());
        let reset_event = GameEvent::BoardReset;
        state.record_event(reset_event.clone());
        vec![mode_event, reset_event]
    }

    pub fn check_victory(state: &GameState) -> GameOutcome {
        state.outcome.unwrap_or_else(|| outcome_of(&state.cells))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::{check_win, ScoreBoard};
    use rand::rngs::SmallRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    fn play(engine: &RuleEngine, state: &mut GameState, indices: &[usize]) {
        for &index in indices {
            engine
                .place_mark(state, PlaceMarkAction { index })
                .expect("scripted move should be legal");
        }
    }

    #[test]
    fn place_mark_sets_cell_and_switches_turn() {
        let engine = RuleEngine::new();
        let mut state = GameState::new(GameMode::TwoPlayer);

        let events = engine
            .place_mark(&mut state, PlaceMarkAction { index: 4 })
            .expect("first move should succeed");

        assert_eq!(state.cells[4], Some(Mark::X));
        assert_eq!(state.current_mark, Mark::O);
        assert!(events.iter().any(|event| matches!(
            event,
            GameEvent::MarkPlaced {
                index: 4,
                mark: Mark::X
            }
        )));
        assert!(events
            .iter()
            .any(|event| matches!(event, GameEvent::TurnSwitched { mark: Mark::O })));
    }

    #[test]
    fn occupied_cell_is_rejected_without_mutation() {
        let engine = RuleEngine::new();
        let mut state = GameState::new(GameMode::TwoPlayer);
        play(&engine, &mut state, &[4]);

        let snapshot = state.clone();
        let error = engine
            .place_mark(&mut state, PlaceMarkAction { index: 4 })
            .expect_err("occupied cell must be rejected");

        assert_eq!(error, RuleError::CellOccupied { index: 4 });
        assert_eq!(state, snapshot, "rejected move must not mutate the state");
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let engine = RuleEngine::new();
        let mut state = GameState::new(GameMode::TwoPlayer);

        let error = engine
            .place_mark(&mut state, PlaceMarkAction { index: 9 })
            .expect_err("index past the board must be rejected");

        assert_eq!(error, RuleError::CellOutOfRange { index: 9 });
        assert!(state.cells.iter().all(|cell| cell.is_none()));
    }

    #[test]
    fn winning_move_declares_outcome_and_tallies_score() {
        let engine = RuleEngine::new();
        let mut state = GameState::new(GameMode::TwoPlayer);

        // X: 0, 1, 2 — 顶行；O 的应手不构成威胁
        play(&engine, &mut state, &[0, 3, 1, 4]);
        let events = engine
            .place_mark(&mut state, PlaceMarkAction { index: 2 })
            .expect("winning move should apply");

        assert_eq!(state.outcome, Some(GameOutcome::Won { winner: Mark::X }));
        assert_eq!(state.scores.wins_of(Mark::X), 1);
        assert!(events.iter().any(|event| matches!(
            event,
            GameEvent::GameWon {
                winner: Mark::X,
                line: [0, 1, 2]
            }
        )));
        // 终局后不再交换回合
        assert_eq!(state.current_mark, Mark::X);
    }

    #[test]
    fn moves_after_game_over_are_rejected() {
        let engine = RuleEngine::new();
        let mut state = GameState::new(GameMode::TwoPlayer);
        play(&engine, &mut state, &[0, 3, 1, 4, 2]);
        assert!(state.is_finished());

        let error = engine
            .place_mark(&mut state, PlaceMarkAction { index: 5 })
            .expect_err("no moves once the game is over");
        assert_eq!(error, RuleError::GameFinished);
    }

    #[test]
    fn exhausted_board_is_declared_a_draw() {
        let engine = RuleEngine::new();
        let mut state = GameState::new(GameMode::TwoPlayer);

        play(&engine, &mut state, &[0, 4, 1, 2, 6, 3, 5, 7, 8]);

        assert_eq!(state.outcome, Some(GameOutcome::Draw));
        assert_eq!(state.scores, ScoreBoard::default());
        assert!(state
            .event_log
            .iter()
            .any(|event| matches!(event, GameEvent::GameDrawn)));
    }

    #[test]
    fn reset_round_keeps_scores_and_clears_the_board() {
        let engine = RuleEngine::new();
        let mut state = GameState::new(GameMode::VersusAi);
        play(&engine, &mut state, &[0, 3, 1, 4, 2]);
        assert_eq!(state.scores.wins_of(Mark::X), 1);

        let events = engine.reset_round(&mut state);

        assert!(matches!(events.as_slice(), [GameEvent::BoardReset]));
        assert!(state.cells.iter().all(|cell| cell.is_none()));
        assert_eq!(state.current_mark, Mark::X);
        assert!(!state.is_finished());
        assert_eq!(state.scores.wins_of(Mark::X), 1);
        assert_eq!(state.mode, GameMode::VersusAi);
    }

    #[test]
    fn switch_mode_resets_the_round() {
        let engine = RuleEngine::new();
        let mut state = GameState::new(GameMode::VersusAi);
        play(&engine, &mut state, &[0, 3]);

        let events = engine.switch_mode(&mut state, GameMode::TwoPlayer);

        assert_eq!(state.mode, GameMode::TwoPlayer);
        assert!(state.cells.iter().all(|cell| cell.is_none()));
        assert!(events.iter().any(|event| matches!(
            event,
            GameEvent::ModeChanged {
                mode: GameMode::TwoPlayer
            }
        )));
    }

    #[test]
    fn corrupt_state_is_surfaced_as_integrity_violation() {
        let engine = RuleEngine::new();
        let mut corrupt = GameState::new(GameMode::TwoPlayer);
        for index in [0, 1, 2] {
            corrupt.cells[index] = Some(Mark::X);
        }
        for index in [3, 4, 5] {
            corrupt.cells[index] = Some(Mark::O);
        }
        let error = engine
            .place_mark(&mut corrupt, PlaceMarkAction { index: 6 })
            .expect_err("double-winner board must be rejected");
        assert_eq!(
            error,
            RuleError::IntegrityViolation {
                error: IntegrityError::ConflictingWinners
            }
        );
    }

    #[test]
    fn resolution_carries_the_terminal_event() {
        let engine = RuleEngine::new();
        let mut state = GameState::new(GameMode::TwoPlayer);
        play(&engine, &mut state, &[0, 3, 1, 4, 2]);

        let resolution = RuleResolution::new(state, Vec::new());
        assert_eq!(
            resolution.outcome,
            Some(GameOutcome::Won { winner: Mark::X })
        );
        assert!(resolution.events.iter().any(|event| matches!(
            event,
            GameEvent::GameWon {
                winner: Mark::X,
                ..
            }
        )));
    }

    #[test]
    fn outcome_and_line_checks_agree_on_random_playouts() {
        let engine = RuleEngine::new();
        let mut rng = SmallRng::seed_from_u64(7);

        for _ in 0..200 {
            let mut state = GameState::new(GameMode::TwoPlayer);
            while !state.is_finished() {
                let empties = state.empty_indices();
                let index = match empties.choose(&mut rng) {
                    Some(&index) => index,
                    None => break,
                };
                engine
                    .place_mark(&mut state, PlaceMarkAction { index })
                    .expect("random legal move should be accepted");

                if let GameOutcome::Won { winner } = outcome_of(&state.cells) {
                    assert!(check_win(&state.cells, winner));
                    assert!(!check_win(&state.cells, winner.opponent()));
                    assert_eq!(
                        state.outcome,
                        Some(GameOutcome::Won { winner }),
                        "engine must declare the winner the board shows"
                    );
                }
            }
        }
    }
}
