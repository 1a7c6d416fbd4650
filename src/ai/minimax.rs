use std::str::FromStr;

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::game::{winner_on, Cell, GameState, Mark, RuleError, BOARD_CELLS};

// Terminal scores from O's perspective. Depth never enters the score,
// so the search is indifferent between a fast win and a slow one.
const X_WIN_SCORE: i32 = -1;
const O_WIN_SCORE: i32 = 1;
const DRAW_SCORE: i32 = 0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AiDifficulty {
    Easy,
    Normal,
    Hard,
    Expert,
}

impl FromStr for AiDifficulty {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(AiDifficulty::Easy),
            "normal" | "medium" => Ok(AiDifficulty::Normal),
            "hard" => Ok(AiDifficulty::Hard),
            "expert" | "extreme" => Ok(AiDifficulty::Expert),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Probability in [0, 1] of playing a uniformly random legal move
    /// instead of the minimax best response.
    pub exploration: f64,
}

impl AiConfig {
    pub fn from_difficulty(difficulty: AiDifficulty) -> Self {
        match difficulty {
            AiDifficulty::Easy => Self { exploration: 1.0 },
            AiDifficulty::Normal => Self { exploration: 0.7 },
            AiDifficulty::Hard => Self { exploration: 0.3 },
            AiDifficulty::Expert => Self { exploration: 0.0 },
        }
    }

    pub fn with_exploration(mut self, exploration: f64) -> Self {
        self.exploration = exploration;
        self
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        AiConfig::from_difficulty(AiDifficulty::Normal)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MovePolicy {
    Random,
    Minimax,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiDecision {
    pub cell: usize,
    pub policy: MovePolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i32>,
    pub nodes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOutcome {
    pub cell: usize,
    pub score: i32,
    pub nodes: u64,
}

struct SearchStats {
    nodes: u64,
}

impl SearchStats {
    fn new() -> Self {
        Self { nodes: 0 }
    }
}

/// AI 对手：按配置在随机落子与穷举搜索之间混合。
pub struct AiAgent {
    config: AiConfig,
    rng: SmallRng,
}

impl AiAgent {
    pub fn new(config: AiConfig) -> Self {
        Self {
            config,
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn with_seed(config: AiConfig, seed: u64) -> Self {
        Self {
            config,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Pick the next cell for the side to move. Draws one roll in
    /// [0, 1); below the exploration threshold the move is uniformly
    /// random over the empty cells, otherwise it is the search result.
    pub fn choose_move(&mut self, state: &GameState) -> Result<AiDecision, RuleError> {
        let empties = state.empty_indices();
        if empties.is_empty() {
            return Err(RuleError::NoLegalMove);
        }

        let exploration = self.config.exploration.clamp(0.0, 1.0);
        let roll: f64 = self.rng.gen();
        if roll < exploration {
            let cell = empties
                .choose(&mut self.rng)
                .copied()
                .ok_or(RuleError::NoLegalMove)?;
            return Ok(AiDecision {
                cell,
                policy: MovePolicy::Random,
                score: None,
                nodes: 0,
            });
        }

        let search = best_move(&state.cells).ok_or(RuleError::NoLegalMove)?;
        Ok(AiDecision {
            cell: search.cell,
            policy: MovePolicy::Minimax,
            score: Some(search.score),
            nodes: search.nodes,
        })
    }
}

/// Exhaustive best response for O on the given board. Probes every empty
/// cell in ascending order and keeps the first index reaching the maximal
/// score; the caller's board is never mutated.
pub fn best_move(cells: &[Cell; BOARD_CELLS]) -> Option<SearchOutcome> {
    let mut buffer = *cells;
    let mut stats = SearchStats::new();
    let mut best: Option<(usize, i32)> = None;

    for index in 0..BOARD_CELLS {
        if buffer[index].is_some() {
            continue;
        }

        buffer[index] = Some(Mark::O);
        let score = minimax(&mut buffer, false, &mut stats);
        buffer[index] = None;

        let improved = match best {
            Some((_, best_score)) => score > best_score,
            None => true,
        };
        if improved {
            best = Some((index, score));
        }
    }

    best.map(|(cell, score)| SearchOutcome {
        cell,
        score,
        nodes: stats.nodes,
    })
}

// Full-depth search over the remaining empty cells, alternating O
// (maximizing) and X (minimizing). Each probe is undone before the next,
// so `cells` is back in its input state when the call returns.
fn minimax(cells: &mut [Cell; BOARD_CELLS], maximizing: bool, stats: &mut SearchStats) -> i32 {
    stats.nodes += 1;

    if let Some(winner) = winner_on(cells) {
        return match winner {
            Mark::X => X_WIN_SCORE,
            Mark::O => O_WIN_SCORE,
        };
    }
    if cells.iter().all(|cell| cell.is_some()) {
        return DRAW_SCORE;
    }

    if maximizing {
        let mut best = i32::MIN;
        for index in 0..BOARD_CELLS {
            if cells[index].is_some() {
                continue;
            }
            cells[index] = Some(Mark::O);
            let score = minimax(cells, false, stats);
            cells[index] = None;
            best = best.max(score);
        }
        best
    } else {
        let mut best = i32::MAX;
        for index in 0..BOARD_CELLS {
            if cells[index].is_some() {
                continue;
            }
            cells[index] = Some(Mark::X);
            let score = minimax(cells, true, stats);
            cells[index] = None;
            best = best.min(score);
        }
        best
    }
}
