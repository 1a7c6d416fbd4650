//! AI 决策模块（随机与极小极大混合策略）。

pub mod minimax;

pub use minimax::{
    best_move, AiAgent, AiConfig, AiDecision, AiDifficulty, MovePolicy, SearchOutcome,
};
