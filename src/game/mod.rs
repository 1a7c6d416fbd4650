//! 游戏核心逻辑模块（棋盘状态与规则引擎）。

pub mod rules;
pub mod state;

pub use rules::{PlaceMarkAction, RuleEngine, RuleError, RuleResolution};
pub use state::{
    check_win,
    empty_indices,
    outcome_of,
    winner_on,
    winning_line,
    Cell,
    GameEvent,
    GameMode,
    GameOutcome,
    GameState,
    IntegrityError,
    Mark,
    ScoreBoard,
    BOARD_CELLS,
    WIN_LINES,
};
