use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 棋盘格子总数（3x3）。
pub const BOARD_CELLS: usize = 9;

/// 固定的八条获胜连线：三行、三列、两条对角线。
pub const WIN_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    pub fn opponent(&self) -> Mark {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }
}

/// 单个格子：空位用 None 表示，序列化后与前端的 null 对应。
pub type Cell = Option<Mark>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    TwoPlayer,
    VersusAi,
}

impl Default for GameMode {
    fn default() -> Self {
        GameMode::VersusAi
    }
}

impl FromStr for GameMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "two" | "twoplayer" | "pvp" => Ok(GameMode::TwoPlayer),
            "ai" | "single" | "solo" | "versusai" => Ok(GameMode::VersusAi),
            _ => Err(()),
        }
    }
}

/// 本次会话内的胜场计数，不做任何持久化。
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreBoard {
    #[serde(default)]
    pub x: u32,
    #[serde(default)]
    pub o: u32,
}

impl ScoreBoard {
    pub fn tally(&mut self, mark: Mark) {
        match mark {
            Mark::X => self.x += 1,
            Mark::O => self.o += 1,
        }
    }

    pub fn wins_of(&self, mark: Mark) -> u32 {
        match mark {
            Mark::X => self.x,
            Mark::O => self.o,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameOutcome {
    InProgress,
    Won { winner: Mark },
    Draw,
}

/// 游戏事件流。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameEvent {
    MarkPlaced {
        index: usize,
        mark: Mark,
    },
    TurnSwitched {
        mark: Mark,
    },
    GameWon {
        winner: Mark,
        line: [usize; 3],
    },
    GameDrawn,
    BoardReset,
    ModeChanged {
        mode: GameMode,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum IntegrityError {
    WinnerWithoutLine { winner: Mark },
    DrawOnOpenBoard,
    ConflictingWinners,
}

/// 游戏整体状态。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameState {
    pub cells: [Cell; BOARD_CELLS],
    pub current_mark: Mark,
    #[serde(default)]
    pub mode: GameMode,
    #[serde(default)]
    pub scores: ScoreBoard,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<GameOutcome>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_log: Vec<GameEvent>,
}

impl GameState {
    pub fn new(mode: GameMode) -> Self {
        Self {
            cells: [None; BOARD_CELLS],
            current_mark: Mark::X,
            mode,
            scores: ScoreBoard::default(),
            outcome: None,
            event_log: Vec::new(),
        }
    }

    pub fn empty_indices(&self) -> Vec<usize> {
        empty_indices(&self.cells)
    }

    pub fn is_board_full(&self) -> bool {
        self.cells.iter().all(|cell| cell.is_some())
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn record_event(&mut self, event: GameEvent) {
        self.event_log.push(event);
    }

    pub fn switch_turn(&mut self) {
        self.current_mark = self.current_mark.opponent();
    }

    /// 清空棋盘并把先手交还给 X；比分与模式保持不变。
    pub fn reset_board(&mut self) {
        self.cells = [None; BOARD_CELLS];
        self.current_mark = Mark::X;
        self.outcome = None;
    }

    pub fn evaluate_outcome(&mut self) -> GameOutcome {
        if let Some(outcome) = self.outcome {
            return outcome;
        }

        if let Some((winner, line)) = winning_line(&self.cells) {
            return self.declare_victory(winner, line);
        }

        if self.is_board_full() {
            return self.declare_draw();
        }

        GameOutcome::InProgress
    }

    pub fn declare_victory(&mut self, winner: Mark, line: [usize; 3]) -> GameOutcome {
        if self.outcome.is_none() {
            self.scores.tally(winner);
            self.record_event(GameEvent::GameWon { winner, line });
            self.outcome = Some(GameOutcome::Won { winner });
        }
        GameOutcome::Won { winner }
    }

    pub fn declare_draw(&mut self) -> GameOutcome {
        if self.outcome.is_none() {
            self.record_event(GameEvent::GameDrawn);
            self.outcome = Some(GameOutcome::Draw);
        }
        GameOutcome::Draw
    }

    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        if check_win(&self.cells, Mark::X) && check_win(&self.cells, Mark::O) {
            return Err(IntegrityError::ConflictingWinners);
        }

        match self.outcome {
            Some(GameOutcome::Won { winner }) if !check_win(&self.cells, winner) => {
                Err(IntegrityError::WinnerWithoutLine { winner })
            }
            Some(GameOutcome::Draw) if !self.is_board_full() => {
                Err(IntegrityError::DrawOnOpenBoard)
            }
            _ => Ok(()),
        }
    }

    /// 构造一个对局中段的示例状态，方便前端调试或初始化。
    pub fn sample() -> Self {
        let mut state = GameState::new(GameMode::VersusAi);
        for (index, mark) in [(0, Mark::X), (8, Mark::O), (4, Mark::X)] {
            state.cells[index] = Some(mark);
            state.record_event(GameEvent::MarkPlaced { index, mark });
            state.switch_turn();
            state.record_event(GameEvent::TurnSwitched {
                mark: state.current_mark,
            });
        }
        state
    }
}

impl Default for GameState {
    fn default() -> Self {
        GameState::new(GameMode::default())
    }
}

/// Return all empty cell indices in ascending order.
pub fn empty_indices(cells: &[Cell; BOARD_CELLS]) -> Vec<usize> {
    (0..BOARD_CELLS)
        .filter(|&index| cells[index].is_none())
        .collect()
}

/// True iff `mark` holds all three cells of at least one win line.
pub fn check_win(cells: &[Cell; BOARD_CELLS], mark: Mark) -> bool {
    WIN_LINES
        .iter()
        .any(|line| line.iter().all(|&index| cells[index] == Some(mark)))
}

/// First completed line, scanning rows, then columns, then diagonals.
pub fn winning_line(cells: &[Cell; BOARD_CELLS]) -> Option<(Mark, [usize; 3])> {
    for line in WIN_LINES {
        let [a, b, c] = line;
        if let Some(mark) = cells[a] {
            if cells[b] == Some(mark) && cells[c] == Some(mark) {
                return Some((mark, line));
            }
        }
    }
    None
}

pub fn winner_on(cells: &[Cell; BOARD_CELLS]) -> Option<Mark> {
    winning_line(cells).map(|(mark, _)| mark)
}

pub fn outcome_of(cells: &[Cell; BOARD_CELLS]) -> GameOutcome {
    if let Some((winner, _)) = winning_line(cells) {
        return GameOutcome::Won { winner };
    }
    if cells.iter().all(|cell| cell.is_some()) {
        return GameOutcome::Draw;
    }
    GameOutcome::InProgress
}
