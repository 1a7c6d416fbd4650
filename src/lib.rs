pub mod ai;
pub mod game;
pub mod utils;

use gloo_timers::future::TimeoutFuture;
use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use std::str::FromStr;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::js_sys::Promise;

pub use ai::{best_move, AiAgent, AiConfig, AiDecision, AiDifficulty, MovePolicy, SearchOutcome};
pub use game::{
    Cell, GameEvent, GameMode, GameOutcome, GameState, IntegrityError, Mark, PlaceMarkAction,
    RuleEngine, RuleError, RuleResolution, ScoreBoard, BOARD_CELLS, WIN_LINES,
};

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
    utils::console_log("tictactoe core ready");
}

fn to_js_error(error: RuleError) -> JsValue {
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn resolution_from_events(state: &GameState, events: Vec<GameEvent>) -> RuleResolution {
    RuleResolution::new(state.clone(), events)
}

fn make_resolution_json(resolution: RuleResolution) -> Result<String, JsValue> {
    serde_json::to_string(&resolution).map_err(serde_to_js_error)
}

fn build_ai_config(difficulty: Option<String>, exploration: Option<f64>) -> AiConfig {
    let mut config = difficulty
        .as_deref()
        .and_then(|value| AiDifficulty::from_str(value).ok())
        .map(AiConfig::from_difficulty)
        .unwrap_or_default();
    if let Some(exploration) = exploration {
        config = config.with_exploration(exploration);
    }
    config
}

#[derive(Serialize)]
struct AiMoveResponse {
    decision: AiDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    applied: Option<RuleResolution>,
}

#[wasm_bindgen]
pub struct GameEngine {
    state: GameState,
}

#[wasm_bindgen]
impl GameEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(initial_state_json: Option<String>) -> Result<GameEngine, JsValue> {
        let state = if let Some(json) = initial_state_json {
            serde_json::from_str(&json).map_err(serde_to_js_error)?
        } else {
            GameState::new(GameMode::default())
        };
        Ok(GameEngine { state })
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state).map_err(serde_to_js_error)
    }

    pub fn set_state_json(&mut self, json: &str) -> Result<(), JsValue> {
        let state: GameState = serde_json::from_str(json).map_err(serde_to_js_error)?;
        self.state = state;
        Ok(())
    }

    pub fn place_mark_json(&mut self, action_json: &str) -> Result<String, JsValue> {
        let action: PlaceMarkAction =
            serde_json::from_str(action_json).map_err(serde_to_js_error)?;
        let engine = RuleEngine::new();
        let events = engine
            .place_mark(&mut self.state, action)
            .map_err(to_js_error)?;
        make_resolution_json(resolution_from_events(&self.state, events))
    }

    pub fn reset_round(&mut self) -> Result<String, JsValue> {
        let engine = RuleEngine::new();
        let events = engine.reset_round(&mut self.state);
        make_resolution_json(resolution_from_events(&self.state, events))
    }

    pub fn switch_mode(&mut self, mode: &str) -> Result<String, JsValue> {
        let parsed = GameMode::from_str(mode)
            .map_err(|_| JsValue::from_str(&format!("unknown game mode: {mode}")))?;
        let engine = RuleEngine::new();
        let events = engine.switch_mode(&mut self.state, parsed);
        make_resolution_json(resolution_from_events(&self.state, events))
    }

    pub fn check_victory(&self) -> Result<JsValue, JsValue> {
        to_value(&RuleEngine::check_victory(&self.state)).map_err(JsValue::from)
    }

    pub fn apply_ai_move(
        &mut self,
        difficulty: Option<String>,
        exploration: Option<f64>,
    ) -> Result<String, JsValue> {
        let config = build_ai_config(difficulty, exploration);
        let mut agent = AiAgent::new(config);
        let decision = agent.choose_move(&self.state).map_err(to_js_error)?;

        // 决策出的格子走正常落子流程
        let engine = RuleEngine::new();
        let events = engine
            .place_mark(
                &mut self.state,
                PlaceMarkAction {
                    index: decision.cell,
                },
            )
            .map_err(to_js_error)?;
        let applied = Some(resolution_from_events(&self.state, events));

        let response = AiMoveResponse { decision, applied };
        serde_json::to_string(&response).map_err(serde_to_js_error)
    }

    pub fn think_ai(
        &self,
        difficulty: Option<String>,
        exploration: Option<f64>,
        delay_ms: Option<u32>,
    ) -> Promise {
        let state = self.state.clone();
        let config = build_ai_config(difficulty, exploration);
        let delay = delay_ms.unwrap_or(0);

        future_to_promise(async move {
            if delay > 0 {
                TimeoutFuture::new(delay).await;
            }
            let mut agent = AiAgent::new(config);
            let decision = agent.choose_move(&state).map_err(to_js_error)?;
            let json = serde_json::to_string(&decision).map_err(serde_to_js_error)?;
            Ok(JsValue::from_str(&json))
        })
    }
}

/// 返回一个示例游戏状态，方便前端调试或初始化。
#[wasm_bindgen(js_name = "createGameState")]
pub fn create_game_state() -> Result<JsValue, JsValue> {
    to_value(&GameState::sample()).map_err(JsValue::from)
}

/// 将传入的游戏状态进行深拷贝后返回。
#[wasm_bindgen(js_name = "cloneGameState")]
pub fn clone_game_state(state: JsValue) -> Result<JsValue, JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    let cloned = state.clone();
    to_value(&cloned).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "placeMark")]
pub fn place_mark(state: JsValue, action: JsValue) -> Result<JsValue, JsValue> {
    let mut state: GameState = from_value(state).map_err(JsValue::from)?;
    let action: PlaceMarkAction = from_value(action).map_err(JsValue::from)?;
    let engine = RuleEngine::new();
    match engine.place_mark(&mut state, action) {
        Ok(events) => to_value(&RuleResolution::new(state, events)).map_err(JsValue::from),
        Err(error) => Err(to_js_error(error)),
    }
}

#[wasm_bindgen(js_name = "resetBoard")]
pub fn reset_board(state: JsValue) -> Result<JsValue, JsValue> {
    let mut state: GameState = from_value(state).map_err(JsValue::from)?;
    let engine = RuleEngine::new();
    let events = engine.reset_round(&mut state);
    to_value(&RuleResolution::new(state, events)).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "checkOutcome")]
pub fn check_outcome(state: JsValue) -> Result<JsValue, JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    to_value(&RuleEngine::check_victory(&state)).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "validateState")]
pub fn validate_state(state: JsValue) -> Result<(), JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    state
        .integrity_check()
        .map_err(|error| to_js_error(RuleError::IntegrityViolation { error }))?;
    Ok(())
}

/// 计算 AI 的下一步；传入种子可得到确定性的结果。
#[wasm_bindgen(js_name = "computeAiMove")]
pub fn compute_ai_move(
    state: JsValue,
    difficulty: Option<String>,
    exploration: Option<f64>,
    seed: Option<u64>,
) -> Result<JsValue, JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    let config = build_ai_config(difficulty, exploration);
    let mut agent = match seed {
        Some(seed) => AiAgent::with_seed(config, seed),
        None => AiAgent::new(config),
    };
    let decision = agent.choose_move(&state).map_err(to_js_error)?;
    to_value(&decision).map_err(JsValue::from)
}

#[cfg(feature = "console_error_panic_hook")]
fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
fn set_panic_hook() {}
