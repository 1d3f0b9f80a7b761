pub mod ai;
pub mod game;
pub mod utils;

use gloo_timers::future::TimeoutFuture;
use log::{warn, LevelFilter};
use serde::{Deserialize, Serialize};
use serde_wasm_bindgen::{from_value, to_value};
use std::str::FromStr;
use std::time::Duration;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::js_sys::Promise;

pub use ai::{AiAgent, AiConfig, AiDecision, TargetStrategy};
pub use game::{
    calculate_damage, is_effective, Card, CardId, CardTemplate, CombatReport, CombatRule,
    DamageCalculation, Element, GameEvent, GamePhase, IntegrityError, MatchConfig, MatchOutcome,
    MatchState, RuleEngine, RuleError, RuleResolution, Side, VictoryReason, VictoryState,
    DEFAULT_CATALOG,
};
use utils::{AttackClock, WasmInstant};

const DEFAULT_ABORT_GRACE_MS: u32 = 100;

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    utils::set_panic_hook();
    utils::init_logging(LevelFilter::Info);
}

/// Constructor options for [`BattleEngine`]; every field is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    #[serde(flatten)]
    pub config: MatchConfig,
    pub ai: AiConfig,
    pub seed: Option<u64>,
    pub abort_grace_ms: u32,
    pub catalog: Option<Vec<CardTemplate>>,
    pub log_level: Option<String>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            config: MatchConfig::default(),
            ai: AiConfig::default(),
            seed: None,
            abort_grace_ms: DEFAULT_ABORT_GRACE_MS,
            catalog: None,
            log_level: None,
        }
    }
}

impl EngineOptions {
    fn build_engine(&self) -> RuleEngine {
        let engine = match self.seed {
            Some(seed) => RuleEngine::with_seed(self.ai, seed),
            None => RuleEngine::new(self.ai),
        };
        match &self.catalog {
            Some(catalog) => engine.with_catalog(catalog.clone()),
            None => engine,
        }
    }
}

fn to_js_error(error: RuleError) -> JsValue {
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn make_resolution_json(resolution: RuleResolution) -> Result<String, JsValue> {
    serde_json::to_string(&resolution).map_err(serde_to_js_error)
}

fn parse_element(value: &str) -> Result<Element, JsValue> {
    Element::from_str(value).map_err(|_| JsValue::from_str(&format!("unknown element: {value}")))
}

/// One match, owned by the page. Every intent returns a `RuleResolution` as JSON.
#[wasm_bindgen]
pub struct BattleEngine {
    engine: RuleEngine,
    state: MatchState,
    abort_grace: Duration,
    attack_clock: AttackClock,
}

impl BattleEngine {
    fn resolve<F>(&mut self, intent: F) -> Result<String, JsValue>
    where
        F: FnOnce(&mut RuleEngine, &mut MatchState) -> Result<Vec<GameEvent>, RuleError>,
    {
        let events = intent(&mut self.engine, &mut self.state).map_err(to_js_error)?;
        if self.state.pending_attack.is_none() {
            self.attack_clock.disarm();
        }
        make_resolution_json(RuleResolution::new(self.state.clone(), events))
    }
}

#[wasm_bindgen]
impl BattleEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(
        options_json: Option<String>,
        combat_rule: Option<String>,
    ) -> Result<BattleEngine, JsValue> {
        let mut options: EngineOptions = match options_json {
            Some(json) => serde_json::from_str(&json).map_err(serde_to_js_error)?,
            None => EngineOptions::default(),
        };
        if let Some(rule) = combat_rule
            .as_deref()
            .and_then(|value| CombatRule::from_str(value).ok())
        {
            options.config = options.config.with_combat_rule(rule);
        }
        if let Some(level) = options
            .log_level
            .as_deref()
            .and_then(|value| LevelFilter::from_str(value).ok())
        {
            log::set_max_level(level);
        }

        let mut engine = options.build_engine();
        let (state, _) = engine.new_match(options.config.clone());
        Ok(BattleEngine {
            engine,
            state,
            abort_grace: Duration::from_millis(u64::from(options.abort_grace_ms)),
            attack_clock: AttackClock::default(),
        })
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state).map_err(serde_to_js_error)
    }

    /// Replaces the match with a saved snapshot after checking it is consistent.
    pub fn set_state_json(&mut self, json: &str) -> Result<(), JsValue> {
        let state: MatchState = serde_json::from_str(json).map_err(serde_to_js_error)?;
        state
            .integrity_check()
            .map_err(|error| to_js_error(RuleError::IntegrityViolation { error }))?;
        self.state = state;
        self.attack_clock.disarm();
        Ok(())
    }

    pub fn event_log_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state.event_log).map_err(serde_to_js_error)
    }

    #[wasm_bindgen(js_name = "playCard")]
    pub fn play_card(&mut self, card_id: CardId) -> Result<String, JsValue> {
        self.resolve(|engine, state| engine.play_card(state, card_id))
    }

    #[wasm_bindgen(js_name = "beginAttack")]
    pub fn begin_attack(&mut self, card_id: CardId) -> Result<String, JsValue> {
        let json = self.resolve(|engine, state| engine.begin_attack(state, card_id))?;
        self.attack_clock.arm(WasmInstant::now());
        Ok(json)
    }

    #[wasm_bindgen(js_name = "chooseTarget")]
    pub fn choose_target(&mut self, card_id: CardId) -> Result<String, JsValue> {
        self.resolve(|engine, state| engine.choose_target(state, card_id))
    }

    #[wasm_bindgen(js_name = "abortAttack")]
    pub fn abort_attack(&mut self) -> Result<String, JsValue> {
        if self.attack_clock.blocks_abort(WasmInstant::now(), self.abort_grace) {
            warn!("abort ignored: inside {:?} grace window", self.abort_grace);
            return Err(to_js_error(RuleError::AbortTooEarly));
        }
        self.resolve(|engine, state| engine.abort_attack(state))
    }

    #[wasm_bindgen(js_name = "skipAction")]
    pub fn skip_action(&mut self) -> Result<String, JsValue> {
        self.resolve(|engine, state| engine.skip_action(state))
    }

    #[wasm_bindgen(js_name = "advancePhase")]
    pub fn advance_phase(&mut self) -> Result<String, JsValue> {
        self.resolve(|engine, state| engine.advance_phase(state))
    }

    #[wasm_bindgen(js_name = "restartMatch")]
    pub fn restart_match(&mut self) -> Result<String, JsValue> {
        self.resolve(|engine, state| Ok(engine.restart_match(state)))
    }

    pub fn surrender(&mut self) -> Result<String, JsValue> {
        self.resolve(|engine, state| engine.surrender(state))
    }

    #[wasm_bindgen(js_name = "checkVictory")]
    pub fn check_victory(&self) -> Result<String, JsValue> {
        serde_json::to_string(&RuleEngine::check_victory(&self.state)).map_err(serde_to_js_error)
    }

    #[wasm_bindgen(js_name = "previewDamage")]
    pub fn preview_damage(&self, attacker_id: CardId, target_id: CardId) -> Result<String, JsValue> {
        let preview =
            RuleEngine::preview_damage(&self.state, attacker_id, target_id).map_err(to_js_error)?;
        serde_json::to_string(&preview).map_err(serde_to_js_error)
    }

    /// Id of the card whose turn it is in battle, if any.
    #[wasm_bindgen(js_name = "currentActor")]
    pub fn current_actor(&self) -> Option<CardId> {
        self.state.current_actor().map(|card| card.id)
    }

    #[wasm_bindgen(js_name = "playableCards")]
    pub fn playable_cards(&self) -> Vec<CardId> {
        self.state.playable_cards(Side::Player)
    }

    #[wasm_bindgen(js_name = "canSummon")]
    pub fn can_summon(&self) -> bool {
        self.state.can_summon(Side::Player)
    }
}

/// The shipped card list.
#[wasm_bindgen(js_name = "defaultCatalog")]
pub fn default_catalog() -> Result<JsValue, JsValue> {
    to_value(&*DEFAULT_CATALOG).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "calculateDamage")]
pub fn calculate_damage_js(attacker: JsValue, defender: JsValue) -> Result<JsValue, JsValue> {
    let attacker: Card = from_value(attacker).map_err(JsValue::from)?;
    let defender: Card = from_value(defender).map_err(JsValue::from)?;
    to_value(&calculate_damage(&attacker, &defender)).map_err(JsValue::from)
}

/// Accepts element names in English (`"fire"`) or kanji (`"火"`).
#[wasm_bindgen(js_name = "isEffective")]
pub fn is_effective_js(attacker: &str, defender: &str) -> Result<bool, JsValue> {
    Ok(is_effective(parse_element(attacker)?, parse_element(defender)?))
}

#[wasm_bindgen(js_name = "checkVictory")]
pub fn check_victory(state: JsValue) -> Result<JsValue, JsValue> {
    let state: MatchState = from_value(state).map_err(JsValue::from)?;
    to_value(&RuleEngine::check_victory(&state)).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "validateState")]
pub fn validate_state(state: JsValue) -> Result<(), JsValue> {
    let state: MatchState = from_value(state).map_err(JsValue::from)?;
    state
        .integrity_check()
        .map_err(|error| to_js_error(RuleError::IntegrityViolation { error }))?;
    Ok(())
}

/// Resolves after `ms` milliseconds. Pacing for animations only; the engine
/// never waits on it.
#[wasm_bindgen(js_name = "presentationDelay")]
pub fn presentation_delay(ms: u32) -> Promise {
    future_to_promise(async move {
        if ms > 0 {
            TimeoutFuture::new(ms).await;
        }
        Ok(JsValue::UNDEFINED)
    })
}
