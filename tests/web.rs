//! Browser-side checks of the JS boundary.

#![cfg(target_arch = "wasm32")]

use gogyo_battle::{BattleEngine, GamePhase, MatchState, RuleResolution};
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn seeded_engine() -> BattleEngine {
    BattleEngine::new(Some(r#"{"seed": 21}"#.to_string()), None).expect("engine builds")
}

fn snapshot(engine: &BattleEngine) -> MatchState {
    let json = engine.state_json().expect("state serializes");
    serde_json::from_str(&json).expect("state parses")
}

#[wasm_bindgen_test]
fn new_engine_opens_in_summon_phase() {
    let engine = seeded_engine();
    let state = snapshot(&engine);
    assert_eq!(state.phase, GamePhase::Summon);
    assert_eq!(state.player.hand.len(), 3);
    assert!(engine.can_summon());
    assert!(!engine.playable_cards().is_empty());
    assert_eq!(engine.current_actor(), None);
}

#[wasm_bindgen_test]
fn play_card_returns_resolution() {
    let mut engine = seeded_engine();
    let card_id = engine.playable_cards()[0];

    let json = engine.play_card(card_id).expect("summon succeeds");
    let resolution: RuleResolution = serde_json::from_str(&json).expect("resolution parses");

    assert_eq!(resolution.events.len(), 1);
    assert!(resolution.state.player.find_on_field(card_id).is_some());
    assert!(resolution.victory.is_none());
}

#[wasm_bindgen_test]
fn illegal_intent_is_rejected_without_mutation() {
    let mut engine = seeded_engine();
    let before = engine.state_json().expect("state serializes");
    assert!(engine.choose_target(1).is_err());
    assert!(engine.abort_attack().is_err());
    assert_eq!(engine.state_json().expect("state serializes"), before);
}

#[wasm_bindgen_test]
fn surrender_then_restart() {
    let mut engine = seeded_engine();
    engine.surrender().expect("surrender succeeds");
    assert!(engine.check_victory().expect("victory serializes").contains("surrender"));
    assert!(engine.skip_action().is_err());

    engine.restart_match().expect("restart succeeds");
    assert_eq!(engine.check_victory().expect("victory serializes"), "null");
}

#[wasm_bindgen_test]
fn free_functions_work() {
    assert_eq!(gogyo_battle::is_effective_js("fire", "metal"), Ok(true));
    assert_eq!(gogyo_battle::is_effective_js("火", "水"), Ok(false));
    assert!(gogyo_battle::is_effective_js("plasma", "fire").is_err());
    assert!(gogyo_battle::default_catalog().is_ok());
}
