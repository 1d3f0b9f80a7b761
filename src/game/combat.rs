use log::debug;
use serde::{Deserialize, Serialize};

use super::config::CombatRule;
use super::damage::{calculate_damage, DamageCalculation};
use super::state::{CardId, GameEvent, IntegrityError, MatchState};

/// Outcome of one resolved attack.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CombatReport {
    pub attacker_id: CardId,
    pub target_id: CardId,
    pub damage: DamageCalculation,
    /// Damage dealt back by the target when both struck simultaneously.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter: Option<DamageCalculation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defeated: Vec<CardId>,
}

/// Resolves exactly one attack and the defeats it causes.
///
/// Both cards must be on opposing fields; anything else is an engine bug and
/// comes back as an `IntegrityError` with the state untouched.
pub fn resolve_attack(
    state: &mut MatchState,
    attacker_id: CardId,
    target_id: CardId,
    rule: CombatRule,
) -> Result<Vec<GameEvent>, IntegrityError> {
    let attacker = state
        .card_on_field(attacker_id)
        .cloned()
        .ok_or(IntegrityError::CardNotOnField {
            card_id: attacker_id,
        })?;
    let target = state
        .side(attacker.owner.opponent())
        .find_on_field(target_id)
        .cloned()
        .ok_or(IntegrityError::CardNotOnField { card_id: target_id })?;

    let damage = calculate_damage(&attacker, &target);
    let clash = rule == CombatRule::SimultaneousClash
        && attacker.speed == target.speed
        && !target.has_acted
        && state.turn_order.contains(&target_id);
    let counter = clash.then(|| calculate_damage(&target, &attacker));

    if let Some(card) = state.card_on_field_mut(target_id) {
        card.hp = card.hp.saturating_sub(damage.total);
        if clash {
            card.has_acted = true;
        }
    }
    if let Some(card) = state.card_on_field_mut(attacker_id) {
        card.has_acted = true;
        if let Some(counter) = &counter {
            card.hp = card.hp.saturating_sub(counter.total);
        }
    }

    debug!(
        "{} -> {}: {} damage{} (hp {} -> {}){}",
        attacker.name,
        target.name,
        damage.total,
        if damage.effective { " effective" } else { "" },
        target.hp,
        target.hp.saturating_sub(damage.total),
        counter
            .map(|c| format!(", clash counter {}", c.total))
            .unwrap_or_default()
    );

    let mut defeated = Vec::new();
    let mut defeat_events = Vec::new();
    for card_id in [target_id, attacker_id] {
        let down = state
            .card_on_field(card_id)
            .map(|card| card.is_defeated())
            .unwrap_or(false);
        if down {
            if let Some(event) = defeat_card(state, card_id) {
                defeated.push(card_id);
                defeat_events.push(event);
            }
        }
    }

    let mut events = vec![GameEvent::CombatResolved(CombatReport {
        attacker_id,
        target_id,
        damage,
        counter,
        defeated,
    })];
    events.extend(defeat_events);
    Ok(events)
}

/// Takes a card off its field and out of turn order, crediting the other side.
pub fn defeat_card(state: &mut MatchState, card_id: CardId) -> Option<GameEvent> {
    let card = state.remove_from_field(card_id)?;
    state.remove_from_turn_order(card_id);
    let scorer = state.side_mut(card.owner.opponent());
    scorer.defeated_cost += u32::from(card.cost);
    debug!(
        "{} defeated; {:?} defeated cost now {}",
        card.name,
        card.owner.opponent(),
        scorer.defeated_cost
    );
    Some(GameEvent::CardDefeated {
        side: card.owner,
        card_id,
        cost: card.cost,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::elements::Element;
    use crate::game::state::tests::make_card;
    use crate::game::state::{GamePhase, Side};

    fn battle_state() -> MatchState {
        let mut state = MatchState::default();
        state.player.field[0] = Some(make_card(1, Side::Player, Element::Fire, 1, 20, 16, 4));
        state.enemy.field[0] = Some(make_card(2, Side::Enemy, Element::Metal, 1, 23, 14, 3));
        state.enemy.field[1] = Some(make_card(3, Side::Enemy, Element::Water, 2, 10, 13, 4));
        state.phase = GamePhase::Battle;
        state.build_turn_order();
        state
    }

    #[test]
    fn effective_hit_leaves_survivor() {
        let mut state = battle_state();

        let events = resolve_attack(&mut state, 1, 2, CombatRule::ActorPriority)
            .expect("attack should resolve");

        assert_eq!(state.enemy.find_on_field(2).map(|card| card.hp), Some(4));
        assert!(state.player.find_on_field(1).is_some_and(|card| card.has_acted));
        assert_eq!(events.len(), 1);
        match &events[0] {
            GameEvent::CombatResolved(report) => {
                assert_eq!(report.damage.total, 19);
                assert!(report.damage.effective);
                assert!(report.defeated.is_empty());
                assert!(report.counter.is_none());
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(state.player.defeated_cost, 0);
    }

    #[test]
    fn lethal_hit_removes_target_exactly_once() {
        let mut state = battle_state();

        let events = resolve_attack(&mut state, 1, 3, CombatRule::ActorPriority)
            .expect("attack should resolve");

        assert!(state.enemy.find_on_field(3).is_none());
        assert_eq!(state.enemy.field[1], None);
        assert!(!state.turn_order.contains(&3));
        assert_eq!(state.player.defeated_cost, 2);
        assert_eq!(state.enemy.defeated_cost, 0);
        assert!(events.contains(&GameEvent::CardDefeated {
            side: Side::Enemy,
            card_id: 3,
            cost: 2
        }));

        // already gone: a second defeat is a no-op
        assert!(defeat_card(&mut state, 3).is_none());
        assert_eq!(state.player.defeated_cost, 2);
    }

    #[test]
    fn priority_rule_never_retaliates() {
        let mut state = battle_state();
        let before = state.player.find_on_field(1).map(|card| card.hp);

        resolve_attack(&mut state, 1, 3, CombatRule::ActorPriority).expect("resolves");

        assert_eq!(state.player.find_on_field(1).map(|card| card.hp), before);
    }

    #[test]
    fn clash_rule_trades_blows_at_equal_speed() {
        let mut state = battle_state();
        if let Some(card) = state.enemy.find_on_field_mut(3) {
            card.hp = 30;
        }

        let events =
            resolve_attack(&mut state, 1, 3, CombatRule::SimultaneousClash).expect("resolves");

        // water beats fire: 13 + 5
        assert_eq!(state.player.find_on_field(1).map(|card| card.hp), Some(2));
        assert_eq!(state.enemy.find_on_field(3).map(|card| card.hp), Some(14));
        assert!(state.enemy.find_on_field(3).is_some_and(|card| card.has_acted));
        match &events[0] {
            GameEvent::CombatResolved(report) => {
                assert_eq!(report.counter.map(|c| c.total), Some(18));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn clash_can_defeat_both_cards() {
        let mut state = battle_state();
        if let Some(card) = state.player.find_on_field_mut(1) {
            card.hp = 5;
        }

        let events =
            resolve_attack(&mut state, 1, 3, CombatRule::SimultaneousClash).expect("resolves");

        assert!(state.player.field_is_empty());
        assert!(state.enemy.find_on_field(3).is_none());
        assert_eq!(state.player.defeated_cost, 2);
        assert_eq!(state.enemy.defeated_cost, 1);
        assert_eq!(
            events
                .iter()
                .filter(|event| matches!(event, GameEvent::CardDefeated { .. }))
                .count(),
            2
        );
    }

    #[test]
    fn clash_skips_targets_that_already_acted() {
        let mut state = battle_state();
        if let Some(card) = state.enemy.find_on_field_mut(3) {
            card.hp = 30;
            card.has_acted = true;
        }

        resolve_attack(&mut state, 1, 3, CombatRule::SimultaneousClash).expect("resolves");

        assert_eq!(state.player.find_on_field(1).map(|card| card.hp), Some(20));
    }

    #[test]
    fn missing_or_friendly_target_is_an_integrity_error() {
        let mut state = battle_state();
        let snapshot = state.clone();

        assert_eq!(
            resolve_attack(&mut state, 1, 99, CombatRule::ActorPriority),
            Err(IntegrityError::CardNotOnField { card_id: 99 })
        );
        assert_eq!(
            resolve_attack(&mut state, 2, 3, CombatRule::ActorPriority),
            Err(IntegrityError::CardNotOnField { card_id: 3 })
        );
        assert_eq!(state, snapshot);
    }
}
