use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::catalog::CardTemplate;
use super::combat::CombatReport;
use super::config::MatchConfig;
use super::elements::Element;
use crate::ai::TargetStrategy;

/// Unique per card instance, never per template.
pub type CardId = u32;

/// The two camps of a match.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Player,
    Enemy,
}

impl Side {
    /// Enumeration order doubles as the turn-order tie-break.
    pub const BOTH: [Side; 2] = [Side::Player, Side::Enemy];

    pub const fn opponent(self) -> Side {
        match self {
            Side::Player => Side::Enemy,
            Side::Enemy => Side::Player,
        }
    }
}

/// A creature instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Card {
    pub id: CardId,
    pub name: String,
    pub element: Element,
    pub cost: u8,
    pub hp: i16,
    pub max_hp: i16,
    pub attack: i16,
    pub speed: u8,
    pub owner: Side,
    #[serde(default)]
    pub has_acted: bool,
}

impl Card {
    pub fn from_template(id: CardId, template: &CardTemplate, owner: Side) -> Self {
        Self {
            id,
            name: template.name.clone(),
            element: template.element,
            cost: template.cost,
            hp: template.hp,
            max_hp: template.hp,
            attack: template.attack,
            speed: template.speed,
            owner,
            has_acted: false,
        }
    }

    pub fn is_defeated(&self) -> bool {
        self.hp <= 0
    }
}

/// Summoning resource of one side.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PpPool {
    pub current: u8,
    pub max: u8,
}

impl PpPool {
    pub fn new(max: u8) -> Self {
        Self { current: max, max }
    }

    pub fn can_afford(&self, cost: u8) -> bool {
        self.current >= cost
    }

    pub fn refill(&mut self) {
        self.current = self.max;
    }

    /// Raise the ceiling by one (up to `cap`) and refill.
    pub fn grow(&mut self, cap: u8) {
        self.max = self.max.saturating_add(1).min(cap.max(self.max));
        self.refill();
    }
}

/// Zones and counters owned by one side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SideState {
    pub side: Side,
    #[serde(default)]
    pub hand: Vec<Card>,
    #[serde(default)]
    pub deck: Vec<Card>,
    pub field: Vec<Option<Card>>,
    pub pp: PpPool,
    /// Total cost of opposing cards this side has defeated.
    #[serde(default)]
    pub defeated_cost: u32,
}

impl SideState {
    pub fn new(side: Side, slots: usize, starting_pp: u8) -> Self {
        Self {
            side,
            hand: Vec::new(),
            deck: Vec::new(),
            field: vec![None; slots],
            pp: PpPool::new(starting_pp),
            defeated_cost: 0,
        }
    }

    pub fn find_card_in_hand_index(&self, card_id: CardId) -> Option<usize> {
        self.hand.iter().position(|card| card.id == card_id)
    }

    pub fn first_empty_slot(&self) -> Option<usize> {
        self.field.iter().position(Option::is_none)
    }

    pub fn has_empty_slot(&self) -> bool {
        self.first_empty_slot().is_some()
    }

    /// Cards on the field in slot order.
    pub fn live_cards(&self) -> impl Iterator<Item = &Card> {
        self.field.iter().flatten()
    }

    pub fn live_cards_mut(&mut self) -> impl Iterator<Item = &mut Card> {
        self.field.iter_mut().flatten()
    }

    pub fn field_is_empty(&self) -> bool {
        self.live_cards().next().is_none()
    }

    pub fn slot_of(&self, card_id: CardId) -> Option<usize> {
        self.field
            .iter()
            .position(|slot| slot.as_ref().map(|card| card.id) == Some(card_id))
    }

    pub fn find_on_field(&self, card_id: CardId) -> Option<&Card> {
        self.live_cards().find(|card| card.id == card_id)
    }

    pub fn find_on_field_mut(&mut self, card_id: CardId) -> Option<&mut Card> {
        self.live_cards_mut().find(|card| card.id == card_id)
    }

    /// Hand cards that could be summoned right now.
    pub fn playable_cards(&self) -> Vec<CardId> {
        if !self.has_empty_slot() {
            return Vec::new();
        }
        self.hand
            .iter()
            .filter(|card| self.pp.can_afford(card.cost))
            .map(|card| card.id)
            .collect()
    }

    pub fn can_summon(&self) -> bool {
        self.has_empty_slot() && self.hand.iter().any(|card| self.pp.can_afford(card.cost))
    }

    fn all_cards(&self) -> impl Iterator<Item = &Card> {
        self.hand
            .iter()
            .chain(self.deck.iter())
            .chain(self.field.iter().flatten())
    }
}

/// Phase of the current turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// Pre-game label before the first summon phase.
    #[default]
    Draw,
    Summon,
    Battle,
    End,
    GameOver,
}

/// A human attacker waiting for its target.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingAttack {
    pub attacker_id: CardId,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    PlayerVictory,
    EnemyVictory,
    Draw,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VictoryReason {
    CostThreshold,
    BoardWipe,
    Surrender,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct VictoryState {
    pub outcome: MatchOutcome,
    pub reason: VictoryReason,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Voluntary,
    NoTargets,
}

/// Event stream pushed to the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameEvent {
    MatchStarted,
    /// The catalog had no cost-1 card, so the opening hand is unguaranteed.
    OpeningHandDegraded {
        side: Side,
    },
    PhaseChanged {
        phase: GamePhase,
        turn: u32,
    },
    TurnStarted {
        turn: u32,
    },
    PpRefilled {
        side: Side,
        current: u8,
        max: u8,
    },
    CardDrawn {
        side: Side,
        card_id: CardId,
    },
    CardSummoned {
        side: Side,
        card_id: CardId,
        slot: usize,
        cost: u8,
    },
    TurnOrderBuilt {
        order: Vec<CardId>,
    },
    AttackDeclared {
        attacker_id: CardId,
    },
    AttackAborted {
        attacker_id: CardId,
    },
    EnemyTargetChosen {
        attacker_id: CardId,
        target_id: CardId,
        strategy: TargetStrategy,
    },
    CombatResolved(CombatReport),
    ActionSkipped {
        side: Side,
        card_id: CardId,
        reason: SkipReason,
    },
    CardDefeated {
        side: Side,
        card_id: CardId,
        cost: u8,
    },
    Surrendered {
        side: Side,
    },
    GameOver {
        outcome: MatchOutcome,
        reason: VictoryReason,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum IntegrityError {
    DuplicateCardId { card_id: CardId },
    WrongOwner { card_id: CardId, side: Side },
    FieldSizeMismatch { side: Side, expected: usize, actual: usize },
    PpOutOfRange { side: Side, current: u8, max: u8 },
    TurnOrderUnknownCard { card_id: CardId },
    TurnOrderDuplicate { card_id: CardId },
    CardNotOnField { card_id: CardId },
}

/// Authoritative model of one match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchState {
    pub player: SideState,
    pub enemy: SideState,
    pub turn: u32,
    pub phase: GamePhase,
    #[serde(default)]
    pub turn_order: Vec<CardId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_attack: Option<PendingAttack>,
    #[serde(default)]
    pub config: MatchConfig,
    #[serde(default)]
    pub next_card_id: CardId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_log: Vec<GameEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<VictoryState>,
}

impl MatchState {
    pub fn new(config: MatchConfig) -> Self {
        Self {
            player: SideState::new(Side::Player, config.field_slots, config.starting_pp),
            enemy: SideState::new(Side::Enemy, config.field_slots, config.starting_pp),
            turn: 1,
            phase: GamePhase::Draw,
            turn_order: Vec::new(),
            pending_attack: None,
            config,
            next_card_id: 1,
            event_log: Vec::new(),
            outcome: None,
        }
    }

    pub fn side(&self, side: Side) -> &SideState {
        match side {
            Side::Player => &self.player,
            Side::Enemy => &self.enemy,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut SideState {
        match side {
            Side::Player => &mut self.player,
            Side::Enemy => &mut self.enemy,
        }
    }

    pub fn record_event(&mut self, event: GameEvent) {
        self.event_log.push(event);
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn allocate_card_id(&mut self) -> CardId {
        let id = self.next_card_id;
        self.next_card_id = self.next_card_id.wrapping_add(1);
        id
    }

    pub fn card_on_field(&self, card_id: CardId) -> Option<&Card> {
        self.player
            .find_on_field(card_id)
            .or_else(|| self.enemy.find_on_field(card_id))
    }

    pub fn card_on_field_mut(&mut self, card_id: CardId) -> Option<&mut Card> {
        if self.player.slot_of(card_id).is_some() {
            self.player.find_on_field_mut(card_id)
        } else {
            self.enemy.find_on_field_mut(card_id)
        }
    }

    /// The first card in turn order that has not acted yet.
    pub fn current_actor(&self) -> Option<&Card> {
        if self.phase != GamePhase::Battle {
            return None;
        }
        self.turn_order
            .iter()
            .filter_map(|id| self.card_on_field(*id))
            .find(|card| !card.has_acted)
    }

    pub fn battle_complete(&self) -> bool {
        self.turn_order
            .iter()
            .filter_map(|id| self.card_on_field(*id))
            .all(|card| card.has_acted)
    }

    /// Every live card, fastest first. Ties keep player-then-enemy slot order.
    pub fn build_turn_order(&mut self) {
        let mut entries: Vec<(CardId, u8)> = Vec::new();
        for side in Side::BOTH {
            for card in self.side_mut(side).live_cards_mut() {
                card.has_acted = false;
                entries.push((card.id, card.speed));
            }
        }
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        self.turn_order = entries.into_iter().map(|(id, _)| id).collect();
    }

    pub fn remove_from_turn_order(&mut self, card_id: CardId) {
        self.turn_order.retain(|id| *id != card_id);
    }

    /// Empties the slot holding `card_id`, wherever it is.
    pub fn remove_from_field(&mut self, card_id: CardId) -> Option<Card> {
        for side in Side::BOTH {
            let owner = self.side_mut(side);
            if let Some(slot) = owner.slot_of(card_id) {
                return owner.field[slot].take();
            }
        }
        None
    }

    /// Draws one card unless the deck is empty or the hand is at its limit.
    pub fn draw_card(&mut self, side: Side) -> Option<GameEvent> {
        let hand_limit = self.config.hand_limit;
        let owner = self.side_mut(side);
        if owner.hand.len() >= hand_limit {
            debug!("{side:?} hand full ({hand_limit}), draw skipped");
            return None;
        }
        let Some(card) = owner.deck.pop() else {
            debug!("{side:?} deck empty, draw skipped");
            return None;
        };
        let card_id = card.id;
        debug!("{side:?} draws {} ({} left in deck)", card.name, owner.deck.len());
        owner.hand.push(card);
        Some(GameEvent::CardDrawn { side, card_id })
    }

    pub fn can_summon(&self, side: Side) -> bool {
        self.side(side).can_summon()
    }

    pub fn playable_cards(&self, side: Side) -> Vec<CardId> {
        self.side(side).playable_cards()
    }

    /// Fixes the result and closes the match. The first declaration wins.
    pub fn declare_victory(&mut self, victory: VictoryState) -> Option<GameEvent> {
        if self.outcome.is_some() {
            return None;
        }
        self.outcome = Some(victory);
        self.phase = GamePhase::GameOver;
        self.pending_attack = None;
        let event = GameEvent::GameOver {
            outcome: victory.outcome,
            reason: victory.reason,
        };
        self.record_event(event.clone());
        Some(event)
    }

    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        let mut seen = HashSet::new();
        for side in Side::BOTH {
            let owner = self.side(side);
            if owner.field.len() != self.config.field_slots {
                return Err(IntegrityError::FieldSizeMismatch {
                    side,
                    expected: self.config.field_slots,
                    actual: owner.field.len(),
                });
            }
            if owner.pp.current > owner.pp.max {
                return Err(IntegrityError::PpOutOfRange {
                    side,
                    current: owner.pp.current,
                    max: owner.pp.max,
                });
            }
            for card in owner.all_cards() {
                if !seen.insert(card.id) {
                    return Err(IntegrityError::DuplicateCardId { card_id: card.id });
                }
                if card.owner != side {
                    return Err(IntegrityError::WrongOwner {
                        card_id: card.id,
                        side,
                    });
                }
            }
        }

        let mut ordered = HashSet::new();
        for card_id in &self.turn_order {
            if !ordered.insert(*card_id) {
                return Err(IntegrityError::TurnOrderDuplicate { card_id: *card_id });
            }
            if self.card_on_field(*card_id).is_none() {
                return Err(IntegrityError::TurnOrderUnknownCard { card_id: *card_id });
            }
        }

        if let Some(pending) = &self.pending_attack {
            if self.card_on_field(pending.attacker_id).is_none() {
                return Err(IntegrityError::CardNotOnField {
                    card_id: pending.attacker_id,
                });
            }
        }

        Ok(())
    }
}

impl Default for MatchState {
    fn default() -> Self {
        Self::new(MatchConfig::default())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn make_card(
        id: CardId,
        owner: Side,
        element: Element,
        cost: u8,
        hp: i16,
        attack: i16,
        speed: u8,
    ) -> Card {
        Card {
            id,
            name: format!("card-{id}"),
            element,
            cost,
            hp,
            max_hp: hp,
            attack,
            speed,
            owner,
            has_acted: false,
        }
    }

    #[test]
    fn turn_order_sorts_by_speed_with_player_first_on_ties() {
        let mut state = MatchState::default();
        state.player.field[0] = Some(make_card(1, Side::Player, Element::Fire, 1, 20, 16, 4));
        state.player.field[2] = Some(make_card(2, Side::Player, Element::Wood, 1, 28, 10, 2));
        state.enemy.field[0] = Some(make_card(3, Side::Enemy, Element::Water, 2, 26, 13, 7));
        state.enemy.field[1] = Some(make_card(4, Side::Enemy, Element::Fire, 2, 22, 18, 4));
        if let Some(card) = state.player.field[0].as_mut() {
            card.has_acted = true;
        }
        state.phase = GamePhase::Battle;

        state.build_turn_order();

        assert_eq!(state.turn_order, vec![3, 1, 4, 2]);
        assert!(state.player.live_cards().all(|card| !card.has_acted));
        assert_eq!(state.current_actor().map(|card| card.id), Some(3));
        assert!(!state.battle_complete());
    }

    #[test]
    fn draw_respects_hand_limit_and_empty_deck() {
        let mut state = MatchState::default();
        state.player.deck.push(make_card(10, Side::Player, Element::Earth, 1, 25, 14, 1));
        for id in 0..7 {
            state
                .player
                .hand
                .push(make_card(20 + id, Side::Player, Element::Metal, 1, 23, 14, 3));
        }
        assert!(state.draw_card(Side::Player).is_none());
        assert_eq!(state.player.deck.len(), 1);

        state.player.hand.pop();
        assert_eq!(
            state.draw_card(Side::Player),
            Some(GameEvent::CardDrawn {
                side: Side::Player,
                card_id: 10
            })
        );
        assert!(state.draw_card(Side::Enemy).is_none());
    }

    #[test]
    fn pp_growth_is_capped() {
        let mut pool = PpPool::new(1);
        pool.current = 0;
        for _ in 0..10 {
            pool.grow(5);
        }
        assert_eq!(pool, PpPool { current: 5, max: 5 });
    }

    #[test]
    fn integrity_rejects_card_in_two_zones() {
        let mut state = MatchState::default();
        let card = make_card(5, Side::Player, Element::Fire, 1, 20, 16, 4);
        state.player.hand.push(card.clone());
        state.player.field[1] = Some(card);
        assert_eq!(
            state.integrity_check(),
            Err(IntegrityError::DuplicateCardId { card_id: 5 })
        );
    }

    #[test]
    fn integrity_rejects_stale_turn_order() {
        let mut state = MatchState::default();
        state.turn_order.push(42);
        assert_eq!(
            state.integrity_check(),
            Err(IntegrityError::TurnOrderUnknownCard { card_id: 42 })
        );
    }

    #[test]
    fn victory_is_declared_once() {
        let mut state = MatchState::default();
        let first = VictoryState {
            outcome: MatchOutcome::Draw,
            reason: VictoryReason::BoardWipe,
        };
        assert!(state.declare_victory(first).is_some());
        assert!(state
            .declare_victory(VictoryState {
                outcome: MatchOutcome::PlayerVictory,
                reason: VictoryReason::CostThreshold,
            })
            .is_none());
        assert_eq!(state.outcome, Some(first));
        assert_eq!(state.phase, GamePhase::GameOver);
    }
}
