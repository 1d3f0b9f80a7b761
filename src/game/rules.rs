use log::{debug, info, warn};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{
    catalog::{build_deck, deal_opening_hand, CardTemplate, DEFAULT_CATALOG},
    combat::resolve_attack,
    config::MatchConfig,
    damage::{calculate_damage, DamageCalculation},
    state::{
        CardId, GameEvent, GamePhase, IntegrityError, MatchOutcome, MatchState, PendingAttack,
        Side, SkipReason, VictoryReason, VictoryState,
    },
    victory,
};
use crate::ai::{AiAgent, AiConfig};

const AI_SEED_SALT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Why an intent was refused. The state is never touched when one of these
/// comes back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum RuleError {
    #[error("the match is already over")]
    GameFinished,
    #[error("intent needs the {expected:?} phase, match is in {actual:?}")]
    InvalidPhase {
        expected: GamePhase,
        actual: GamePhase,
    },
    #[error("card {card_id} is not in hand")]
    CardNotFound { card_id: CardId },
    #[error("summon costs {required} pp, only {available} left")]
    InsufficientPp { required: u8, available: u8 },
    #[error("no free field slot")]
    FieldFull,
    #[error("card {card_id} is not the card to act")]
    NotCurrentActor { card_id: CardId },
    #[error("no player card is waiting to act")]
    NotPlayerTurn,
    #[error("no attack is pending")]
    NoPendingAttack,
    #[error("card {attacker_id} is already choosing a target")]
    AttackPending { attacker_id: CardId },
    #[error("card {card_id} cannot be targeted")]
    InvalidTarget { card_id: CardId },
    #[error("{remaining} card(s) still have to act")]
    BattleInProgress { remaining: usize },
    #[error("abort ignored inside the grace window")]
    AbortTooEarly,
    #[error("match state is corrupt: {error:?}")]
    IntegrityViolation { error: IntegrityError },
}

impl From<IntegrityError> for RuleError {
    fn from(error: IntegrityError) -> Self {
        RuleError::IntegrityViolation { error }
    }
}

/// Snapshot handed back to the presentation layer after every intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleResolution {
    pub state: MatchState,
    pub events: Vec<GameEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub victory: Option<VictoryState>,
}

impl RuleResolution {
    pub fn new(state: MatchState, events: Vec<GameEvent>) -> Self {
        let victory = state.outcome;
        Self {
            state,
            events,
            victory,
        }
    }
}

/// Drives a match: deals, phases, summons, battle order and the enemy's turns.
pub struct RuleEngine {
    catalog: Vec<CardTemplate>,
    ai: AiAgent,
    rng: SmallRng,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new(AiConfig::default())
    }
}

impl RuleEngine {
    pub fn new(ai_config: AiConfig) -> Self {
        Self {
            catalog: DEFAULT_CATALOG.clone(),
            ai: AiAgent::new(ai_config),
            rng: SmallRng::from_entropy(),
        }
    }

    /// Fully reproducible engine: same seed, same shuffles, same AI rolls.
    pub fn with_seed(ai_config: AiConfig, seed: u64) -> Self {
        Self {
            catalog: DEFAULT_CATALOG.clone(),
            ai: AiAgent::with_seed(ai_config, seed ^ AI_SEED_SALT),
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn with_catalog(mut self, catalog: Vec<CardTemplate>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn catalog(&self) -> &[CardTemplate] {
        &self.catalog
    }

    fn emit(state: &mut MatchState, events: &mut Vec<GameEvent>, event: GameEvent) {
        state.record_event(event.clone());
        events.push(event);
    }

    fn ensure_active(state: &MatchState) -> Result<(), RuleError> {
        if state.is_finished() {
            return Err(RuleError::GameFinished);
        }
        Self::ensure_integrity(state)
    }

    fn ensure_integrity(state: &MatchState) -> Result<(), RuleError> {
        state.integrity_check().map_err(RuleError::from)
    }

    fn ensure_phase(state: &MatchState, expected: GamePhase) -> Result<(), RuleError> {
        if state.phase != expected {
            return Err(RuleError::InvalidPhase {
                expected,
                actual: state.phase,
            });
        }
        Ok(())
    }

    /// Runs `apply` on a draft and commits only on success.
    fn transact<F>(&mut self, state: &mut MatchState, apply: F) -> Result<Vec<GameEvent>, RuleError>
    where
        F: FnOnce(&mut Self, &mut MatchState, &mut Vec<GameEvent>) -> Result<(), RuleError>,
    {
        let mut draft = state.clone();
        let mut events = Vec::new();
        if let Err(error) = apply(self, &mut draft, &mut events) {
            warn!("intent rejected: {error}");
            return Err(error);
        }
        *state = draft;
        Ok(events)
    }

    /// Fresh shuffled match, already in the first summon phase.
    pub fn new_match(&mut self, config: MatchConfig) -> (MatchState, Vec<GameEvent>) {
        let mut state = MatchState::new(config);
        let mut events = Vec::new();
        Self::emit(&mut state, &mut events, GameEvent::MatchStarted);

        for side in Side::BOTH {
            let deck = build_deck(&mut state, &self.catalog, side, &mut self.rng);
            let deal = deal_opening_hand(deck, state.config.opening_hand, &mut self.rng);
            let owner = state.side_mut(side);
            owner.hand = deal.hand;
            owner.deck = deal.deck;
            if !deal.guaranteed {
                Self::emit(&mut state, &mut events, GameEvent::OpeningHandDegraded { side });
            }
        }

        info!(
            "match started: {} cards per deck, rule {:?}",
            self.catalog.len(),
            state.config.combat_rule
        );
        Self::enter_summon(&mut state, &mut events);
        (state, events)
    }

    /// Throws the current match away and deals a new one with the same config.
    pub fn restart_match(&mut self, state: &mut MatchState) -> Vec<GameEvent> {
        let (fresh, events) = self.new_match(state.config.clone());
        *state = fresh;
        events
    }

    pub fn play_card(
        &mut self,
        state: &mut MatchState,
        card_id: CardId,
    ) -> Result<Vec<GameEvent>, RuleError> {
        self.transact(state, |_, state, events| {
            Self::ensure_active(state)?;
            Self::ensure_phase(state, GamePhase::Summon)?;
            let event = Self::summon(state, Side::Player, card_id)?;
            Self::emit(state, events, event);
            Ok(())
        })
    }

    fn summon(state: &mut MatchState, side: Side, card_id: CardId) -> Result<GameEvent, RuleError> {
        let owner = state.side_mut(side);
        let index = owner
            .find_card_in_hand_index(card_id)
            .ok_or(RuleError::CardNotFound { card_id })?;
        let cost = owner.hand[index].cost;
        if !owner.pp.can_afford(cost) {
            return Err(RuleError::InsufficientPp {
                required: cost,
                available: owner.pp.current,
            });
        }
        let slot = owner.first_empty_slot().ok_or(RuleError::FieldFull)?;

        let card = owner.hand.remove(index);
        owner.pp.current -= cost;
        debug!(
            "{side:?} summons {} into slot {slot} ({} pp left)",
            card.name, owner.pp.current
        );
        owner.field[slot] = Some(card);
        Ok(GameEvent::CardSummoned {
            side,
            card_id,
            slot,
            cost,
        })
    }

    pub fn begin_attack(
        &mut self,
        state: &mut MatchState,
        card_id: CardId,
    ) -> Result<Vec<GameEvent>, RuleError> {
        self.transact(state, |_, state, events| {
            Self::ensure_active(state)?;
            Self::ensure_phase(state, GamePhase::Battle)?;
            if let Some(pending) = state.pending_attack {
                return Err(RuleError::AttackPending {
                    attacker_id: pending.attacker_id,
                });
            }
            let is_actor = state
                .current_actor()
                .is_some_and(|card| card.id == card_id && card.owner == Side::Player);
            if !is_actor {
                return Err(RuleError::NotCurrentActor { card_id });
            }

            state.pending_attack = Some(PendingAttack {
                attacker_id: card_id,
            });
            Self::emit(state, events, GameEvent::AttackDeclared { attacker_id: card_id });
            Ok(())
        })
    }

    pub fn choose_target(
        &mut self,
        state: &mut MatchState,
        target_id: CardId,
    ) -> Result<Vec<GameEvent>, RuleError> {
        self.transact(state, |engine, state, events| {
            Self::ensure_active(state)?;
            Self::ensure_phase(state, GamePhase::Battle)?;
            let pending = state.pending_attack.ok_or(RuleError::NoPendingAttack)?;
            if state.enemy.find_on_field(target_id).is_none() {
                return Err(RuleError::InvalidTarget { card_id: target_id });
            }

            state.pending_attack = None;
            let rule = state.config.combat_rule;
            for event in resolve_attack(state, pending.attacker_id, target_id, rule)? {
                Self::emit(state, events, event);
            }
            engine.after_action(state, events)
        })
    }

    /// Backs out of target selection; the attacker keeps its action.
    pub fn abort_attack(&mut self, state: &mut MatchState) -> Result<Vec<GameEvent>, RuleError> {
        self.transact(state, |_, state, events| {
            Self::ensure_active(state)?;
            Self::ensure_phase(state, GamePhase::Battle)?;
            let pending = state.pending_attack.take().ok_or(RuleError::NoPendingAttack)?;
            Self::emit(
                state,
                events,
                GameEvent::AttackAborted {
                    attacker_id: pending.attacker_id,
                },
            );
            Ok(())
        })
    }

    pub fn skip_action(&mut self, state: &mut MatchState) -> Result<Vec<GameEvent>, RuleError> {
        self.transact(state, |engine, state, events| {
            Self::ensure_active(state)?;
            Self::ensure_phase(state, GamePhase::Battle)?;
            let card_id = state
                .current_actor()
                .filter(|card| card.owner == Side::Player)
                .map(|card| card.id)
                .ok_or(RuleError::NotPlayerTurn)?;

            state.pending_attack = None;
            if let Some(card) = state.card_on_field_mut(card_id) {
                card.has_acted = true;
            }
            Self::emit(
                state,
                events,
                GameEvent::ActionSkipped {
                    side: Side::Player,
                    card_id,
                    reason: SkipReason::Voluntary,
                },
            );
            engine.after_action(state, events)
        })
    }

    /// Leaves the current phase.
    ///
    /// From Summon this runs the enemy's summons, builds turn order and plays
    /// the battle until a player card has to act or the turn wraps around.
    pub fn advance_phase(&mut self, state: &mut MatchState) -> Result<Vec<GameEvent>, RuleError> {
        self.transact(state, |engine, state, events| {
            Self::ensure_active(state)?;
            match state.phase {
                GamePhase::Draw => {
                    Self::enter_summon(state, events);
                    Ok(())
                }
                GamePhase::Summon => {
                    engine.enemy_summons(state, events)?;
                    Self::start_battle(state, events);
                    engine.continue_battle(state, events)
                }
                GamePhase::Battle => {
                    if !state.battle_complete() {
                        let remaining = state
                            .turn_order
                            .iter()
                            .filter_map(|id| state.card_on_field(*id))
                            .filter(|card| !card.has_acted)
                            .count();
                        return Err(RuleError::BattleInProgress { remaining });
                    }
                    Self::end_phase(state, events)
                }
                actual => Err(RuleError::InvalidPhase {
                    expected: GamePhase::Summon,
                    actual,
                }),
            }
        })
    }

    /// The player concedes; allowed in any phase until the match is decided.
    pub fn surrender(&mut self, state: &mut MatchState) -> Result<Vec<GameEvent>, RuleError> {
        self.transact(state, |_, state, events| {
            Self::ensure_active(state)?;
            Self::emit(state, events, GameEvent::Surrendered { side: Side::Player });
            let verdict = VictoryState {
                outcome: MatchOutcome::EnemyVictory,
                reason: VictoryReason::Surrender,
            };
            if let Some(event) = state.declare_victory(verdict) {
                info!("player surrendered on turn {}", state.turn);
                events.push(event);
            }
            Ok(())
        })
    }

    /// Damage `attacker_id` would deal to `target_id`, without touching the state.
    pub fn preview_damage(
        state: &MatchState,
        attacker_id: CardId,
        target_id: CardId,
    ) -> Result<DamageCalculation, RuleError> {
        let attacker = state
            .card_on_field(attacker_id)
            .ok_or(RuleError::InvalidTarget {
                card_id: attacker_id,
            })?;
        let target = state
            .side(attacker.owner.opponent())
            .find_on_field(target_id)
            .ok_or(RuleError::InvalidTarget { card_id: target_id })?;
        Ok(calculate_damage(attacker, target))
    }

    pub fn check_victory(state: &MatchState) -> Option<VictoryState> {
        victory::evaluate(state)
    }

    fn enter_summon(state: &mut MatchState, events: &mut Vec<GameEvent>) {
        state.phase = GamePhase::Summon;
        let turn = state.turn;
        Self::emit(
            state,
            events,
            GameEvent::PhaseChanged {
                phase: GamePhase::Summon,
                turn,
            },
        );
        for side in Side::BOTH {
            let pp = {
                let owner = state.side_mut(side);
                owner.pp.refill();
                owner.pp
            };
            Self::emit(
                state,
                events,
                GameEvent::PpRefilled {
                    side,
                    current: pp.current,
                    max: pp.max,
                },
            );
        }
        debug!("turn {turn}: summon phase");
    }

    fn enemy_summons(
        &mut self,
        state: &mut MatchState,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), RuleError> {
        for card_id in self.ai.plan_summons(&state.enemy) {
            let event = Self::summon(state, Side::Enemy, card_id)?;
            Self::emit(state, events, event);
        }
        Ok(())
    }

    fn start_battle(state: &mut MatchState, events: &mut Vec<GameEvent>) {
        state.phase = GamePhase::Battle;
        state.build_turn_order();
        let turn = state.turn;
        Self::emit(
            state,
            events,
            GameEvent::PhaseChanged {
                phase: GamePhase::Battle,
                turn,
            },
        );
        let order = state.turn_order.clone();
        debug!("turn {turn}: battle order {order:?}");
        Self::emit(state, events, GameEvent::TurnOrderBuilt { order });
    }

    /// Post-action checks: victory first, then whatever acts next.
    fn after_action(
        &mut self,
        state: &mut MatchState,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), RuleError> {
        if Self::settle_victory(state, events) {
            return Ok(());
        }
        self.continue_battle(state, events)
    }

    /// Plays enemy actors until a player card is up or everyone has acted.
    fn continue_battle(
        &mut self,
        state: &mut MatchState,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), RuleError> {
        loop {
            if state.is_finished() {
                return Ok(());
            }
            let Some((actor_id, owner)) = state.current_actor().map(|card| (card.id, card.owner))
            else {
                return Self::end_phase(state, events);
            };
            if owner == Side::Player {
                return Ok(());
            }

            self.enemy_act(state, events, actor_id)?;
            if Self::settle_victory(state, events) {
                return Ok(());
            }
        }
    }

    fn enemy_act(
        &mut self,
        state: &mut MatchState,
        events: &mut Vec<GameEvent>,
        attacker_id: CardId,
    ) -> Result<(), RuleError> {
        let Some(decision) = self.ai.choose_target(state, attacker_id) else {
            if let Some(card) = state.card_on_field_mut(attacker_id) {
                card.has_acted = true;
            }
            Self::emit(
                state,
                events,
                GameEvent::ActionSkipped {
                    side: Side::Enemy,
                    card_id: attacker_id,
                    reason: SkipReason::NoTargets,
                },
            );
            return Ok(());
        };

        Self::emit(
            state,
            events,
            GameEvent::EnemyTargetChosen {
                attacker_id,
                target_id: decision.target_id,
                strategy: decision.strategy,
            },
        );
        let rule = state.config.combat_rule;
        for event in resolve_attack(state, attacker_id, decision.target_id, rule)? {
            Self::emit(state, events, event);
        }
        Ok(())
    }

    /// Latches a terminal result if there is one. Returns true when the match is over.
    fn settle_victory(state: &mut MatchState, events: &mut Vec<GameEvent>) -> bool {
        let Some(verdict) = victory::evaluate(state) else {
            return false;
        };
        if let Some(event) = state.declare_victory(verdict) {
            info!(
                "match over on turn {}: {:?} by {:?}",
                state.turn, verdict.outcome, verdict.reason
            );
            events.push(event);
        }
        true
    }

    /// End of turn: last victory check, then PP growth, draws and the next summon phase.
    fn end_phase(state: &mut MatchState, events: &mut Vec<GameEvent>) -> Result<(), RuleError> {
        state.phase = GamePhase::End;
        state.pending_attack = None;
        state.turn_order.clear();
        let turn = state.turn;
        Self::emit(
            state,
            events,
            GameEvent::PhaseChanged {
                phase: GamePhase::End,
                turn,
            },
        );
        if Self::settle_victory(state, events) {
            return Ok(());
        }

        state.turn += 1;
        let turn = state.turn;
        Self::emit(state, events, GameEvent::TurnStarted { turn });

        let cap = state.config.pp_cap;
        for side in Side::BOTH {
            state.side_mut(side).pp.grow(cap);
        }
        for side in Side::BOTH {
            if let Some(event) = state.draw_card(side) {
                Self::emit(state, events, event);
            }
        }

        Self::enter_summon(state, events);
        Self::ensure_integrity(state)
    }
}
