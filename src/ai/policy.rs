use log::debug;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::game::{CardId, MatchState, SideState};

const DEFAULT_FOCUS_LOWEST_HP: f64 = 0.9;

/// Tuning knobs for the scripted opponent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AiConfig {
    /// Chance of going for the weakest target instead of a random one.
    pub focus_lowest_hp: f64,
}

impl AiConfig {
    pub fn with_focus(mut self, focus_lowest_hp: f64) -> Self {
        self.focus_lowest_hp = if focus_lowest_hp.is_nan() {
            DEFAULT_FOCUS_LOWEST_HP
        } else {
            focus_lowest_hp.clamp(0.0, 1.0)
        };
        self
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            focus_lowest_hp: DEFAULT_FOCUS_LOWEST_HP,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TargetStrategy {
    LowestHp,
    Random,
}

/// Target picked for one enemy attacker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AiDecision {
    pub attacker_id: CardId,
    pub target_id: CardId,
    pub strategy: TargetStrategy,
    pub roll: f64,
}

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

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    /// Greedy summon plan: most expensive first, every card that still fits.
    ///
    /// Only plans; the rules engine performs each summon.
    pub fn plan_summons(&self, side: &SideState) -> Vec<CardId> {
        let mut candidates: Vec<_> = side.hand.iter().collect();
        candidates.sort_by(|a, b| b.cost.cmp(&a.cost));

        let mut pp = side.pp.current;
        let mut free_slots = side.field.iter().filter(|slot| slot.is_none()).count();
        let mut plan = Vec::new();
        for card in candidates {
            if free_slots == 0 {
                break;
            }
            if pp >= card.cost {
                pp -= card.cost;
                free_slots -= 1;
                plan.push(card.id);
            } else {
                debug!("ai skips {} (cost {}, pp {})", card.name, card.cost, pp);
            }
        }
        plan
    }

    /// Picks a target on the side opposing `attacker_id`.
    ///
    /// Returns `None` when that side has no live card, in which case the
    /// attacker simply passes.
    pub fn choose_target(&mut self, state: &MatchState, attacker_id: CardId) -> Option<AiDecision> {
        let attacker = state.card_on_field(attacker_id)?;
        let targets: Vec<_> = state.side(attacker.owner.opponent()).live_cards().collect();
        if targets.is_empty() {
            return None;
        }

        let roll: f64 = self.rng.gen();
        let (strategy, target) = if roll < self.config.focus_lowest_hp {
            (
                TargetStrategy::LowestHp,
                targets.iter().min_by_key(|card| card.hp).copied(),
            )
        } else {
            (TargetStrategy::Random, targets.choose(&mut self.rng).copied())
        };
        let target = target?;

        debug!(
            "ai {} targets {} (hp {}) via {:?}, roll {:.3}",
            attacker.name, target.name, target.hp, strategy, roll
        );

        Some(AiDecision {
            attacker_id,
            target_id: target.id,
            strategy,
            roll,
        })
    }
}
