use std::str::FromStr;

use serde::{Deserialize, Serialize};

const DEFAULT_FIELD_SLOTS: usize = 3;
const DEFAULT_OPENING_HAND: usize = 3;
const DEFAULT_HAND_LIMIT: usize = 7;
const DEFAULT_STARTING_PP: u8 = 1;
const DEFAULT_PP_CAP: u8 = 5;
const DEFAULT_VICTORY_COST: u32 = 5;

/// How an attack against a card of identical speed is resolved.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CombatRule {
    /// The acting card always strikes first; the target answers on its own turn.
    #[default]
    #[serde(alias = "priority")]
    ActorPriority,
    /// Same speed and target not yet acted: both strike at once and both are spent.
    #[serde(alias = "clash")]
    SimultaneousClash,
}

impl FromStr for CombatRule {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "actor_priority" | "priority" | "default" => Ok(CombatRule::ActorPriority),
            "simultaneous_clash" | "simultaneous" | "clash" => Ok(CombatRule::SimultaneousClash),
            _ => Err(()),
        }
    }
}

/// Tunable match rules. Missing fields fall back to the standard game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MatchConfig {
    pub field_slots: usize,
    pub opening_hand: usize,
    pub hand_limit: usize,
    pub starting_pp: u8,
    pub pp_cap: u8,
    pub victory_cost: u32,
    pub combat_rule: CombatRule,
}

impl MatchConfig {
    pub fn with_combat_rule(mut self, rule: CombatRule) -> Self {
        self.combat_rule = rule;
        self
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            field_slots: DEFAULT_FIELD_SLOTS,
            opening_hand: DEFAULT_OPENING_HAND,
            hand_limit: DEFAULT_HAND_LIMIT,
            starting_pp: DEFAULT_STARTING_PP,
            pp_cap: DEFAULT_PP_CAP,
            victory_cost: DEFAULT_VICTORY_COST,
            combat_rule: CombatRule::default(),
        }
    }
}
