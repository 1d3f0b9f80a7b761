use serde::{Deserialize, Serialize};

use super::elements::is_effective;
use super::state::Card;

/// Advantage bonus for cost-1 attackers.
pub const LOW_COST_BONUS: i16 = 3;
/// Advantage bonus for every other cost.
pub const HIGH_COST_BONUS: i16 = 5;

/// Breakdown of a single hit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DamageCalculation {
    pub base: i16,
    pub bonus: i16,
    pub total: i16,
    pub effective: bool,
}

pub fn advantage_bonus(cost: u8) -> i16 {
    if cost == 1 {
        LOW_COST_BONUS
    } else {
        HIGH_COST_BONUS
    }
}

/// Damage the attacker would deal to the defender. Never touches hp.
pub fn calculate_damage(attacker: &Card, defender: &Card) -> DamageCalculation {
    let base = attacker.attack.max(1);
    let effective = is_effective(attacker.element, defender.element);
    let bonus = if effective {
        advantage_bonus(attacker.cost)
    } else {
        0
    };

    DamageCalculation {
        base,
        bonus,
        total: base.saturating_add(bonus),
        effective,
    }
}
