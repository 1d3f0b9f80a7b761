//! Battle core: match model, element table, combat and the phase engine.

pub mod catalog;
pub mod combat;
pub mod config;
pub mod damage;
pub mod elements;
pub mod rules;
pub mod state;
pub mod victory;

pub use catalog::{build_deck, deal_opening_hand, CardTemplate, OpeningDeal, DEFAULT_CATALOG};
pub use combat::{defeat_card, resolve_attack, CombatReport};
pub use config::{CombatRule, MatchConfig};
pub use damage::{calculate_damage, DamageCalculation};
pub use elements::{is_effective, Element};
pub use state::{
    Card,
    CardId,
    GameEvent,
    GamePhase,
    IntegrityError,
    MatchOutcome,
    MatchState,
    PendingAttack,
    PpPool,
    Side,
    SideState,
    SkipReason,
    VictoryReason,
    VictoryState,
};
pub use rules::{RuleEngine, RuleError, RuleResolution};
