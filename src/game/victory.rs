use super::state::{MatchOutcome, MatchState, VictoryReason, VictoryState};

/// Terminal check, first matching rule wins:
/// cost threshold (player, then enemy), then empty fields. Hands are ignored.
///
/// Pure: the engine decides when to latch the result into the state. A result
/// already latched (e.g. a surrender) is returned as is.
pub fn evaluate(state: &MatchState) -> Option<VictoryState> {
    if let Some(outcome) = state.outcome {
        return Some(outcome);
    }

    let threshold = state.config.victory_cost;
    if state.player.defeated_cost >= threshold {
        return Some(VictoryState {
            outcome: MatchOutcome::PlayerVictory,
            reason: VictoryReason::CostThreshold,
        });
    }
    if state.enemy.defeated_cost >= threshold {
        return Some(VictoryState {
            outcome: MatchOutcome::EnemyVictory,
            reason: VictoryReason::CostThreshold,
        });
    }

    let outcome = match (state.player.field_is_empty(), state.enemy.field_is_empty()) {
        (true, true) => MatchOutcome::Draw,
        (true, false) => MatchOutcome::EnemyVictory,
        (false, true) => MatchOutcome::PlayerVictory,
        (false, false) => return None,
    };
    Some(VictoryState {
        outcome,
        reason: VictoryReason::BoardWipe,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::elements::Element;
    use crate::game::state::tests::make_card;
    use crate::game::state::Side;

    fn contested() -> MatchState {
        let mut state = MatchState::default();
        state.player.field[0] = Some(make_card(1, Side::Player, Element::Fire, 1, 20, 16, 4));
        state.enemy.field[2] = Some(make_card(2, Side::Enemy, Element::Wood, 2, 30, 12, 4));
        state
    }

    #[test]
    fn ongoing_match_has_no_result() {
        let state = contested();
        assert_eq!(evaluate(&state), None);
        assert_eq!(evaluate(&state), evaluate(&state));
    }

    #[test]
    fn player_cost_threshold_outranks_everything() {
        let mut state = contested();
        state.player.defeated_cost = 5;
        state.enemy.defeated_cost = 6;
        state.player.field[0] = None;
        assert_eq!(
            evaluate(&state),
            Some(VictoryState {
                outcome: MatchOutcome::PlayerVictory,
                reason: VictoryReason::CostThreshold,
            })
        );
    }

    #[test]
    fn enemy_cost_threshold() {
        let mut state = contested();
        state.enemy.defeated_cost = 5;
        assert_eq!(
            evaluate(&state).map(|v| v.outcome),
            Some(MatchOutcome::EnemyVictory)
        );
    }

    #[test]
    fn both_fields_empty_is_a_draw() {
        let mut state = contested();
        state.player.field[0] = None;
        state.enemy.field[2] = None;
        assert_eq!(
            evaluate(&state),
            Some(VictoryState {
                outcome: MatchOutcome::Draw,
                reason: VictoryReason::BoardWipe,
            })
        );
    }

    #[test]
    fn empty_field_loses_even_with_cards_in_hand() {
        let mut state = contested();
        state.player.field[0] = None;
        state
            .player
            .hand
            .push(make_card(3, Side::Player, Element::Earth, 1, 25, 14, 1));
        state
            .player
            .hand
            .push(make_card(4, Side::Player, Element::Water, 1, 24, 11, 5));

        let first = evaluate(&state);
        assert_eq!(
            first,
            Some(VictoryState {
                outcome: MatchOutcome::EnemyVictory,
                reason: VictoryReason::BoardWipe,
            })
        );
        assert_eq!(evaluate(&state), first);
    }

    #[test]
    fn enemy_board_wipe_is_player_victory() {
        let mut state = contested();
        state.enemy.field[2] = None;
        assert_eq!(
            evaluate(&state).map(|v| v.outcome),
            Some(MatchOutcome::PlayerVictory)
        );
    }

    #[test]
    fn custom_threshold_is_respected() {
        let mut state = contested();
        state.config.victory_cost = 8;
        state.player.defeated_cost = 5;
        assert_eq!(evaluate(&state), None);
    }
}
