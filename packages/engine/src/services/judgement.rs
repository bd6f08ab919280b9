use crate::error::GameError;
use crate::models::{Faction, GameState, Role, Winner};

/// Decides whether the game is over. Pure: the same state always yields the
/// same verdict.
pub fn judge(state: &GameState) -> Result<Option<Winner>, GameError> {
    state.check_invariants()?;

    let mafia = state.alive_in_faction(Faction::Mafia).len();
    let village = state.alive_in_faction(Faction::Village);
    let others = village.len();
    let total = mafia + others;
    let doctor_alive = village.iter().any(|p| p.role == Role::Doctor);

    let verdict = if mafia == 0 {
        Some(Winner::Village)
    } else if mafia > others {
        Some(Winner::Mafia)
    } else if mafia == others {
        match (total, mafia) {
            // The doctor can protect themself forever.
            (2, _) if doctor_alive => Some(Winner::Tie),
            (2, _) => Some(Winner::Mafia),
            (4, 2) if !doctor_alive => Some(Winner::Mafia),
            _ => None,
        }
    } else {
        None
    };

    Ok(verdict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Player;

    fn state_with(roles: &[Role]) -> GameState {
        let players = roles
            .iter()
            .enumerate()
            .map(|(i, role)| Player::new(format!("P{}", i), *role, ""))
            .collect();
        GameState::new(players).unwrap()
    }

    #[test]
    fn village_wins_without_mafia() {
        let state = state_with(&[Role::Villager, Role::Doctor]);
        assert_eq!(judge(&state).unwrap(), Some(Winner::Village));
    }

    #[test]
    fn mafia_majority_wins() {
        let state = state_with(&[Role::Mafia, Role::Mafia, Role::Villager]);
        assert_eq!(judge(&state).unwrap(), Some(Winner::Mafia));
    }

    #[test]
    fn one_on_one_with_doctor_is_a_tie() {
        let state = state_with(&[Role::Mafia, Role::Doctor]);
        assert_eq!(judge(&state).unwrap(), Some(Winner::Tie));
    }

    #[test]
    fn one_on_one_without_doctor_goes_to_mafia() {
        let state = state_with(&[Role::Mafia, Role::Detective]);
        assert_eq!(judge(&state).unwrap(), Some(Winner::Mafia));
    }

    #[test]
    fn two_on_two_without_doctor_goes_to_mafia() {
        let state = state_with(&[Role::Mafia, Role::Mafia, Role::Villager, Role::Detective]);
        assert_eq!(judge(&state).unwrap(), Some(Winner::Mafia));
    }

    #[test]
    fn two_on_two_with_doctor_continues() {
        let state = state_with(&[Role::Mafia, Role::Mafia, Role::Villager, Role::Doctor]);
        assert_eq!(judge(&state).unwrap(), None);
    }

    #[test]
    fn three_on_three_continues() {
        let state = state_with(&[
            Role::Mafia,
            Role::Mafia,
            Role::Mafia,
            Role::Villager,
            Role::Villager,
            Role::Villager,
        ]);
        assert_eq!(judge(&state).unwrap(), None);
    }

    #[test]
    fn minority_mafia_continues() {
        let state = state_with(&[Role::Mafia, Role::Villager, Role::Villager]);
        assert_eq!(judge(&state).unwrap(), None);
    }

    #[test]
    fn eliminated_players_do_not_count() {
        let mut state = state_with(&[Role::Mafia, Role::Villager, Role::Villager, Role::Doctor]);
        state.eliminate("P1").unwrap();
        state.eliminate("P2").unwrap();
        assert_eq!(judge(&state).unwrap(), Some(Winner::Tie));
    }

    #[test]
    fn verdict_is_idempotent() {
        let state = state_with(&[Role::Mafia, Role::Mafia, Role::Villager, Role::Detective]);
        let first = judge(&state).unwrap();
        for _ in 0..5 {
            assert_eq!(judge(&state).unwrap(), first);
        }
    }

    #[test]
    fn inconsistent_state_is_fatal() {
        let mut state = state_with(&[Role::Mafia, Role::Villager, Role::Villager]);
        state.alive_players.pop();
        assert!(matches!(
            judge(&state),
            Err(GameError::InvariantViolation(_))
        ));
    }
}
