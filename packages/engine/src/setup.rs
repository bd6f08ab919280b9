//! Roster construction: default personalities, role distribution and the
//! shuffled role assignment that produces the initial [`GameState`].

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::GameError;
use crate::models::{GameState, Player, Role};

pub struct Personality {
    pub name: &'static str,
    pub description: &'static str,
}

pub const DEFAULT_PERSONALITIES: [Personality; 8] = [
    Personality {
        name: "Miranda",
        description: "Paranoid and suspicious of everyone. Reads hidden meaning into small details, \
            switches suspects often, asks probing questions and demands explanations. Speaks in a \
            worried, questioning tone.",
    },
    Personality {
        name: "Victor",
        description: "Charming and smooth. Uses jokes and compliments to build allies and deflect \
            suspicion, steers conversations away from himself and dodges hard questions with \
            confidence.",
    },
    Personality {
        name: "Elena",
        description: "Logical and methodical. Tracks voting patterns, points out contradictions \
            and decides on evidence. Measured and thorough, sometimes slow to commit.",
    },
    Personality {
        name: "Rosa",
        description: "Emotional and intuitive. Trusts gut feelings over logic, says things like \
            'something feels off', reacts strongly to accusations and struggles to explain her \
            reasoning.",
    },
    Personality {
        name: "Sam",
        description: "Quiet and observant. Rarely speaks unless asked or holding something \
            important, remembers details, and keeps remarks brief but sharp. Hard to read.",
    },
    Personality {
        name: "Zoe",
        description: "Impulsive and unpredictable. Makes sudden accusations, flips votes, enjoys \
            stirring up chaos and talks excitedly. Can derail a discussion with one move.",
    },
    Personality {
        name: "Katherine",
        description: "A natural leader and mediator. Keeps discussion civil, proposes structured \
            votes and seeks consensus. Diplomatic, occasionally so focused on process that she \
            misses suspicious behavior.",
    },
    Personality {
        name: "Boris",
        description: "Blunt and direct. Says exactly what he thinks, hates long debates, asks \
            tough questions and gives harsh honest assessments. Firm and decisive.",
    },
];

/// `num_mafia` mafia, one doctor, one detective, villagers for the rest.
pub fn role_distribution(total: usize, num_mafia: usize) -> Result<Vec<Role>, GameError> {
    if num_mafia == 0 {
        return Err(GameError::InvalidSetup("at least one mafia member is required".to_string()));
    }
    if total < num_mafia + 2 {
        return Err(GameError::InvalidSetup(format!(
            "{} players cannot seat {} mafia plus a doctor and a detective",
            total, num_mafia
        )));
    }
    if 2 * num_mafia >= total {
        return Err(GameError::InvalidSetup(format!(
            "{} mafia out of {} players would win immediately",
            num_mafia, total
        )));
    }

    let mut roles = vec![Role::Mafia; num_mafia];
    roles.push(Role::Doctor);
    roles.push(Role::Detective);
    roles.resize(total, Role::Villager);
    Ok(roles)
}

/// Deals shuffled roles to `(name, personality)` pairs, keeping roster order.
pub fn assign_roles<R: Rng + ?Sized>(
    roster: &[(String, String)],
    num_mafia: usize,
    rng: &mut R,
) -> Result<GameState, GameError> {
    let mut roles = role_distribution(roster.len(), num_mafia)?;
    roles.shuffle(rng);

    let players = roster
        .iter()
        .zip(roles)
        .map(|((name, personality), role)| Player::new(name.clone(), role, personality.clone()))
        .collect();
    GameState::new(players)
}

/// The eight default participants as `(name, personality)` pairs.
pub fn default_roster() -> Vec<(String, String)> {
    DEFAULT_PERSONALITIES
        .iter()
        .map(|p| (p.name.to_string(), p.description.to_string()))
        .collect()
}
