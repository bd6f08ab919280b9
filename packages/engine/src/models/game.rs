use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use super::player::Player;
use super::record::{
    AuditEntry, AuditKind, InvestigationFinding, NightActionRecord, Utterance, VotingRecord,
};
use super::role::{Faction, Role};
use crate::error::GameError;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    Night,
    DayDiscussion,
    DayVoting,
    DayDefense,
    DayFinalVoting,
    GameOver,
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GamePhase::Night => "night",
            GamePhase::DayDiscussion => "day_discussion",
            GamePhase::DayVoting => "day_voting",
            GamePhase::DayDefense => "day_defense",
            GamePhase::DayFinalVoting => "day_final_voting",
            GamePhase::GameOver => "game_over",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    Mafia,
    Village,
    Tie,
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Winner::Mafia => write!(f, "mafia"),
            Winner::Village => write!(f, "village"),
            Winner::Tie => write!(f, "tie"),
        }
    }
}

/// The single mutable aggregate. Only the orchestrator's phase methods
/// mutate it.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GameState {
    pub players: Vec<Player>,
    pub phase: GamePhase,
    pub round_number: u32,
    pub alive_players: Vec<String>,
    pub eliminated: Vec<String>,

    pub mafia_target: Option<String>,
    pub doctor_save: Option<String>,
    pub detective_check: Option<String>,
    pub detective_results: Vec<InvestigationFinding>,

    pub transcript: Vec<Utterance>,
    pub votes: BTreeMap<String, String>,
    pub vote_counts: BTreeMap<String, u32>,
    pub voting_history: Vec<VotingRecord>,

    pub night_actions: BTreeMap<String, Vec<NightActionRecord>>,
    pub audit_log: Vec<AuditEntry>,

    winner: Option<Winner>,
}

/// Names end up in file names, so they must not be able to leave a directory.
fn is_plain_name(name: &str) -> bool {
    !name.contains("..")
        && !name
            .chars()
            .any(|c| c == '/' || c == '\\' || c == ':' || c.is_control())
}

impl GameState {
    pub fn new(players: Vec<Player>) -> Result<Self, GameError> {
        if players.is_empty() {
            return Err(GameError::InvalidSetup("no players".to_string()));
        }
        let mut seen = HashSet::new();
        for player in &players {
            if player.name.trim().is_empty() {
                return Err(GameError::InvalidSetup("empty player name".to_string()));
            }
            if !is_plain_name(&player.name) {
                return Err(GameError::InvalidSetup(format!(
                    "player name {:?} is not a plain name",
                    player.name
                )));
            }
            if !seen.insert(player.name.as_str()) {
                return Err(GameError::InvalidSetup(format!(
                    "duplicate player name {}",
                    player.name
                )));
            }
        }

        let alive_players = players
            .iter()
            .filter(|p| p.is_alive)
            .map(|p| p.name.clone())
            .collect();
        let eliminated = players
            .iter()
            .filter(|p| !p.is_alive)
            .map(|p| p.name.clone())
            .collect();

        Ok(GameState {
            players,
            phase: GamePhase::Night,
            round_number: 1,
            alive_players,
            eliminated,
            mafia_target: None,
            doctor_save: None,
            detective_check: None,
            detective_results: Vec::new(),
            transcript: Vec::new(),
            votes: BTreeMap::new(),
            vote_counts: BTreeMap::new(),
            voting_history: Vec::new(),
            night_actions: BTreeMap::new(),
            audit_log: Vec::new(),
            winner: None,
        })
    }

    pub fn player(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.name == name)
    }

    pub fn is_alive(&self, name: &str) -> bool {
        self.player(name).map(|p| p.is_alive).unwrap_or(false)
    }

    pub fn alive(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.is_alive)
    }

    pub fn alive_with_role(&self, role: Role) -> Vec<&Player> {
        self.alive().filter(|p| p.role == role).collect()
    }

    pub fn alive_in_faction(&self, faction: Faction) -> Vec<&Player> {
        self.alive().filter(|p| p.role.faction() == faction).collect()
    }

    /// Every mafia member, alive or not, in roster order.
    pub fn mafia_members(&self) -> Vec<&str> {
        self.players
            .iter()
            .filter(|p| p.role.is_mafia())
            .map(|p| p.name.as_str())
            .collect()
    }

    pub fn winner(&self) -> Option<Winner> {
        self.winner
    }

    pub fn is_investigated(&self, name: &str) -> bool {
        self.detective_results.iter().any(|f| f.target == name)
    }

    pub fn night_actions_of(&self, name: &str) -> &[NightActionRecord] {
        self.night_actions
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Verifies the alive/eliminated partition against the roster.
    pub fn check_invariants(&self) -> Result<(), GameError> {
        if self.alive_players.len() + self.eliminated.len() != self.players.len() {
            return Err(GameError::InvariantViolation(format!(
                "{} alive + {} eliminated != {} players",
                self.alive_players.len(),
                self.eliminated.len(),
                self.players.len()
            )));
        }
        let mut seen = HashSet::new();
        for name in self.alive_players.iter().chain(self.eliminated.iter()) {
            if !seen.insert(name.as_str()) {
                return Err(GameError::InvariantViolation(format!(
                    "{} is listed twice",
                    name
                )));
            }
        }
        for player in &self.players {
            let listed_alive = self.alive_players.contains(&player.name);
            if listed_alive != player.is_alive {
                return Err(GameError::InvariantViolation(format!(
                    "alive flag of {} disagrees with the alive list",
                    player.name
                )));
            }
            if !listed_alive && !self.eliminated.contains(&player.name) {
                return Err(GameError::InvariantViolation(format!(
                    "{} is neither alive nor eliminated",
                    player.name
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn set_phase(&mut self, phase: GamePhase) -> GamePhase {
        std::mem::replace(&mut self.phase, phase)
    }

    pub(crate) fn reset_night_targets(&mut self) {
        self.mafia_target = None;
        self.doctor_save = None;
        self.detective_check = None;
    }

    pub(crate) fn reset_votes(&mut self) {
        self.votes.clear();
        self.vote_counts.clear();
        for player in &mut self.players {
            player.votes_received = 0;
        }
    }

    pub(crate) fn record_vote(&mut self, voter: &str, target: &str) {
        self.votes.insert(voter.to_string(), target.to_string());
        *self.vote_counts.entry(target.to_string()).or_insert(0) += 1;
        if let Some(player) = self.players.iter_mut().find(|p| p.name == target) {
            player.votes_received += 1;
        }
    }

    pub(crate) fn eliminate(&mut self, name: &str) -> Result<(), GameError> {
        let player = self
            .players
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| GameError::UnknownPlayer(name.to_string()))?;
        if !player.is_alive {
            return Err(GameError::AlreadyEliminated(name.to_string()));
        }
        player.is_alive = false;
        self.alive_players.retain(|n| n != name);
        self.eliminated.push(name.to_string());
        self.audit(AuditKind::Elimination, format!("{} was eliminated", name));
        Ok(())
    }

    pub(crate) fn record_night_action(&mut self, player: &str, record: NightActionRecord) {
        self.night_actions
            .entry(player.to_string())
            .or_default()
            .push(record);
    }

    pub(crate) fn record_finding(&mut self, target: &str, role: Role) {
        if self.is_investigated(target) {
            return;
        }
        self.detective_results.push(InvestigationFinding {
            round: self.round_number,
            target: target.to_string(),
            role,
        });
    }

    pub(crate) fn audit(&mut self, kind: AuditKind, message: String) {
        self.audit_log.push(AuditEntry {
            round: self.round_number,
            kind,
            message,
            timestamp: Utc::now(),
        });
    }

    pub(crate) fn set_winner(&mut self, winner: Winner) -> Result<(), GameError> {
        if self.winner.is_some() {
            return Err(GameError::WinnerAlreadySet);
        }
        self.winner = Some(winner);
        Ok(())
    }
}
