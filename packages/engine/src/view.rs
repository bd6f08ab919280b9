//! Projection of the game state onto what a single participant knows.
//!
//! This is a query over [`GameState`]: it has no behaviour of its own and is
//! what prompt renderers and end-of-game reports build on. Other players'
//! roles only ever appear through the detective's own findings.

use serde::{Deserialize, Serialize};

use crate::models::{
    GamePhase, GameState, InvestigationFinding, NightActionRecord, Role, Utterance, VotingRecord,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerView {
    pub name: String,
    pub personality: String,
    pub role: Role,
    pub is_alive: bool,
    pub phase: GamePhase,
    pub round: u32,
    pub alive: Vec<String>,
    pub eliminated: Vec<String>,
    /// Fellow mafia members (mafia only, includes eliminated members).
    pub teammates: Vec<String>,
    pub own_actions: Vec<NightActionRecord>,
    /// Investigation results (detective only).
    pub findings: Vec<InvestigationFinding>,
    pub transcript: Vec<Utterance>,
    pub voting_history: Vec<VotingRecord>,
}

pub fn view(state: &GameState, player: &str) -> Option<PlayerView> {
    let me = state.player(player)?;

    let teammates = if me.role.is_mafia() {
        state
            .mafia_members()
            .into_iter()
            .map(str::to_string)
            .collect()
    } else {
        Vec::new()
    };

    let findings = if me.role == Role::Detective {
        state.detective_results.clone()
    } else {
        Vec::new()
    };

    Some(PlayerView {
        name: me.name.clone(),
        personality: me.personality.clone(),
        role: me.role,
        is_alive: me.is_alive,
        phase: state.phase,
        round: state.round_number,
        alive: state.alive_players.clone(),
        eliminated: state.eliminated.clone(),
        teammates,
        own_actions: state.night_actions_of(player).to_vec(),
        findings,
        transcript: state.transcript.clone(),
        voting_history: state.voting_history.clone(),
    })
}

impl PlayerView {
    /// Whether the player was accused in the most recent `window` messages.
    pub fn recently_accused(&self, window: usize) -> bool {
        const KEYWORDS: [&str; 5] = ["suspicious", "sus", "mafia", "vote", "eliminate"];
        let name = self.name.to_lowercase();
        let start = self.transcript.len().saturating_sub(window);
        self.transcript[start..].iter().any(|u| {
            let message = u.message.to_lowercase();
            u.speaker != self.name
                && message.contains(&name)
                && KEYWORDS.iter().any(|k| message.contains(k))
        })
    }
}
