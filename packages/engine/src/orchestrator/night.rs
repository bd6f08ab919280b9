use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use super::{match_candidate, Orchestrator};
use crate::config::ConsensusTieBreak;
use crate::error::GameError;
use crate::models::{
    AuditKind, DecisionKind, EliminationCause, GameEvent, GamePhase, NightActionKind,
    NightActionRecord, NightDecision, Role,
};

/// Plurality over `(proposer, target)` pairs given in roster order.
pub fn consensus(proposals: &[(String, String)], policy: ConsensusTieBreak) -> Option<String> {
    let mut tally: BTreeMap<&str, (u32, usize)> = BTreeMap::new();
    for (position, (_, target)) in proposals.iter().enumerate() {
        let entry = tally.entry(target.as_str()).or_insert((0, position));
        entry.0 += 1;
    }
    let top = tally.values().map(|(count, _)| *count).max()?;
    let tied = tally.iter().filter(|(_, (count, _))| *count == top);

    let chosen = match policy {
        ConsensusTieBreak::FirstProposed => tied
            .min_by_key(|(_, (_, first_seen))| *first_seen)
            .map(|(target, _)| *target),
        // BTreeMap iterates in name order.
        ConsensusTieBreak::Lexicographic => tied.map(|(target, _)| *target).next(),
    };
    chosen.map(str::to_string)
}

impl Orchestrator {
    pub(super) async fn run_night(&mut self) -> Result<(), GameError> {
        self.enter_phase(GamePhase::Night);
        self.state.reset_night_targets();
        info!("night {} begins", self.state.round_number);

        self.mafia_action().await?;
        self.doctor_action().await?;
        self.detective_action().await?;
        self.resolve_night()
    }

    async fn mafia_action(&mut self) -> Result<(), GameError> {
        let round = self.state.round_number;
        let kind = DecisionKind::NightAction(NightActionKind::MafiaPropose);
        let candidates: Vec<String> = self
            .state
            .alive()
            .filter(|p| !p.role.is_mafia())
            .map(|p| p.name.clone())
            .collect();
        let members: Vec<String> = self
            .state
            .alive_with_role(Role::Mafia)
            .into_iter()
            .map(|p| p.name.clone())
            .collect();
        if members.is_empty() || candidates.is_empty() {
            return Ok(());
        }

        let mut requests = Vec::with_capacity(members.len());
        for name in &members {
            let agent = self.agent(name)?;
            let request = self.request(kind, name, candidates.clone(), None)?;
            requests.push((name.clone(), async move { agent.night_action(&request).await }));
        }
        let results = self.fanout.gather(requests).await;

        let mut proposals = Vec::new();
        for (name, result) in results {
            let decision = match result {
                Ok(decision) => decision,
                Err(e) => {
                    self.abstain(&name, kind, &e);
                    continue;
                }
            };
            let Some(target) = self.night_target(&name, &decision, &candidates) else {
                continue;
            };
            debug!("{} proposes {}: {}", name, target, decision.reason);
            self.state.record_night_action(
                &name,
                NightActionRecord {
                    round,
                    kind: NightActionKind::MafiaPropose,
                    target: target.clone(),
                    reason: decision.reason.clone(),
                    finding: None,
                },
            );
            self.emit(GameEvent::MafiaProposal {
                round,
                player: name.clone(),
                target: target.clone(),
                reason: decision.reason,
            });
            proposals.push((name, target));
        }

        if let Some(target) = consensus(&proposals, self.config.tie_break) {
            info!("mafia settle on a target");
            self.emit(GameEvent::MafiaConsensus {
                round,
                target: target.clone(),
            });
            self.state.mafia_target = Some(target);
        }
        Ok(())
    }

    async fn doctor_action(&mut self) -> Result<(), GameError> {
        let round = self.state.round_number;
        let kind = DecisionKind::NightAction(NightActionKind::DoctorSave);
        let Some(doctor) = self
            .state
            .alive_with_role(Role::Doctor)
            .first()
            .map(|p| p.name.clone())
        else {
            return Ok(());
        };
        let candidates = self.state.alive_players.clone();

        let agent = self.agent(&doctor)?;
        let request = self.request(kind, &doctor, candidates.clone(), None)?;
        let decision = match self.fanout.one(agent.night_action(&request)).await {
            Ok(decision) => decision,
            Err(e) => {
                self.abstain(&doctor, kind, &e);
                return Ok(());
            }
        };
        let Some(target) = self.night_target(&doctor, &decision, &candidates) else {
            return Ok(());
        };

        self.state.record_night_action(
            &doctor,
            NightActionRecord {
                round,
                kind: NightActionKind::DoctorSave,
                target: target.clone(),
                reason: decision.reason.clone(),
                finding: None,
            },
        );
        self.emit(GameEvent::DoctorProtect {
            round,
            player: doctor,
            target: target.clone(),
            reason: decision.reason,
        });
        self.state.doctor_save = Some(target);
        Ok(())
    }

    async fn detective_action(&mut self) -> Result<(), GameError> {
        let round = self.state.round_number;
        let kind = DecisionKind::NightAction(NightActionKind::DetectiveInvestigate);
        let Some(detective) = self
            .state
            .alive_with_role(Role::Detective)
            .first()
            .map(|p| p.name.clone())
        else {
            return Ok(());
        };
        let candidates: Vec<String> = self
            .state
            .alive_players
            .iter()
            .filter(|n| **n != detective && !self.state.is_investigated(n))
            .cloned()
            .collect();
        if candidates.is_empty() {
            debug!("{} has nobody left to investigate", detective);
            return Ok(());
        }

        let agent = self.agent(&detective)?;
        let request = self.request(kind, &detective, candidates.clone(), None)?;
        let decision = match self.fanout.one(agent.night_action(&request)).await {
            Ok(decision) => decision,
            Err(e) => {
                self.abstain(&detective, kind, &e);
                return Ok(());
            }
        };
        let Some(target) = self.night_target(&detective, &decision, &candidates) else {
            return Ok(());
        };
        let role = self
            .state
            .player(&target)
            .map(|p| p.role)
            .ok_or_else(|| GameError::UnknownPlayer(target.clone()))?;

        self.state.record_finding(&target, role);
        self.state.record_night_action(
            &detective,
            NightActionRecord {
                round,
                kind: NightActionKind::DetectiveInvestigate,
                target: target.clone(),
                reason: decision.reason.clone(),
                finding: Some(role),
            },
        );
        self.emit(GameEvent::Investigation {
            round,
            player: detective,
            target: target.clone(),
            role,
            reason: decision.reason,
        });
        self.state.detective_check = Some(target);
        Ok(())
    }

    /// Validates a night target. Anything unusable is an abstention.
    fn night_target(
        &self,
        player: &str,
        decision: &NightDecision,
        candidates: &[String],
    ) -> Option<String> {
        let raw = decision.target.as_deref()?;
        let target = match_candidate(raw, candidates);
        if target.is_none() {
            warn!("{} chose an invalid night target {:?}, ignoring", player, raw);
        }
        target
    }

    fn resolve_night(&mut self) -> Result<(), GameError> {
        let round = self.state.round_number;
        let target = self.state.mafia_target.clone();
        let saved = self.state.doctor_save.clone();

        let eliminated = match target {
            Some(target) if saved.as_deref() == Some(target.as_str()) => {
                info!("the night attack was prevented");
                self.state
                    .audit(AuditKind::NightSave, format!("{} was saved by the doctor", target));
                self.emit(GameEvent::NightSave {
                    round,
                    target: target.clone(),
                });
                None
            }
            Some(target) => {
                self.eliminate(&target, EliminationCause::Night)?;
                Some(target)
            }
            None => None,
        };

        let summary = format!(
            "Night {}: mafia target {}, doctor save {}, detective check {}",
            round,
            self.state.mafia_target.as_deref().unwrap_or("none"),
            self.state.doctor_save.as_deref().unwrap_or("none"),
            self.state.detective_check.as_deref().unwrap_or("none"),
        );
        self.state.audit(AuditKind::NightSummary, summary);
        self.emit(GameEvent::NightResult { round, eliminated });
        Ok(())
    }
}
