use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use super::{match_candidate, Orchestrator};
use crate::error::GameError;
use crate::models::{
    AuditKind, DecisionKind, EliminationCause, GameEvent, GamePhase, TrialNote, VoteCast,
    VoteDecision, VoteStage, VotingOutcome, VotingRecord,
};

/// Turns a raw ballot into a countable vote. Self-votes and unknown names are
/// redirected to a valid candidate; `None` only when there is nobody to vote
/// for.
pub fn validate_vote(
    voter: &str,
    decision: &VoteDecision,
    candidates: &[String],
) -> Option<VoteCast> {
    let first = candidates.first()?;
    let raw = decision.target.trim();

    if raw.eq_ignore_ascii_case(voter) {
        return Some(VoteCast {
            voter: voter.to_string(),
            target: first.clone(),
            reason: format!("Cannot vote for self, voting {} instead", first),
        });
    }

    let target = match match_candidate(raw, candidates) {
        Some(target) => target,
        None => {
            warn!("{} voted for unknown {:?}, counting {}", voter, raw, first);
            first.clone()
        }
    };
    Some(VoteCast {
        voter: voter.to_string(),
        target,
        reason: decision.reason.clone(),
    })
}

/// The leaders of a tally, listed in `order`, with their count. `None` when
/// nobody received a vote.
pub fn plurality(counts: &BTreeMap<String, u32>, order: &[String]) -> Option<(Vec<String>, u32)> {
    let top = counts.values().copied().max().filter(|top| *top > 0)?;
    let leaders = order
        .iter()
        .filter(|name| counts.get(*name) == Some(&top))
        .cloned()
        .collect();
    Some((leaders, top))
}

impl Orchestrator {
    pub(super) async fn run_voting(&mut self) -> Result<(), GameError> {
        let day = self.state.round_number;

        for sub_round in 1..=self.config.max_voting_rounds {
            self.enter_phase(GamePhase::DayVoting);
            info!("day {} voting, round {}", day, sub_round);

            let votes = self.cast_votes(sub_round, VoteStage::Initial, None).await?;
            let mut record = VotingRecord {
                day,
                sub_round,
                votes,
                trial: None,
                tied: Vec::new(),
                top_votes: 0,
                defense: None,
                final_votes: Vec::new(),
                outcome: VotingOutcome::NoVotes,
            };

            let Some((leaders, top)) = plurality(&self.state.vote_counts, &self.state.alive_players)
            else {
                info!("nobody voted in round {}", sub_round);
                self.push_record(record);
                continue;
            };
            record.top_votes = top;

            if leaders.len() > 1 {
                info!("vote tied between {} at {} each", leaders.join(", "), top);
                self.emit(GameEvent::VoteTied {
                    round: day,
                    sub_round,
                    stage: VoteStage::Initial,
                    candidates: leaders.clone(),
                    votes: top,
                });
                record.tied = leaders;
                record.outcome = VotingOutcome::InitialTie;
                self.push_record(record);
                continue;
            }

            // A single leader goes on trial; the day ends after the final vote.
            let subject = leaders[0].clone();
            self.emit(GameEvent::TrialStarted {
                round: day,
                sub_round,
                subject: subject.clone(),
                votes: top,
            });
            record.trial = Some(subject.clone());

            self.enter_phase(GamePhase::DayDefense);
            let defense = self.run_defense(&subject).await?;
            record.defense = defense.clone();

            self.enter_phase(GamePhase::DayFinalVoting);
            let note = TrialNote {
                subject: subject.clone(),
                defense,
            };
            record.final_votes = self.cast_votes(sub_round, VoteStage::Final, Some(note)).await?;

            record.outcome = match plurality(&self.state.vote_counts, &self.state.alive_players) {
                Some((finalists, _)) if finalists.len() == 1 => {
                    let condemned = finalists[0].clone();
                    self.eliminate(&condemned, EliminationCause::Vote)?;
                    VotingOutcome::Eliminated(condemned)
                }
                Some((finalists, votes)) => {
                    info!("final vote tied, nobody is eliminated today");
                    self.emit(GameEvent::VoteTied {
                        round: day,
                        sub_round,
                        stage: VoteStage::Final,
                        candidates: finalists.clone(),
                        votes,
                    });
                    VotingOutcome::FinalTie(finalists)
                }
                None => VotingOutcome::NoVotes,
            };
            self.push_record(record);
            return Ok(());
        }

        info!("no elimination on day {}", day);
        Ok(())
    }

    /// One ballot from every alive player, tallied in roster order.
    async fn cast_votes(
        &mut self,
        sub_round: u8,
        stage: VoteStage,
        trial: Option<TrialNote>,
    ) -> Result<Vec<VoteCast>, GameError> {
        let round = self.state.round_number;
        let kind = match stage {
            VoteStage::Initial => DecisionKind::Vote,
            VoteStage::Final => DecisionKind::FinalVote,
        };
        self.state.reset_votes();
        let voters = self.state.alive_players.clone();

        let mut requests = Vec::with_capacity(voters.len());
        for voter in &voters {
            let candidates: Vec<String> = voters.iter().filter(|n| *n != voter).cloned().collect();
            let agent = self.agent(voter)?;
            let request = self.request(kind, voter, candidates, trial.clone())?;
            requests.push((voter.clone(), async move { agent.vote(&request).await }));
        }
        let results = self.fanout.gather(requests).await;

        let mut cast = Vec::new();
        for (voter, result) in results {
            let decision = match result {
                Ok(decision) => decision,
                Err(e) => {
                    self.abstain(&voter, kind, &e);
                    continue;
                }
            };
            let candidates: Vec<String> = voters.iter().filter(|n| **n != voter).cloned().collect();
            let Some(vote) = validate_vote(&voter, &decision, &candidates) else {
                continue;
            };
            debug!("{} votes {} ({})", vote.voter, vote.target, vote.reason);
            self.state.record_vote(&vote.voter, &vote.target);
            self.emit(GameEvent::VoteCast {
                round,
                sub_round,
                stage,
                voter: vote.voter.clone(),
                target: vote.target.clone(),
                reason: vote.reason.clone(),
            });
            cast.push(vote);
        }
        Ok(cast)
    }

    async fn run_defense(&mut self, subject: &str) -> Result<Option<String>, GameError> {
        let round = self.state.round_number;
        let kind = DecisionKind::Defense;
        let agent = self.agent(subject)?;
        let request = self.request(kind, subject, Vec::new(), None)?;

        let text = match self.fanout.one(agent.defend(&request)).await {
            Ok(defense) => Some(defense.text),
            Err(e) => {
                self.abstain(subject, kind, &e);
                None
            }
        };
        if let Some(text) = &text {
            self.state
                .audit(AuditKind::Defense, format!("{} defended: {}", subject, text));
        }
        self.emit(GameEvent::Defense {
            round,
            subject: subject.to_string(),
            text: text.clone(),
        });
        Ok(text)
    }

    fn push_record(&mut self, record: VotingRecord) {
        self.state.voting_history.push(record.clone());
        self.emit(GameEvent::VotingRecorded { record });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn self_vote_is_redirected_to_first_candidate() {
        let candidates = names(&["Ben", "Cat"]);
        let vote = validate_vote("Ann", &VoteDecision::new("ann", "me!"), &candidates).unwrap();
        assert_eq!(vote.target, "Ben");
        assert_eq!(vote.reason, "Cannot vote for self, voting Ben instead");
    }

    #[test]
    fn fuzzy_target_is_matched() {
        let candidates = names(&["Ben", "Cat"]);
        let vote =
            validate_vote("Ann", &VoteDecision::new("I pick cat", "quiet"), &candidates).unwrap();
        assert_eq!(vote.target, "Cat");
        assert_eq!(vote.reason, "quiet");
    }

    #[test]
    fn unknown_target_falls_back_to_first_candidate() {
        let candidates = names(&["Ben", "Cat"]);
        let vote = validate_vote("Ann", &VoteDecision::new("Zed", "hunch"), &candidates).unwrap();
        assert_eq!(vote.target, "Ben");
        assert_eq!(vote.reason, "hunch");
    }

    #[test]
    fn nobody_to_vote_for() {
        assert_eq!(validate_vote("Ann", &VoteDecision::new("Ben", ""), &[]), None);
    }

    #[test]
    fn plurality_lists_leaders_in_roster_order() {
        let order = names(&["Ann", "Ben", "Cat"]);
        let mut counts = BTreeMap::new();
        counts.insert("Cat".to_string(), 2);
        counts.insert("Ann".to_string(), 2);
        counts.insert("Ben".to_string(), 1);
        assert_eq!(plurality(&counts, &order), Some((names(&["Ann", "Cat"]), 2)));
    }

    #[test]
    fn empty_tally_has_no_leader() {
        assert_eq!(plurality(&BTreeMap::new(), &names(&["Ann"])), None);
    }
}
