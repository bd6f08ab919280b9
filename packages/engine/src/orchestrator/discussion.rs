use chrono::Utc;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

use super::Orchestrator;
use crate::error::GameError;
use crate::models::{DecisionKind, GameEvent, Utterance};

/// A participant asking for the floor in one discussion round.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeakerBid {
    pub player: String,
    pub comment: String,
    pub urgency: u8,
    pub times_spoken: u32,
}

impl SpeakerBid {
    /// Urgency minus a half point per earlier speech, never below 1.
    pub fn adjusted_urgency(&self) -> f64 {
        let urgency = f64::from(self.urgency.clamp(1, 5));
        (urgency - 0.5 * f64::from(self.times_spoken)).max(1.0)
    }
}

/// Orders bids by adjusted urgency, then by fewer previous speeches, then
/// randomly.
pub fn rank_speakers<R: Rng + ?Sized>(mut bids: Vec<SpeakerBid>, rng: &mut R) -> Vec<SpeakerBid> {
    bids.shuffle(rng);
    bids.sort_by(|a, b| {
        b.adjusted_urgency()
            .total_cmp(&a.adjusted_urgency())
            .then(a.times_spoken.cmp(&b.times_spoken))
    });
    bids
}

impl Orchestrator {
    pub(super) async fn run_discussion(&mut self) -> Result<(), GameError> {
        let round = self.state.round_number;
        let budget = self.config.max_discussion_rounds * self.state.alive_players.len();
        let mut spoken: HashMap<String, u32> = HashMap::new();
        let mut speaking_rounds = 0;
        let mut silent_streak: u8 = 0;

        info!("day {} discussion, up to {} speeches", round, budget);
        while speaking_rounds < budget {
            let bids = self.collect_bids(&spoken).await?;
            let Some(speaker) = rank_speakers(bids, &mut self.rng).into_iter().next() else {
                silent_streak += 1;
                self.emit(GameEvent::Silence {
                    round,
                    streak: silent_streak,
                });
                if silent_streak >= self.config.silent_round_limit {
                    info!("{} silent rounds in a row, ending discussion", silent_streak);
                    break;
                }
                continue;
            };

            silent_streak = 0;
            speaking_rounds += 1;
            *spoken.entry(speaker.player.clone()).or_insert(0) += 1;
            debug!(
                "{} takes the floor (urgency {}, adjusted {:.1})",
                speaker.player,
                speaker.urgency,
                speaker.adjusted_urgency()
            );
            self.state.transcript.push(Utterance {
                round,
                speaker: speaker.player.clone(),
                message: speaker.comment.clone(),
                timestamp: Utc::now(),
            });
            self.emit(GameEvent::Utterance {
                round,
                speaker: speaker.player,
                message: speaker.comment,
            });

            if self.config.speaker_pause > Duration::ZERO {
                tokio::time::sleep(self.config.speaker_pause).await;
            }
        }
        Ok(())
    }

    async fn collect_bids(
        &mut self,
        spoken: &HashMap<String, u32>,
    ) -> Result<Vec<SpeakerBid>, GameError> {
        let kind = DecisionKind::Discussion;
        let alive = self.state.alive_players.clone();

        let mut requests = Vec::with_capacity(alive.len());
        for name in &alive {
            let agent = self.agent(name)?;
            let request = self.request(kind, name, Vec::new(), None)?;
            requests.push((name.clone(), async move { agent.discuss(&request).await }));
        }
        let results = self.fanout.gather(requests).await;

        let mut bids = Vec::new();
        for (name, result) in results {
            match result {
                Ok(decision) if decision.speak && !decision.comment.trim().is_empty() => {
                    bids.push(SpeakerBid {
                        times_spoken: spoken.get(&name).copied().unwrap_or(0),
                        player: name,
                        comment: decision.comment.trim().to_string(),
                        urgency: decision.urgency.clamp(1, 5),
                    });
                }
                Ok(_) => {}
                Err(e) => self.abstain(&name, kind, &e),
            }
        }
        Ok(bids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn bid(player: &str, urgency: u8, times_spoken: u32) -> SpeakerBid {
        SpeakerBid {
            player: player.to_string(),
            comment: format!("{} speaks", player),
            urgency,
            times_spoken,
        }
    }

    #[test]
    fn adjusted_urgency_has_a_floor() {
        assert_eq!(bid("A", 5, 0).adjusted_urgency(), 5.0);
        assert_eq!(bid("A", 5, 3).adjusted_urgency(), 3.5);
        assert_eq!(bid("A", 2, 10).adjusted_urgency(), 1.0);
        assert_eq!(bid("A", 9, 0).adjusted_urgency(), 5.0);
    }

    #[test]
    fn highest_adjusted_urgency_goes_first() {
        let mut rng = StdRng::seed_from_u64(7);
        let ranked = rank_speakers(vec![bid("A", 3, 0), bid("B", 5, 2), bid("C", 2, 0)], &mut rng);
        let order: Vec<&str> = ranked.iter().map(|b| b.player.as_str()).collect();
        assert_eq!(order, vec!["B", "A", "C"]);
    }

    #[test]
    fn equal_urgency_prefers_quieter_player() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            // 4 - 0.5 * 2 == 3 == 3 - 0
            let ranked = rank_speakers(vec![bid("Loud", 4, 2), bid("Quiet", 3, 0)], &mut rng);
            assert_eq!(ranked[0].player, "Quiet");
        }
    }

    #[test]
    fn full_ties_are_broken_randomly() {
        let mut firsts = std::collections::HashSet::new();
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let bids = vec![bid("A", 3, 0), bid("B", 3, 0), bid("C", 3, 0)];
            let ranked = rank_speakers(bids, &mut rng);
            firsts.insert(ranked[0].player.clone());
        }
        assert!(firsts.len() > 1);
    }

    #[test]
    fn more_speeches_never_rank_higher() {
        // Same declared urgency: the one who spoke more can never win the floor.
        for spoken in 1..6 {
            for seed in 0..10 {
                let mut rng = StdRng::seed_from_u64(seed);
                let ranked =
                    rank_speakers(vec![bid("Veteran", 4, spoken), bid("Fresh", 4, 0)], &mut rng);
                assert_eq!(ranked[0].player, "Fresh");
            }
        }
    }
}
