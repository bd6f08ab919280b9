use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use mafia_engine::models::{
    AuditKind, DecisionRequest, DefenseDecision, DiscussionDecision, GameEvent, GameState,
    NightDecision, Player, Role, VoteDecision, VotingOutcome, Winner,
};
use mafia_engine::services::judge;
use mafia_engine::setup::{assign_roles, default_roster};
use mafia_engine::{
    view, AgentError, DecisionMaker, GameConfig, GameError, GameOutcome, GameReport, MemorySink,
    Orchestrator, ScriptedAgent,
};

fn test_config() -> GameConfig {
    GameConfig {
        seed: Some(1),
        decision_timeout: Duration::from_secs(1),
        ..GameConfig::default()
    }
}

fn roster(players: &[(&str, Role)]) -> GameState {
    GameState::new(
        players
            .iter()
            .map(|(name, role)| Player::new(*name, *role, "test personality"))
            .collect(),
    )
    .unwrap()
}

fn seat(agents: Vec<(&str, ScriptedAgent)>) -> Vec<(String, Arc<dyn DecisionMaker>)> {
    agents
        .into_iter()
        .map(|(name, agent)| (name.to_string(), Arc::new(agent) as Arc<dyn DecisionMaker>))
        .collect()
}

fn five_player_table() -> GameState {
    roster(&[
        ("Ann", Role::Mafia),
        ("Ben", Role::Doctor),
        ("Cat", Role::Detective),
        ("Dan", Role::Villager),
        ("Eve", Role::Villager),
    ])
}

async fn play(
    state: GameState,
    agents: Vec<(String, Arc<dyn DecisionMaker>)>,
    config: GameConfig,
) -> (GameReport, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let orchestrator = Orchestrator::new(state, agents, config, sink.clone()).unwrap();
    let report = orchestrator.run().await.unwrap();
    (report, sink)
}

#[tokio::test]
async fn test_save_cancels_kill() {
    let agents = seat(vec![
        ("Ann", ScriptedAgent::new().night(Ok(NightDecision::target("Ben", "the doctor")))),
        ("Ben", ScriptedAgent::new().night(Ok(NightDecision::target("Ben", "self")))),
        ("Cat", ScriptedAgent::new()),
        ("Dan", ScriptedAgent::new()),
        ("Eve", ScriptedAgent::new()),
    ]);
    let (report, sink) = play(five_player_table(), agents, test_config()).await;

    let events = sink.events();
    assert!(events.contains(&GameEvent::NightResult {
        round: 1,
        eliminated: None
    }));
    assert!(events.contains(&GameEvent::NightSave {
        round: 1,
        target: "Ben".to_string()
    }));
    assert!(report
        .state
        .audit_log
        .iter()
        .any(|e| e.kind == AuditKind::NightSave && e.message.contains("Ben")));

    // The save stays internal.
    assert!(sink
        .public_events()
        .iter()
        .all(|e| !matches!(e, GameEvent::NightSave { .. })));

    // Day one: everyone but Ann votes for the first other name, which is Ann.
    assert_eq!(report.state.eliminated, vec!["Ann"]);
    assert_eq!(report.outcome, GameOutcome::Winner(Winner::Village));
}

#[tokio::test]
async fn test_plain_kill() {
    let agents = seat(vec![
        ("Ann", ScriptedAgent::new().night(Ok(NightDecision::target("Cat", "too sharp")))),
        ("Ben", ScriptedAgent::new().night(Ok(NightDecision::target("Ben", "self")))),
        ("Cat", ScriptedAgent::new()),
        ("Dan", ScriptedAgent::new()),
        ("Eve", ScriptedAgent::new()),
    ]);
    let (report, sink) = play(five_player_table(), agents, test_config()).await;

    assert!(sink.public_events().contains(&GameEvent::NightResult {
        round: 1,
        eliminated: Some("Cat".to_string())
    }));
    assert_eq!(report.state.eliminated, vec!["Cat", "Ann"]);
    assert_eq!(report.winner(), Some(Winner::Village));
}

#[tokio::test]
async fn test_investigation_stays_private() {
    let agents = seat(vec![
        ("Ann", ScriptedAgent::new().night(Ok(NightDecision::pass("waiting")))),
        ("Ben", ScriptedAgent::new()),
        ("Cat", ScriptedAgent::new().night(Ok(NightDecision::target("ann", "hunch")))),
        ("Dan", ScriptedAgent::new()),
        ("Eve", ScriptedAgent::new()),
    ]);
    let (report, sink) = play(five_player_table(), agents, test_config()).await;

    assert_eq!(report.state.detective_results.len(), 1);
    assert_eq!(report.state.detective_results[0].target, "Ann");
    assert_eq!(report.state.detective_results[0].role, Role::Mafia);

    let detective = view(&report.state, "Cat").unwrap();
    assert_eq!(detective.findings.len(), 1);
    assert_eq!(detective.own_actions[0].finding, Some(Role::Mafia));
    let villager = view(&report.state, "Dan").unwrap();
    assert!(villager.findings.is_empty());
    assert!(villager.teammates.is_empty());

    assert!(sink
        .public_events()
        .iter()
        .all(|e| !matches!(e, GameEvent::Investigation { .. })));
}

#[tokio::test]
async fn test_three_round_tie() {
    let table = roster(&[
        ("Ann", Role::Mafia),
        ("Ben", Role::Doctor),
        ("Cat", Role::Detective),
        ("Dan", Role::Villager),
    ]);
    let tie = |target: &str| {
        let mut agent = ScriptedAgent::new();
        for _ in 0..3 {
            agent = agent.votes_for(target);
        }
        agent
    };
    let agents = seat(vec![
        ("Ann", tie("Ben").night(Ok(NightDecision::pass("lying low")))),
        ("Ben", tie("Ann")),
        ("Cat", tie("Ben")),
        ("Dan", tie("Ann")),
    ]);
    let config = GameConfig {
        max_rounds: 1,
        ..test_config()
    };
    let (report, sink) = play(table, agents, config).await;

    assert_eq!(report.outcome, GameOutcome::RoundLimit);
    assert!(report.state.eliminated.is_empty());
    assert_eq!(report.state.voting_history.len(), 3);
    for (i, record) in report.state.voting_history.iter().enumerate() {
        assert_eq!(record.sub_round as usize, i + 1);
        assert_eq!(record.outcome, VotingOutcome::InitialTie);
        assert_eq!(record.tied, vec!["Ann", "Ben"]);
        assert_eq!(record.top_votes, 2);
        assert!(record.trial.is_none());
    }
    assert!(sink
        .events()
        .iter()
        .any(|e| matches!(e, GameEvent::RoundLimitReached { round: 2 })));
}

#[tokio::test]
async fn test_final_vote_tie_ends_the_day() {
    let table = roster(&[
        ("Ann", Role::Mafia),
        ("Ben", Role::Doctor),
        ("Cat", Role::Detective),
        ("Dan", Role::Villager),
    ]);
    let agents = seat(vec![
        (
            "Ann",
            ScriptedAgent::new()
                .night(Ok(NightDecision::pass("lying low")))
                .votes_for("Ben")
                .votes_for("Ben"),
        ),
        ("Ben", ScriptedAgent::new().votes_for("Dan").votes_for("Ann")),
        ("Cat", ScriptedAgent::new().votes_for("Ben").votes_for("Ann")),
        (
            "Dan",
            ScriptedAgent::new().votes_for("Cat").votes_for("Ben"),
        ),
    ]);
    let config = GameConfig {
        max_rounds: 1,
        ..test_config()
    };
    let (report, _) = play(table, agents, config).await;

    assert_eq!(report.state.voting_history.len(), 1);
    let record = &report.state.voting_history[0];
    assert_eq!(record.trial.as_deref(), Some("Ben"));
    assert_eq!(record.defense.as_deref(), Some("I am innocent."));
    assert_eq!(record.final_votes.len(), 4);
    assert_eq!(
        record.outcome,
        VotingOutcome::FinalTie(vec!["Ann".to_string(), "Ben".to_string()])
    );
    assert!(report.state.eliminated.is_empty());
}

#[tokio::test]
async fn test_self_vote_is_substituted() {
    let agents = seat(vec![
        ("Ann", ScriptedAgent::new().night(Ok(NightDecision::pass("")))),
        ("Ben", ScriptedAgent::new()),
        ("Cat", ScriptedAgent::new()),
        ("Dan", ScriptedAgent::new().votes_for("Dan")),
        ("Eve", ScriptedAgent::new()),
    ]);
    let (report, sink) = play(five_player_table(), agents, test_config()).await;

    let first = &report.state.voting_history[0];
    let dan = first.votes.iter().find(|v| v.voter == "Dan").unwrap();
    assert_eq!(dan.target, "Ann");
    assert_eq!(dan.reason, "Cannot vote for self, voting Ann instead");

    for event in sink.events() {
        if let GameEvent::VoteCast { voter, target, .. } = event {
            assert_ne!(voter, target);
        }
    }
}

#[tokio::test]
async fn test_agent_failure_is_an_abstention() {
    let agents = seat(vec![
        (
            "Ann",
            ScriptedAgent::new().night(Err(AgentError::Request("connection reset".to_string()))),
        ),
        ("Ben", ScriptedAgent::new()),
        ("Cat", ScriptedAgent::new()),
        (
            "Dan",
            ScriptedAgent::new().vote(Err(AgentError::Malformed("no target".to_string()))),
        ),
        ("Eve", ScriptedAgent::new()),
    ]);
    let (report, sink) = play(five_player_table(), agents, test_config()).await;

    let failures: Vec<GameEvent> = sink
        .events()
        .into_iter()
        .filter(|e| matches!(e, GameEvent::AgentFailed { .. }))
        .collect();
    assert_eq!(failures.len(), 2);

    // Nobody died at night, and Dan's ballot is missing from the first vote.
    assert!(sink.events().contains(&GameEvent::NightResult {
        round: 1,
        eliminated: None
    }));
    assert_eq!(report.state.voting_history[0].votes.len(), 4);
    assert_eq!(report.winner(), Some(Winner::Village));
}

struct StalledAgent;

#[async_trait]
impl DecisionMaker for StalledAgent {
    async fn night_action(
        &self,
        _request: &DecisionRequest,
    ) -> Result<NightDecision, AgentError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(NightDecision::pass("late"))
    }

    async fn discuss(
        &self,
        _request: &DecisionRequest,
    ) -> Result<DiscussionDecision, AgentError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(DiscussionDecision::silent())
    }

    async fn vote(
        &self,
        _request: &DecisionRequest,
    ) -> Result<VoteDecision, AgentError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(VoteDecision::new("nobody", "late"))
    }

    async fn defend(
        &self,
        _request: &DecisionRequest,
    ) -> Result<DefenseDecision, AgentError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(DefenseDecision {
            text: "late".to_string(),
        })
    }
}

#[tokio::test]
async fn test_stalled_agent_does_not_stall_the_game() {
    let mut agents = seat(vec![
        ("Ann", ScriptedAgent::new()),
        ("Cat", ScriptedAgent::new()),
        ("Dan", ScriptedAgent::new()),
        ("Eve", ScriptedAgent::new()),
    ]);
    agents.push(("Ben".to_string(), Arc::new(StalledAgent)));
    let config = GameConfig {
        decision_timeout: Duration::from_millis(20),
        ..test_config()
    };
    let (report, sink) = play(five_player_table(), agents, config).await;

    assert!(sink.events().iter().any(|e| matches!(
        e,
        GameEvent::AgentFailed { player, .. } if player == "Ben"
    )));
    assert!(report.state.doctor_save.is_none());
    assert!(report.winner().is_some());
}

#[tokio::test]
async fn test_one_on_one_with_doctor_is_a_tie() {
    let table = roster(&[
        ("Ann", Role::Mafia),
        ("Ben", Role::Doctor),
        ("Cat", Role::Villager),
    ]);
    let agents = seat(vec![
        ("Ann", ScriptedAgent::new().night(Ok(NightDecision::target("Cat", "")))),
        ("Ben", ScriptedAgent::new().night(Ok(NightDecision::target("Ben", "")))),
        ("Cat", ScriptedAgent::new()),
    ]);
    let (report, sink) = play(table, agents, test_config()).await;

    assert_eq!(report.outcome, GameOutcome::Winner(Winner::Tie));
    assert_eq!(report.rounds, 1);
    assert!(sink.events().iter().any(|e| matches!(
        e,
        GameEvent::GameOver {
            winner: Winner::Tie,
            ..
        }
    )));
    // The game ended straight after the night.
    assert!(report.state.voting_history.is_empty());
}

#[tokio::test]
async fn test_two_on_two_without_doctor_goes_to_mafia() {
    let table = roster(&[
        ("Ann", Role::Mafia),
        ("Bob", Role::Mafia),
        ("Cat", Role::Detective),
        ("Dan", Role::Villager),
        ("Eve", Role::Villager),
    ]);
    let agents = seat(vec![
        ("Ann", ScriptedAgent::new().night(Ok(NightDecision::target("Eve", "")))),
        ("Bob", ScriptedAgent::new().night(Ok(NightDecision::target("Eve", "")))),
        ("Cat", ScriptedAgent::new()),
        ("Dan", ScriptedAgent::new()),
        ("Eve", ScriptedAgent::new()),
    ]);
    let (report, _) = play(table, agents, test_config()).await;

    assert_eq!(report.state.eliminated, vec!["Eve"]);
    assert_eq!(report.winner(), Some(Winner::Mafia));
}

#[tokio::test]
async fn test_split_mafia_uses_first_proposal() {
    let table = roster(&[
        ("Ann", Role::Mafia),
        ("Bob", Role::Mafia),
        ("Cat", Role::Doctor),
        ("Dan", Role::Villager),
        ("Eve", Role::Villager),
        ("Fay", Role::Villager),
        ("Gus", Role::Detective),
    ]);
    for _ in 0..5 {
        let agents = seat(vec![
            ("Ann", ScriptedAgent::new().night(Ok(NightDecision::target("Fay", "")))),
            ("Bob", ScriptedAgent::new().night(Ok(NightDecision::target("Dan", "")))),
            ("Cat", ScriptedAgent::new().night(Ok(NightDecision::target("Cat", "")))),
            ("Dan", ScriptedAgent::new()),
            ("Eve", ScriptedAgent::new()),
            ("Fay", ScriptedAgent::new()),
            ("Gus", ScriptedAgent::new()),
        ]);
        let (report, sink) = play(table.clone(), agents, test_config()).await;
        assert!(sink.events().contains(&GameEvent::MafiaConsensus {
            round: 1,
            target: "Fay".to_string()
        }));
        assert_eq!(report.state.eliminated[0], "Fay");
    }
}

#[tokio::test]
async fn test_discussion_shares_the_floor() {
    let table = roster(&[
        ("Ann", Role::Mafia),
        ("Ben", Role::Doctor),
        ("Cat", Role::Detective),
        ("Dan", Role::Villager),
    ]);
    let chatty = |name: &str| {
        let mut agent = ScriptedAgent::new();
        for _ in 0..8 {
            agent = agent.discussion(Ok(DiscussionDecision::speak(format!("{} here", name), 5)));
        }
        agent
    };
    let agents = seat(vec![
        ("Ann", chatty("Ann").night(Ok(NightDecision::pass("")))),
        ("Ben", chatty("Ben")),
        ("Cat", chatty("Cat")),
        ("Dan", chatty("Dan")),
    ]);
    let (report, _) = play(table, agents, test_config()).await;

    let day_one: Vec<&str> = report
        .state
        .transcript
        .iter()
        .filter(|u| u.round == 1)
        .map(|u| u.speaker.as_str())
        .collect();
    assert_eq!(day_one.len(), 8);
    for name in ["Ann", "Ben", "Cat", "Dan"] {
        assert_eq!(day_one.iter().filter(|s| **s == name).count(), 2);
    }
    // Nobody speaks twice before everyone has spoken once.
    let mut first_four = day_one[..4].to_vec();
    first_four.sort();
    assert_eq!(first_four, vec!["Ann", "Ben", "Cat", "Dan"]);
}

#[tokio::test]
async fn test_missing_agent_is_rejected() {
    let agents = seat(vec![("Ann", ScriptedAgent::new())]);
    let result = Orchestrator::new(
        five_player_table(),
        agents,
        test_config(),
        Arc::new(MemorySink::new()),
    );
    assert!(matches!(result, Err(GameError::MissingAgent(_))));
}

#[tokio::test]
async fn test_random_games_keep_invariants() {
    for seed in 0..20u64 {
        let mut rng = <rand::rngs::StdRng as rand::SeedableRng>::seed_from_u64(seed);
        let state = assign_roles(&default_roster(), 2, &mut rng).unwrap();
        let agents: Vec<(String, Arc<dyn DecisionMaker>)> = state
            .players
            .iter()
            .enumerate()
            .map(|(i, p)| {
                (
                    p.name.clone(),
                    Arc::new(ScriptedAgent::random(seed * 100 + i as u64))
                        as Arc<dyn DecisionMaker>,
                )
            })
            .collect();
        let config = GameConfig {
            seed: Some(seed),
            ..test_config()
        };
        let (report, sink) = play(state, agents, config).await;

        report.state.check_invariants().unwrap();
        assert_eq!(
            report.state.alive_players.len() + report.state.eliminated.len(),
            8
        );
        assert_eq!(report.winner(), report.state.winner());
        if report.outcome != GameOutcome::RoundLimit {
            assert_eq!(judge(&report.state).unwrap(), report.winner());
        }
        for event in sink.events() {
            if let GameEvent::VoteCast { voter, target, .. } = event {
                assert_ne!(voter, target);
            }
        }
        let over = sink
            .events()
            .iter()
            .filter(|e| matches!(e, GameEvent::GameOver { .. }))
            .count();
        assert!(over <= 1);
    }
}
