//! Prompt rendering from a participant's view of the game.

use mafia_engine::models::{
    DecisionKind, DecisionRequest, NightActionKind, Role, VoteCast, VotingOutcome, VotingRecord,
};
use mafia_engine::PlayerView;
use std::collections::BTreeMap;
use std::fmt::Write;

use crate::services::structured::{
    format_instructions, DISCUSSION_SCHEMA, NIGHT_SCHEMA, VOTE_SCHEMA,
};

const RULES: &str = "GAME RULES:
- The game alternates between Night and Day phases
- During Night: Mafia kills, Doctor saves someone, Detective investigates
- During Day: Discussion, then voting to eliminate someone
- Village wins if all Mafia are eliminated
- Mafia wins if they equal or outnumber the Village
- When players are eliminated, their roles are NOT revealed to others";

const ACCUSATION_WINDOW: usize = 5;

/// Urgency hint for discussion prompts: 5 when recently accused, otherwise
/// the role's base urgency.
pub fn suggested_urgency(view: &PlayerView) -> u8 {
    if view.recently_accused(ACCUSATION_WINDOW) {
        5
    } else {
        view.role.profile().base_urgency
    }
}

/// Everything the participant knows, shared by every prompt.
pub fn base_context(view: &PlayerView) -> String {
    let eliminated = if view.eliminated.is_empty() {
        "none".to_string()
    } else {
        view.eliminated.join(", ")
    };
    format!(
        "You are {name}, playing a game of Mafia.\n\n\
PERSONALITY: {personality}\n\n\
{rules}\n\n\
YOUR ROLE: {role}\n{guidelines}\n\n\
CURRENT GAME STATE:\n\
- Phase: {phase}\n\
- Round: {round}\n\
- Players alive: {alive}\n\
- Players eliminated: {eliminated} (roles unknown)\n\n\
{knowledge}\n{history}",
        name = view.name,
        personality = view.personality,
        rules = RULES,
        role = view.role.as_str().to_uppercase(),
        guidelines = view.role.profile().guidelines,
        phase = view.phase,
        round = view.round,
        alive = view.alive.join(", "),
        eliminated = eliminated,
        knowledge = role_knowledge(view),
        history = game_history(view),
    )
}

fn role_knowledge(view: &PlayerView) -> String {
    let mut out = String::new();
    match view.role {
        Role::Mafia => {
            let _ = writeln!(out, "MAFIA TEAM: {}", view.teammates.join(", "));
            out.push_str("YOUR PROPOSALS AND TEAM DECISIONS:\n");
            own_actions(
                &mut out,
                view,
                NightActionKind::MafiaPropose,
                "You proposed",
                "No proposals made yet",
            );
        }
        Role::Detective => {
            out.push_str("YOUR INVESTIGATION RESULTS:\n");
            if view.findings.is_empty() {
                out.push_str("- No investigations completed yet\n");
            }
            for finding in &view.findings {
                let _ = writeln!(
                    out,
                    "- {}: {} (round {})",
                    finding.target, finding.role, finding.round
                );
            }
        }
        Role::Doctor => {
            out.push_str("YOUR SAVE HISTORY:\n");
            own_actions(
                &mut out,
                view,
                NightActionKind::DoctorSave,
                "Saved",
                "No saves attempted yet",
            );
        }
        Role::Villager => {}
    }
    out
}

fn own_actions(
    out: &mut String,
    view: &PlayerView,
    kind: NightActionKind,
    verb: &str,
    empty: &str,
) {
    let mut any = false;
    for action in view.own_actions.iter().filter(|a| a.kind == kind) {
        any = true;
        let _ = writeln!(
            out,
            "- Round {}: {} {} ({})",
            action.round, verb, action.target, action.reason
        );
    }
    if !any {
        let _ = writeln!(out, "- {}", empty);
    }
}

fn game_history(view: &PlayerView) -> String {
    let mut out = String::new();

    if !view.transcript.is_empty() {
        out.push_str("DISCUSSION HISTORY:\n");
        let mut by_day: BTreeMap<u32, Vec<_>> = BTreeMap::new();
        for utterance in &view.transcript {
            by_day.entry(utterance.round).or_default().push(utterance);
        }
        let headed = by_day.len() > 1;
        for (day, utterances) in by_day {
            if headed {
                let _ = writeln!(out, "\n=== Day {} Discussion ===", day);
            }
            for u in utterances {
                let _ = writeln!(out, "- {}: {}", u.speaker, u.message);
            }
        }
        out.push('\n');
    }

    if !view.voting_history.is_empty() {
        out.push_str("VOTING HISTORY:\n");
        for record in &view.voting_history {
            voting_record(&mut out, record);
        }
    }

    if out.is_empty() {
        out.push_str("No game history yet.\n");
    }
    out
}

fn ballots(out: &mut String, votes: &[VoteCast]) {
    for vote in votes {
        let _ = writeln!(out, "- {} votes for {}: {}", vote.voter, vote.target, vote.reason);
    }
}

pub fn voting_record(out: &mut String, record: &VotingRecord) {
    if record.sub_round > 1 {
        let _ = writeln!(out, "=== Day {} Voting (Round {}) ===", record.day, record.sub_round);
    } else {
        let _ = writeln!(out, "=== Day {} Voting ===", record.day);
    }
    if !record.votes.is_empty() {
        out.push_str("Initial votes:\n");
        ballots(out, &record.votes);
    }
    if let Some(subject) = &record.trial {
        let _ = writeln!(out, "Trial: {} (most votes)", subject);
        if let Some(defense) = &record.defense {
            let _ = writeln!(out, "Defense by {}: {}", subject, defense);
        }
    } else if !record.tied.is_empty() {
        let _ = writeln!(
            out,
            "Tie between: {} ({} votes each)",
            record.tied.join(", "),
            record.top_votes
        );
    }
    if !record.final_votes.is_empty() {
        out.push_str("Final votes after defense:\n");
        ballots(out, &record.final_votes);
    }
    let eliminated = match &record.outcome {
        VotingOutcome::Eliminated(name) => name.as_str(),
        _ => "No one",
    };
    let _ = writeln!(out, "Eliminated: {}\n", eliminated);
}

/// Full prompt for one decision request.
pub fn render(request: &DecisionRequest) -> String {
    let view = &request.view;
    let profile = view.role.profile();
    let candidates = request.candidates.join(", ");
    let context = base_context(view);

    let task = match request.kind {
        DecisionKind::NightAction(kind) => {
            let (title, considerations) = match kind {
                NightActionKind::MafiaPropose => (
                    "MAFIA ELIMINATION DECISION",
                    "You must choose someone to eliminate tonight. Consider:\n\
- Who poses the biggest threat to the Mafia?\n\
- Who might be the Doctor or Detective?\n\
- What would be the most strategic elimination?",
                ),
                NightActionKind::DoctorSave => (
                    "DOCTOR SAVE DECISION",
                    "You must choose someone to save tonight. Consider:\n\
- Who is most likely to be targeted by Mafia?\n\
- Who is most valuable to keep alive?\n\
- You can save yourself if you have no better clue",
                ),
                NightActionKind::DetectiveInvestigate => (
                    "DETECTIVE INVESTIGATION DECISION",
                    "You must choose someone to investigate tonight. Consider:\n\
- Whose behavior has been the most suspicious?\n\
- Who would be most useful to confirm or clear?",
                ),
            };
            let fields: Vec<&str> = NIGHT_SCHEMA.iter().map(|(name, _)| *name).collect();
            format!(
                "NIGHT PHASE - {}\n\n{}\n\nAvailable targets: {}\n\n\
Respond with JSON format:\n{{\n    \"{}\": \"player_name\",\n    \"{}\": \"brief explanation for your choice\"\n}}",
                title, considerations, candidates, fields[0], fields[1]
            )
        }
        DecisionKind::Discussion => {
            let accused = view.recently_accused(ACCUSATION_WINDOW);
            format!(
                "DAY DISCUSSION PHASE\n\n{}\n{}\n\
Do you want to speak in this round? If yes, what will you say? Be strategic but natural.\n\
Keep your response under 100 words.\n\
Urgency (1-5): {} - higher if you need to defend yourself or respond to someone\n\n{}",
                profile.discussion_framing,
                if accused {
                    "- IMPORTANT: You are being accused/suspected! Defend yourself!\n"
                } else {
                    ""
                },
                suggested_urgency(view),
                format_instructions(DISCUSSION_SCHEMA)
            )
        }
        DecisionKind::Vote | DecisionKind::FinalVote => {
            let trial = match &request.trial {
                Some(note) => format!(
                    "{} is on trial.\nTheir defense: {}\n\n",
                    note.subject,
                    note.defense.as_deref().unwrap_or("(no defense was given)")
                ),
                None => String::new(),
            };
            format!(
                "{}\n\n{}You must vote to eliminate ONE of these candidates: {}\n\
NOTE: You cannot vote for yourself - only choose from the candidates listed above.\n\n\
{}\nChoose your target and provide a clear reason for your vote.\n\n{}",
                if request.kind == DecisionKind::FinalVote {
                    "FINAL VOTING PHASE"
                } else {
                    "VOTING PHASE"
                },
                trial,
                candidates,
                profile.voting_framing,
                format_instructions(VOTE_SCHEMA)
            )
        }
        DecisionKind::Defense => "DEFENSE PHASE\n\n\
You are being voted for elimination! Make a defense to convince others of your innocence.\n\
Be convincing but not too desperate. Use your personality and any evidence that supports you.\n\n\
Respond with your defense (under 150 words)."
            .to_string(),
    };

    format!("{}\n{}", context, task)
}
