//! Observer log and end-of-game report files.
//!
//! Layout of one game directory:
//! `observer_log.txt` (every event, private ones included),
//! `<name>_final_context.txt` per player, and `game_summary.txt`.

use chrono::{Local, Utc};
use mafia_engine::models::{AuditKind, GameEvent, Role, Winner};
use mafia_engine::{view, EventSink, GameOutcome, GameReport};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

use crate::services::prompt::base_context;

pub struct ObserverLog {
    dir: PathBuf,
    file: Mutex<BufWriter<File>>,
}

/// Settings echoed into the summary file.
#[derive(Debug, Clone)]
pub struct ReportMeta {
    pub num_mafia: usize,
    pub max_discussion_rounds: usize,
    pub decision_source: String,
}

impl ObserverLog {
    /// Opens `<root>/game_<timestamp>/observer_log.txt`.
    pub fn create(root: &Path) -> io::Result<Self> {
        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let mut dir = root.join(format!("game_{}", stamp));
        let mut suffix = 1;
        while dir.exists() {
            suffix += 1;
            dir = root.join(format!("game_{}_{}", stamp, suffix));
        }
        fs::create_dir_all(&dir)?;

        let mut file = BufWriter::new(File::create(dir.join("observer_log.txt"))?);
        writeln!(file, "=== MAFIA GAME OBSERVER LOG ===")?;
        writeln!(file, "Game started at: {}\n", Utc::now().to_rfc3339())?;
        file.flush()?;

        Ok(Self {
            dir,
            file: Mutex::new(file),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write_reports(&self, report: &GameReport, meta: &ReportMeta) -> io::Result<()> {
        for player in &report.state.players {
            if let Some(player_view) = view(&report.state, &player.name) {
                let path = self
                    .dir
                    .join(format!("{}_final_context.txt", player.name.to_lowercase()));
                fs::write(path, base_context(&player_view))?;
            }
        }
        fs::write(self.dir.join("game_summary.txt"), summary(report, meta))
    }
}

impl EventSink for ObserverLog {
    fn emit(&self, event: &GameEvent) {
        let Ok(mut file) = self.file.lock() else {
            return;
        };
        let written = writeln!(file, "{}", describe(event)).and_then(|_| file.flush());
        if let Err(e) = written {
            warn!("failed to write observer log: {}", e);
        }
    }
}

/// One readable line per event.
pub fn describe(event: &GameEvent) -> String {
    match event {
        GameEvent::GameStarted { players } => format!("Players: {}", players.join(", ")),
        GameEvent::PhaseChanged { round, from, to } => {
            format!("[round {}] phase {} -> {}", round, from, to)
        }
        GameEvent::MafiaProposal {
            player,
            target,
            reason,
            ..
        } => format!("Mafia {} proposes {}: {}", player, target, reason),
        GameEvent::MafiaConsensus { target, .. } => format!("Mafia consensus: {}", target),
        GameEvent::DoctorProtect {
            player,
            target,
            reason,
            ..
        } => format!("Doctor {} protects {}: {}", player, target, reason),
        GameEvent::Investigation {
            player,
            target,
            role,
            reason,
            ..
        } => format!("Detective {} investigates {} ({}): {}", player, target, role, reason),
        GameEvent::NightSave { target, .. } => format!("{} was attacked and saved", target),
        GameEvent::NightResult { round, eliminated } => match eliminated {
            Some(name) => format!("Night {}: {} was eliminated", round, name),
            None => format!("Night {}: no one was eliminated", round),
        },
        GameEvent::DayStarted { round, alive } => {
            format!("=== DAY {} === alive: {}", round, alive.join(", "))
        }
        GameEvent::Silence { streak, .. } => format!("Silence ({} in a row)", streak),
        GameEvent::Utterance {
            speaker, message, ..
        } => format!("{}: {}", speaker, message),
        GameEvent::VoteCast {
            sub_round,
            stage,
            voter,
            target,
            reason,
            ..
        } => format!(
            "[vote {} {:?}] {} -> {}: {}",
            sub_round, stage, voter, target, reason
        ),
        GameEvent::TrialStarted { subject, votes, .. } => {
            format!("{} is on trial with {} votes", subject, votes)
        }
        GameEvent::VoteTied {
            stage,
            candidates,
            votes,
            ..
        } => format!(
            "{:?} vote tied between {} ({} votes each)",
            stage,
            candidates.join(", "),
            votes
        ),
        GameEvent::Defense { subject, text, .. } => match text {
            Some(text) => format!("Defense by {}: {}", subject, text),
            None => format!("{} gave no defense", subject),
        },
        GameEvent::PlayerEliminated { player, cause, .. } => {
            format!("{} eliminated ({:?})", player, cause)
        }
        GameEvent::VotingRecorded { record } => format!(
            "Voting record day {} round {}: {:?}",
            record.day, record.sub_round, record.outcome
        ),
        GameEvent::AgentFailed {
            player,
            kind,
            error,
            ..
        } => format!("{} failed {:?}: {}", player, kind, error),
        GameEvent::GameOver {
            round,
            winner,
            elimination_order,
            roles,
        } => {
            let roles: Vec<String> = roles
                .iter()
                .map(|(name, role)| format!("{} ({})", name, role))
                .collect();
            format!(
                "GAME OVER after {} rounds: {}\nElimination order: {}\nRoles: {}",
                round,
                headline(*winner),
                elimination_order.join(" -> "),
                roles.join(", ")
            )
        }
        GameEvent::RoundLimitReached { round } => {
            format!("Round limit reached at round {}, no winner", round)
        }
    }
}

fn headline(winner: Winner) -> &'static str {
    match winner {
        Winner::Mafia => "MAFIA WINS! The Mafia has eliminated enough villagers to take control!",
        Winner::Village => "VILLAGE WINS! All Mafia members have been eliminated!",
        Winner::Tie => "TIE GAME! Doctor vs Mafia in the final two.",
    }
}

pub fn summary(report: &GameReport, meta: &ReportMeta) -> String {
    let state = &report.state;
    let winner = match report.outcome {
        GameOutcome::Winner(w) => w.to_string().to_uppercase(),
        GameOutcome::RoundLimit => "NONE (round limit)".to_string(),
    };
    let names = |mafia: bool| -> Vec<&str> {
        state
            .players
            .iter()
            .filter(|p| p.role.is_mafia() == mafia)
            .map(|p| p.name.as_str())
            .collect()
    };
    let eliminated_with = |mafia: bool| -> Vec<&str> {
        state
            .eliminated
            .iter()
            .filter(|n| state.player(n).map(|p| p.role.is_mafia()) == Some(mafia))
            .map(String::as_str)
            .collect()
    };
    let list = |names: &[&str]| {
        if names.is_empty() {
            "None".to_string()
        } else {
            names.join(", ")
        }
    };
    let survived = |role: Role| state.alive().any(|p| p.role == role);

    let mut out = String::from("=== MAFIA GAME SUMMARY ===\n\n");
    out.push_str("Game Configuration:\n");
    out.push_str(&format!("- Total Players: {}\n", state.players.len()));
    out.push_str(&format!("- Mafia Count: {}\n", meta.num_mafia));
    out.push_str(&format!(
        "- Max Discussion Rounds: {}\n",
        meta.max_discussion_rounds
    ));
    out.push_str(&format!("- Decisions: {}\n\n", meta.decision_source));

    out.push_str("Game Outcome:\n");
    out.push_str(&format!("- Winner: {}\n", winner));
    out.push_str(&format!("- Total Rounds: {}\n", report.rounds));
    out.push_str(&format!(
        "- Elimination Order: {}\n\n",
        state.eliminated.join(" -> ")
    ));

    let mafia = names(true);
    let village = names(false);
    out.push_str("Team Composition:\n");
    out.push_str(&format!("Mafia Team ({}): {}\n", mafia.len(), mafia.join(", ")));
    out.push_str(&format!(
        "Village Team ({}): {}\n\n",
        village.len(),
        village.join(", ")
    ));

    out.push_str("Final Status:\n");
    for p in &state.players {
        let status = if p.is_alive { "ALIVE" } else { "ELIMINATED" };
        out.push_str(&format!("- {} ({}): {}\n", p.name, p.role, status));
    }

    let lost_mafia = eliminated_with(true);
    let lost_village = eliminated_with(false);
    out.push_str("\n=== GAME ANALYSIS ===\n");
    out.push_str(&format!(
        "- Mafia eliminated: {} ({})\n",
        lost_mafia.len(),
        list(&lost_mafia)
    ));
    out.push_str(&format!(
        "- Village eliminated: {} ({})\n",
        lost_village.len(),
        list(&lost_village)
    ));
    out.push_str(&format!("- Detective survived: {}\n", survived(Role::Detective)));
    out.push_str(&format!("- Doctor survived: {}\n", survived(Role::Doctor)));
    out.push_str(&format!(
        "- Detective investigations: {}\n",
        state.detective_results.len()
    ));

    out.push_str("\n=== PERSONALITY IMPACT ===\n");
    for p in &state.players {
        let short: String = p.personality.chars().take(50).collect();
        let fate = state
            .audit_log
            .iter()
            .find(|e| {
                e.kind == AuditKind::Elimination && e.message.starts_with(&format!("{} ", p.name))
            })
            .map(|e| format!("Eliminated round {}", e.round))
            .unwrap_or_else(|| "Survived".to_string());
        out.push_str(&format!("- {}: {}... ({})\n", p.name, short, fate));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use mafia_engine::models::{GameState, Player};

    fn finished() -> GameReport {
        let state = GameState::new(vec![
            Player::new("Boris", Role::Mafia, "Blunt and direct."),
            Player::new("Elena", Role::Detective, "Logical."),
            Player::new("Sam", Role::Villager, "Quiet."),
        ])
        .unwrap();
        GameReport {
            outcome: GameOutcome::Winner(Winner::Village),
            rounds: 2,
            state,
        }
    }

    #[test]
    fn summary_lists_teams_and_outcome() {
        let meta = ReportMeta {
            num_mafia: 1,
            max_discussion_rounds: 2,
            decision_source: "offline".into(),
        };
        let text = summary(&finished(), &meta);
        assert!(text.contains("- Winner: VILLAGE"));
        assert!(text.contains("Mafia Team (1): Boris"));
        assert!(text.contains("- Sam (villager): ALIVE"));
        assert!(text.contains("- Mafia eliminated: 0 (None)"));
    }

    #[test]
    fn private_events_are_described() {
        let line = describe(&GameEvent::NightSave {
            round: 1,
            target: "Sam".into(),
        });
        assert_eq!(line, "Sam was attacked and saved");
    }

    #[test]
    fn writes_log_and_reports() {
        let root = std::env::temp_dir().join(format!("mafia-observer-{}", uuid::Uuid::new_v4()));
        let log = ObserverLog::create(&root).unwrap();
        log.emit(&GameEvent::NightResult {
            round: 1,
            eliminated: None,
        });
        let meta = ReportMeta {
            num_mafia: 1,
            max_discussion_rounds: 2,
            decision_source: "offline".into(),
        };
        log.write_reports(&finished(), &meta).unwrap();

        let observer = fs::read_to_string(log.dir().join("observer_log.txt")).unwrap();
        assert!(observer.contains("Night 1: no one was eliminated"));
        assert!(log.dir().join("boris_final_context.txt").exists());
        assert!(log.dir().join("game_summary.txt").exists());
        fs::remove_dir_all(root).ok();
    }
}
