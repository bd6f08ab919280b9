use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the mafia settle a tied night vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusTieBreak {
    /// The tied target proposed earliest in roster order.
    #[default]
    FirstProposed,
    /// The tied target whose name sorts first.
    Lexicographic,
}

impl std::str::FromStr for ConsensusTieBreak {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first_proposed" | "first" => Ok(Self::FirstProposed),
            "lexicographic" | "lex" => Ok(Self::Lexicographic),
            other => Err(format!("unknown tie-break policy: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Discussion budget is this many speaking rounds per alive player.
    pub max_discussion_rounds: usize,
    pub num_mafia: usize,
    pub max_voting_rounds: u8,
    pub silent_round_limit: u8,
    pub max_concurrency: usize,
    #[serde(with = "secs")]
    pub decision_timeout: Duration,
    #[serde(with = "millis")]
    pub speaker_pause: Duration,
    pub tie_break: ConsensusTieBreak,
    pub seed: Option<u64>,
    pub max_rounds: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_discussion_rounds: 2,
            num_mafia: 2,
            max_voting_rounds: 3,
            silent_round_limit: 3,
            max_concurrency: 3,
            decision_timeout: Duration::from_secs(60),
            speaker_pause: Duration::ZERO,
            tie_break: ConsensusTieBreak::FirstProposed,
            seed: None,
            max_rounds: 30,
        }
    }
}

mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: GameConfig =
            serde_json::from_str(r#"{"num_mafia": 3, "tie_break": "lexicographic"}"#).unwrap();
        assert_eq!(config.num_mafia, 3);
        assert_eq!(config.tie_break, ConsensusTieBreak::Lexicographic);
        assert_eq!(config.max_voting_rounds, 3);
        assert_eq!(config.decision_timeout, Duration::from_secs(60));
    }

    #[test]
    fn parses_tie_break_names() {
        assert_eq!(
            "first".parse::<ConsensusTieBreak>().unwrap(),
            ConsensusTieBreak::FirstProposed
        );
        assert!("coin_flip".parse::<ConsensusTieBreak>().is_err());
    }
}
