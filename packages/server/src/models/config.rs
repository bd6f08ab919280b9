use mafia_engine::{ConsensusTieBreak, GameConfig};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-001";

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Root directory for observer logs and end-of-game reports.
    pub log_dir: PathBuf,
    pub observer_log: bool,
    pub llm: LlmSettings,
    pub game: GameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            log_dir: PathBuf::from("game_logs"),
            observer_log: true,
            llm: LlmSettings {
                api_key: None,
                base_url: DEFAULT_BASE_URL.to_string(),
                model: DEFAULT_MODEL.to_string(),
                temperature: 0.7,
            },
            game: GameConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind_addr = env::var("MAFIA_BIND_ADDR")
            .ok()
            .and_then(|v| v.parse::<SocketAddr>().ok())
            .unwrap_or(defaults.bind_addr);
        let log_dir = env::var("MAFIA_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.log_dir);
        let observer_log = env::var("MAFIA_OBSERVER_LOG")
            .map(|v| v != "false")
            .unwrap_or(defaults.observer_log);

        let llm = LlmSettings {
            api_key: env::var("LLM_API_KEY").ok().filter(|v| !v.trim().is_empty()),
            base_url: env::var("LLM_BASE_URL").unwrap_or(defaults.llm.base_url),
            model: env::var("LLM_MODEL").unwrap_or(defaults.llm.model),
            temperature: env::var("LLM_TEMPERATURE")
                .ok()
                .and_then(|v| v.parse::<f32>().ok())
                .unwrap_or(defaults.llm.temperature),
        };

        let mut game = defaults.game;
        if let Some(num_mafia) = parsed("MAFIA_NUM_MAFIA") {
            game.num_mafia = num_mafia;
        }
        if let Some(rounds) = parsed("MAFIA_DISCUSSION_ROUNDS") {
            game.max_discussion_rounds = rounds;
        }
        if let Some(concurrency) = parsed("MAFIA_MAX_CONCURRENCY") {
            game.max_concurrency = concurrency;
        }
        if let Some(secs) = parsed::<u64>("MAFIA_DECISION_TIMEOUT_SECS") {
            game.decision_timeout = Duration::from_secs(secs.max(1));
        }
        game.seed = parsed("MAFIA_SEED");
        if let Some(tie_break) = parsed::<ConsensusTieBreak>("MAFIA_TIE_BREAK") {
            game.tie_break = tie_break;
        }

        Self {
            bind_addr,
            log_dir,
            observer_log,
            llm,
            game,
        }
    }
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn reads_game_settings_from_env() {
        env::set_var("MAFIA_NUM_MAFIA", "3");
        env::set_var("MAFIA_TIE_BREAK", "lexicographic");
        env::set_var("MAFIA_DECISION_TIMEOUT_SECS", "5");
        env::set_var("MAFIA_BIND_ADDR", "0.0.0.0:9000");

        let config = ServerConfig::from_env();
        assert_eq!(config.game.num_mafia, 3);
        assert_eq!(config.game.tie_break, ConsensusTieBreak::Lexicographic);
        assert_eq!(config.game.decision_timeout, Duration::from_secs(5));
        assert_eq!(config.bind_addr.port(), 9000);

        for key in [
            "MAFIA_NUM_MAFIA",
            "MAFIA_TIE_BREAK",
            "MAFIA_DECISION_TIMEOUT_SECS",
            "MAFIA_BIND_ADDR",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn garbage_values_fall_back_to_defaults() {
        env::set_var("MAFIA_MAX_CONCURRENCY", "lots");
        let config = ServerConfig::from_env();
        assert_eq!(config.game.max_concurrency, 3);
        env::remove_var("MAFIA_MAX_CONCURRENCY");
    }
}
