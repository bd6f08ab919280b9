use dotenvy::dotenv;
use std::sync::Once;

static INIT: Once = Once::new();

pub fn setup_test_env() {
    INIT.call_once(|| {
        dotenv().ok();
        // Tests never talk to a real model or write into the working tree.
        std::env::remove_var("LLM_API_KEY");
        if std::env::var("MAFIA_LOG_DIR").is_err() {
            let dir = std::env::temp_dir().join("mafia-server-tests");
            std::env::set_var("MAFIA_LOG_DIR", dir);
        }
        if std::env::var("MAFIA_DECISION_TIMEOUT_SECS").is_err() {
            std::env::set_var("MAFIA_DECISION_TIMEOUT_SECS", "5");
        }
    });
}
