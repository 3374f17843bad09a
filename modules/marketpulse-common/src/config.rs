use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // AI provider
    pub anthropic_api_key: String,
    pub claude_model: String,

    // Pipeline tuning
    pub context_lookback_days: i64,
    pub collaborator_timeout_secs: u64,

    // Run artifacts
    pub data_dir: String,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            anthropic_api_key: required_env("ANTHROPIC_API_KEY"),
            claude_model: env::var("CLAUDE_MODEL")
                .unwrap_or_else(|_| "claude-haiku-4-5-20251001".to_string()),
            context_lookback_days: env::var("CONTEXT_LOOKBACK_DAYS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .expect("CONTEXT_LOOKBACK_DAYS must be a number"),
            collaborator_timeout_secs: env::var("COLLABORATOR_TIMEOUT_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .expect("COLLABORATOR_TIMEOUT_SECS must be a number"),
            data_dir: env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
