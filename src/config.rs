use crate::models::Sport;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

/// Runtime settings, read from `.env` and the process environment
#[derive(Debug, Clone)]
pub struct Config {
    pub odds_api_key: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_base_url: String,
    pub llm_model: String,
    pub webhook_secret: Option<String>,
    pub subscriptions_file: PathBuf,
    pub cache_dir: PathBuf,
    pub use_cache: bool,
    pub bind_addr: String,
    pub http_timeout: Duration,
    pub value_margin: f64,
    pub default_sport: Sport,
    /// Skip every outbound call and serve bundled sample data
    pub offline: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            odds_api_key: None,
            llm_api_key: None,
            llm_base_url: DEFAULT_LLM_BASE_URL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            webhook_secret: None,
            subscriptions_file: PathBuf::from("data/subscriptions.json"),
            cache_dir: PathBuf::from("cache"),
            use_cache: false,
            bind_addr: "127.0.0.1:3000".to_string(),
            http_timeout: Duration::from_secs(10),
            value_margin: 0.03,
            default_sport: Sport::Nfl,
            offline: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup; unset or blank keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Ok(Self {
            odds_api_key: get("ODDS_API_KEY"),
            llm_api_key: get("LLM_API_KEY"),
            llm_base_url: get("LLM_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.llm_base_url),
            llm_model: get("LLM_MODEL").unwrap_or(defaults.llm_model),
            webhook_secret: get("WEBHOOK_SECRET"),
            subscriptions_file: get("SUBSCRIPTIONS_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.subscriptions_file),
            cache_dir: get("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            use_cache: get("USE_CACHE").as_deref() == Some("1"),
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            http_timeout: match get("HTTP_TIMEOUT_SECS") {
                Some(secs) => Duration::from_secs(
                    secs.parse()
                        .with_context(|| format!("Invalid HTTP_TIMEOUT_SECS: {}", secs))?,
                ),
                None => defaults.http_timeout,
            },
            value_margin: match get("VALUE_MARGIN") {
                Some(margin) => margin
                    .parse()
                    .with_context(|| format!("Invalid VALUE_MARGIN: {}", margin))?,
                None => defaults.value_margin,
            },
            default_sport: match get("DEFAULT_SPORT") {
                Some(sport) => Sport::from_str(&sport)?,
                None => defaults.default_sport,
            },
            offline: get("OFFLINE").as_deref() == Some("1"),
        })
    }

    pub fn cache_file(&self, name: &str) -> PathBuf {
        self.cache_dir.join(name)
    }
}
