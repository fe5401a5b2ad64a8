use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub ollama_base_url: Option<String>,
    pub ollama_model: String,
    pub admin_token: String,
    pub local_state_path: Option<String>,
    pub subjects_path: String,
    pub generation: GenerationSettings,
}

#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub max_attempts: u32,
    pub timeout: Duration,
    pub temperature: f32,
    pub num_predict: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            timeout: Duration::from_secs(120),
            temperature: 0.7,
            num_predict: 2048,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let host = std::env::var("BACKEND_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = std::env::var("BACKEND_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .unwrap_or(8080);
        let ollama_base_url = std::env::var("OLLAMA_BASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());
        let ollama_model =
            std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "mistral:7b-instruct".to_string());
        let admin_token = std::env::var("ADMIN_TOKEN").unwrap_or_else(|_| "SECRET".to_string());
        let local_state_path = std::env::var("LOCAL_STATE_PATH")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| Some(format!("{}/local_state.json", env!("CARGO_MANIFEST_DIR"))));
        let subjects_path =
            std::env::var("SUBJECTS_PATH").unwrap_or_else(|_| "./subjects.toml".to_string());

        let defaults = GenerationSettings::default();
        let max_attempts = std::env::var("GENERATE_MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(defaults.max_attempts);
        let timeout = std::env::var("OLLAMA_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);

        Self {
            host,
            port,
            ollama_base_url,
            ollama_model,
            admin_token,
            local_state_path,
            subjects_path,
            generation: GenerationSettings {
                max_attempts,
                timeout,
                ..defaults
            },
        }
    }
}

/// Boosted-subject list plus the fuzzy-matching tunables, read from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct MatcherConfig {
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default = "default_ratio_threshold")]
    pub ratio_threshold: f64,
    #[serde(default = "default_partial_ratio_threshold")]
    pub partial_ratio_threshold: f64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_ratio_threshold() -> f64 {
    70.0
}

fn default_partial_ratio_threshold() -> f64 {
    85.0
}

fn default_multiplier() -> f64 {
    2.0
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            subjects: Vec::new(),
            ratio_threshold: default_ratio_threshold(),
            partial_ratio_threshold: default_partial_ratio_threshold(),
            multiplier: default_multiplier(),
        }
    }
}

impl MatcherConfig {
    /// Loads the subjects file. A missing or unparsable file logs an error
    /// and falls back to the defaults, leaving the boost list empty.
    pub fn load(path: &str) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => match toml::from_str::<MatcherConfig>(&raw) {
                Ok(config) => {
                    info!("loaded {} boosted subjects from {}", config.subjects.len(), path);
                    config
                }
                Err(err) => {
                    error!("failed to parse subjects file {}: {}", path, err);
                    MatcherConfig::default()
                }
            },
            Err(err) => {
                error!("failed to read subjects file {}: {}", path, err);
                MatcherConfig::default()
            }
        }
    }
}
