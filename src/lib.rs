pub mod config;
pub mod error;
pub mod fuzzy;
pub mod generate;
pub mod handlers;
pub mod llm;
pub mod models;
pub mod routes;
pub mod scoring;
pub mod state;

use crate::llm::{GenerateClient, MockGenerateClient, OllamaClient};
use std::sync::Arc;
use tracing::info;

pub fn build_state() -> anyhow::Result<state::AppState> {
    let settings = config::Settings::from_env();
    let matcher = config::MatcherConfig::load(&settings.subjects_path);
    let client: Arc<dyn GenerateClient> = match settings.ollama_base_url.as_deref() {
        Some(url) => {
            info!("using ollama at {} with model {}", url, settings.ollama_model);
            Arc::new(OllamaClient::new(
                url,
                settings.ollama_model.clone(),
                &settings.generation,
            )?)
        }
        None => {
            info!("OLLAMA_BASE_URL is not set, using the built-in mock generation client");
            Arc::new(MockGenerateClient)
        }
    };
    Ok(state::AppState::new(client, settings, matcher))
}
