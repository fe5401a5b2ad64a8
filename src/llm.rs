use crate::config::GenerationSettings;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("generation endpoint returned HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("generation request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("generation endpoint returned an empty response")]
    EmptyResponse,
}

/// Produces the raw model completion for a quiz prompt. Implementations are
/// swapped between the real endpoint and test doubles.
pub trait GenerateClient: Send + Sync {
    fn generate_quiz_text(
        &self,
        prompt: &str,
        system: &str,
    ) -> BoxFuture<'static, Result<String, LlmError>>;
}

/// Client for an Ollama-style `/api/generate` endpoint.
#[derive(Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    num_predict: u32,
}

impl OllamaClient {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        generation: &GenerationSettings,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(generation.timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
            temperature: generation.temperature,
            num_predict: generation.num_predict,
        })
    }
}

impl GenerateClient for OllamaClient {
    fn generate_quiz_text(
        &self,
        prompt: &str,
        system: &str,
    ) -> BoxFuture<'static, Result<String, LlmError>> {
        let client = self.client.clone();
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            system: system.to_string(),
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
                num_predict: self.num_predict,
            },
        };

        Box::pin(async move {
            let res = client.post(&url).json(&request).send().await?;
            if !res.status().is_success() {
                let status = res.status().as_u16();
                let body = res.text().await.unwrap_or_default();
                let message = extract_ollama_error(&body).unwrap_or(body);
                return Err(LlmError::Http { status, message });
            }
            let body: GenerateResponse = res.json().await?;
            if body.response.trim().is_empty() {
                return Err(LlmError::EmptyResponse);
            }
            Ok(body.response)
        })
    }
}

/// Stand-in used when no generation endpoint is configured. Returns a fixed
/// payload that passes structural validation, without a subject so the
/// caller's subject is used.
#[derive(Clone)]
pub struct MockGenerateClient;

impl GenerateClient for MockGenerateClient {
    fn generate_quiz_text(
        &self,
        _prompt: &str,
        _system: &str,
    ) -> BoxFuture<'static, Result<String, LlmError>> {
        Box::pin(async move {
            let questions: Vec<serde_json::Value> = (1..=3)
                .map(|n| {
                    serde_json::json!({
                        "id": format!("q{n}"),
                        "question": format!("Placeholder question {n}: which option is accurate?"),
                        "answers": [
                            {"id": format!("q{n}a1"), "text": "The accurate option", "class": "correct", "explanation": "This is the accurate one."},
                            {"id": format!("q{n}a2"), "text": "A clearly absurd option", "class": "obviously_wrong", "explanation": "This one is absurd."},
                            {"id": format!("q{n}a3"), "text": "A plausible but wrong option", "class": "doubtful", "explanation": "Close, but not it."},
                            {"id": format!("q{n}a4"), "text": "Another plausible option", "class": "doubtful", "explanation": "Also close, but not it."}
                        ]
                    })
                })
                .collect();
            Ok(serde_json::json!({ "questions": questions }).to_string())
        })
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    system: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Ollama error bodies look like {"error": "..."}.
fn extract_ollama_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct EWrap {
        error: String,
    }
    serde_json::from_str::<EWrap>(body).ok().map(|w| w.error)
}
