use crate::config::GenerationSettings;
use crate::llm::{GenerateClient, LlmError};
use crate::models::{validate_quiz, Quiz, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::warn;

pub const SYSTEM_PROMPT: &str =
    "You generate quiz questions as strict JSON only. No prose. No markdown. No code fences.";

pub const USER_PROMPT_TEMPLATE: &str = r#"Create exactly 3 multiple choice questions about: "{subject}".

Each question must have exactly 4 answer options.
Exactly one option is correct, exactly one option is obviously wrong, and the other two must be plausible and cause doubt.

Questions should be concise and unambiguous.
Avoid trick questions that hinge on wording rather than knowledge.
No personally identifying questions.
Keep the difficulty "professional but accessible".

Return ONLY valid JSON in this exact schema (no other text):
{
  "subject": "{subject}",
  "questions": [
    {
      "id": "q1",
      "question": "...",
      "answers": [
        {"id": "q1a1", "text": "...", "class": "correct", "explanation": "..."},
        {"id": "q1a2", "text": "...", "class": "obviously_wrong", "explanation": "..."},
        {"id": "q1a3", "text": "...", "class": "doubtful", "explanation": "..."},
        {"id": "q1a4", "text": "...", "class": "doubtful", "explanation": "..."}
      ]
    },
    {
      "id": "q2",
      "question": "...",
      "answers": [
        {"id": "q2a1", "text": "...", "class": "correct", "explanation": "..."},
        {"id": "q2a2", "text": "...", "class": "obviously_wrong", "explanation": "..."},
        {"id": "q2a3", "text": "...", "class": "doubtful", "explanation": "..."},
        {"id": "q2a4", "text": "...", "class": "doubtful", "explanation": "..."}
      ]
    },
    {
      "id": "q3",
      "question": "...",
      "answers": [
        {"id": "q3a1", "text": "...", "class": "correct", "explanation": "..."},
        {"id": "q3a2", "text": "...", "class": "obviously_wrong", "explanation": "..."},
        {"id": "q3a3", "text": "...", "class": "doubtful", "explanation": "..."},
        {"id": "q3a4", "text": "...", "class": "doubtful", "explanation": "..."}
      ]
    }
  ]
}"#;

static FENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*\n?(.*?)\n?```")
        .unwrap_or_else(|_| Regex::new("^$").unwrap())
});

pub fn build_user_prompt(subject: &str) -> String {
    USER_PROMPT_TEMPLATE.replace("{subject}", subject)
}

#[derive(Debug, thiserror::Error)]
#[error("could not extract valid JSON from model response: {snippet}...")]
pub struct ParseError {
    snippet: String,
}

impl ParseError {
    fn new(text: &str) -> Self {
        Self {
            snippet: text.chars().take(200).collect(),
        }
    }
}

/// Pulls a JSON document out of a model completion.
///
/// Tries the whole string first, then the contents of a markdown code fence,
/// then the span from the first `{` to the last `}`. Each candidate must
/// parse strictly; the first one that does wins.
pub fn extract_json(text: &str) -> Result<serde_json::Value, ParseError> {
    let text = text.trim();
    if let Ok(value) = serde_json::from_str(text) {
        return Ok(value);
    }

    if let Some(caps) = FENCE_RE.captures(text) {
        if let Some(inner) = caps.get(1) {
            if let Ok(value) = serde_json::from_str(inner.as_str().trim()) {
                return Ok(value);
            }
        }
    }

    if let (Some(first), Some(last)) = (text.find('{'), text.rfind('}')) {
        if first < last {
            if let Ok(value) = serde_json::from_str(&text[first..=last]) {
                return Ok(value);
            }
        }
    }

    Err(ParseError::new(text))
}

#[derive(Debug, thiserror::Error)]
pub enum AttemptError {
    #[error(transparent)]
    Transport(#[from] LlmError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("failed to generate a valid quiz after {attempts} attempts: {source}")]
    Exhausted { attempts: u32, source: AttemptError },
}

/// Runs the generate, extract, validate pipeline with a bounded retry.
pub struct QuizGenerator {
    client: Arc<dyn GenerateClient>,
    settings: GenerationSettings,
}

impl QuizGenerator {
    pub fn new(client: Arc<dyn GenerateClient>, settings: GenerationSettings) -> Self {
        Self { client, settings }
    }

    /// Generates a validated quiz for the subject. Transport, parse, and
    /// validation failures are all retried; once the attempts are spent the
    /// last failure is returned with the attempt count.
    pub async fn generate(&self, subject: &str) -> Result<Quiz, GenerateError> {
        let prompt = build_user_prompt(subject);
        let max_attempts = self.settings.max_attempts.max(1);
        let mut last_error: Option<AttemptError> = None;

        for attempt in 1..=max_attempts {
            match self.attempt(&prompt).await {
                Ok(mut quiz) => {
                    if quiz.subject.trim().is_empty() {
                        quiz.subject = subject.to_string();
                    }
                    return Ok(quiz);
                }
                Err(err) => {
                    warn!(
                        "quiz generation attempt {}/{} failed: {}",
                        attempt, max_attempts, err
                    );
                    last_error = Some(err);
                }
            }
        }

        Err(GenerateError::Exhausted {
            attempts: max_attempts,
            source: last_error.unwrap_or_else(|| LlmError::EmptyResponse.into()),
        })
    }

    async fn attempt(&self, prompt: &str) -> Result<Quiz, AttemptError> {
        let raw = self.client.generate_quiz_text(prompt, SYSTEM_PROMPT).await?;
        let value = extract_json(&raw)?;
        let quiz = validate_quiz(&value)?;
        Ok(quiz)
    }
}
