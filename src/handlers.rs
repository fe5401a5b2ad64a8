use crate::error::{AppError, request_id_from_headers};
use crate::fuzzy::is_boosted;
use crate::models::{Question, SubmittedAnswer, QUESTIONS_PER_QUIZ};
use crate::scoring::{apply_multiplier, score_answers, ScoreDetail};
use crate::state::{AppState, LeaderboardEntry};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::{Duration, Instant};
use tracing::info;

const MAX_NAME_LEN: usize = 50;
const MAX_SUBJECT_LEN: usize = 200;

static RATE_LIMIT: Lazy<DashMap<String, (u32, Instant)>> = Lazy::new(DashMap::new);

fn check_rate_limit(scope: &str, key: &str, limit_per_minute: u32) -> bool {
    let now = Instant::now();
    let full_key = format!("{scope}:{key}");
    if let Some(mut entry) = RATE_LIMIT.get_mut(&full_key) {
        if now.duration_since(entry.1) > Duration::from_secs(60) {
            *entry = (1, now);
            true
        } else if entry.0 >= limit_per_minute {
            false
        } else {
            entry.0 += 1;
            true
        }
    } else {
        RATE_LIMIT.insert(full_key, (1, now));
        true
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterPayload {
    pub display_name: String,
}

#[derive(Debug, Serialize)]
pub struct UserOut {
    pub id: String,
    pub display_name: String,
}

pub async fn register_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RegisterPayload>,
) -> Result<Json<UserOut>, AppError> {
    let req_id = request_id_from_headers(&headers);
    let name = payload.display_name.trim();
    if name.is_empty() {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "name cannot be empty",
            req_id,
        ));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "name too long (max 50 chars)",
            req_id,
        ));
    }

    let user = state.register_user(name).await;
    Ok(Json(UserOut {
        id: user.id,
        display_name: user.display_name,
    }))
}

pub async fn get_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> Result<Json<UserOut>, AppError> {
    let req_id = request_id_from_headers(&headers);
    let user = state.get_user(&user_id).await.ok_or_else(|| {
        AppError::new(StatusCode::NOT_FOUND, "NOT_FOUND", "user not found", req_id)
    })?;
    Ok(Json(UserOut {
        id: user.id,
        display_name: user.display_name,
    }))
}

#[derive(Debug, Deserialize)]
pub struct GeneratePayload {
    pub subject: String,
}

#[derive(Debug, Serialize)]
pub struct QuizResponse {
    pub subject: String,
    pub questions: Vec<Question>,
    pub multiplier_active: bool,
}

pub async fn generate_quiz(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<GeneratePayload>,
) -> Result<Json<QuizResponse>, AppError> {
    let req_id = request_id_from_headers(&headers);
    let ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("local");
    if !check_rate_limit("quiz_generate", ip, 10) {
        return Err(AppError::new(
            StatusCode::TOO_MANY_REQUESTS,
            "RATE_LIMITED",
            "too many requests",
            req_id,
        ));
    }

    let subject = payload.subject.trim();
    if subject.is_empty() {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "subject cannot be empty",
            req_id,
        ));
    }
    if subject.chars().count() > MAX_SUBJECT_LEN {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "subject too long (max 200 chars)",
            req_id,
        ));
    }

    let mut quiz = state.generator.generate(subject).await.map_err(|e| {
        AppError::new(
            StatusCode::BAD_GATEWAY,
            "UPSTREAM_ERROR",
            e.to_string(),
            req_id.clone(),
        )
    })?;

    // Answer order must not leak the generation order of the classes.
    {
        let mut rng = rand::thread_rng();
        for question in &mut quiz.questions {
            question.answers.shuffle(&mut rng);
        }
    }

    let multiplier_active = is_boosted(&quiz.subject, &state.matcher);
    info!(
        "generated quiz for subject {:?} (multiplier_active={})",
        quiz.subject, multiplier_active
    );
    Ok(Json(QuizResponse {
        subject: quiz.subject,
        questions: quiz.questions,
        multiplier_active,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SubmitQuery {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitPayload {
    pub subject: String,
    pub questions: Vec<Question>,
    pub answers: Vec<SubmittedAnswer>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub score_raw: i64,
    pub multiplier: f64,
    pub score_total: i64,
    pub details: Vec<ScoreDetail>,
}

pub async fn submit_quiz(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SubmitQuery>,
    Json(payload): Json<SubmitPayload>,
) -> Result<Json<SubmitResponse>, AppError> {
    let req_id = request_id_from_headers(&headers);
    let user = state.get_user(&query.user_id).await.ok_or_else(|| {
        AppError::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "user not found",
            req_id.clone(),
        )
    })?;
    if payload.answers.len() != QUESTIONS_PER_QUIZ {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "must submit exactly 3 answers",
            req_id,
        ));
    }

    let (score_raw, details) = score_answers(&payload.questions, &payload.answers);
    let multiplier = if is_boosted(&payload.subject, &state.matcher) {
        state.matcher.multiplier
    } else {
        1.0
    };
    let score_total = apply_multiplier(score_raw, multiplier);
    state
        .record_attempt(&user, &payload.subject, score_raw, multiplier, score_total)
        .await;
    info!(
        "scored submission for user {}: raw={} multiplier={} total={}",
        user.id, score_raw, multiplier, score_total
    );
    Ok(Json(SubmitResponse {
        score_raw,
        multiplier,
        score_total,
        details,
    }))
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub entries: Vec<LeaderboardEntry>,
    pub last_updated: Option<String>,
}

pub async fn leaderboard(State(state): State<AppState>) -> Json<LeaderboardResponse> {
    let entries = state.leaderboard_entries().await;
    let last_updated = entries.first().map(|e| e.last_updated.to_rfc3339());
    Json(LeaderboardResponse {
        entries,
        last_updated,
    })
}

pub async fn reset_leaderboard(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    let req_id = request_id_from_headers(&headers);
    let token = headers.get("x-admin-token").and_then(|v| v.to_str().ok());
    if token != Some(state.settings.admin_token.as_str()) {
        return Err(AppError::new(
            StatusCode::FORBIDDEN,
            "FORBIDDEN",
            "invalid admin token",
            req_id,
        ));
    }
    let deleted = state.reset_leaderboard().await;
    info!("leaderboard reset, {} entries deleted", deleted);
    Ok(Json(json!({ "message": "Leaderboard reset", "deleted": deleted })))
}
