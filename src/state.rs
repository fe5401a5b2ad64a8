use crate::config::{MatcherConfig, Settings};
use crate::generate::QuizGenerator;
use crate::llm::GenerateClient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::{fs, path::Path};
use tokio::sync::RwLock;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: String,
    pub user_id: String,
    pub subject: String,
    pub score_raw: i64,
    pub multiplier: f64,
    pub score_total: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub display_name: String,
    pub best_score: i64,
    pub total_score: i64,
    pub quizzes_taken: u32,
    pub last_updated: DateTime<Utc>,
}

pub struct InMemoryDb {
    pub users: RwLock<HashMap<String, User>>,
    pub users_by_name: RwLock<HashMap<String, String>>,
    pub attempts: RwLock<HashMap<String, QuizAttempt>>,
    pub leaderboard: RwLock<HashMap<String, LeaderboardEntry>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistentSnapshot {
    users: HashMap<String, User>,
    users_by_name: HashMap<String, String>,
    attempts: HashMap<String, QuizAttempt>,
    leaderboard: HashMap<String, LeaderboardEntry>,
}

impl InMemoryDb {
    pub fn new(snapshot_path: Option<&str>) -> Self {
        let snapshot = snapshot_path.and_then(|path| {
            let raw = fs::read_to_string(path).ok()?;
            match serde_json::from_str::<PersistentSnapshot>(&raw) {
                Ok(s) => Some(s),
                Err(err) => {
                    warn!("failed to read local snapshot {}: {}", path, err);
                    None
                }
            }
        });

        let (users, users_by_name, attempts, leaderboard) = match snapshot {
            Some(s) => (s.users, s.users_by_name, s.attempts, s.leaderboard),
            None => Default::default(),
        };

        Self {
            users: RwLock::new(users),
            users_by_name: RwLock::new(users_by_name),
            attempts: RwLock::new(attempts),
            leaderboard: RwLock::new(leaderboard),
        }
    }

    async fn snapshot(&self) -> PersistentSnapshot {
        PersistentSnapshot {
            users: self.users.read().await.clone(),
            users_by_name: self.users_by_name.read().await.clone(),
            attempts: self.attempts.read().await.clone(),
            leaderboard: self.leaderboard.read().await.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<InMemoryDb>,
    pub generator: Arc<QuizGenerator>,
    pub matcher: Arc<MatcherConfig>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(client: Arc<dyn GenerateClient>, settings: Settings, matcher: MatcherConfig) -> Self {
        let db = Arc::new(InMemoryDb::new(settings.local_state_path.as_deref()));
        let generator = Arc::new(QuizGenerator::new(client, settings.generation.clone()));
        Self {
            db,
            generator,
            matcher: Arc::new(matcher),
            settings: Arc::new(settings),
        }
    }

    /// Returns the existing user with this name, or creates one.
    pub async fn register_user(&self, display_name: &str) -> User {
        {
            let by_name = self.db.users_by_name.read().await;
            if let Some(id) = by_name.get(display_name) {
                if let Some(user) = self.db.users.read().await.get(id).cloned() {
                    return user;
                }
            }
        }

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            display_name: display_name.to_string(),
            created_at: Utc::now(),
        };
        self.db
            .users
            .write()
            .await
            .insert(user.id.clone(), user.clone());
        self.db
            .users_by_name
            .write()
            .await
            .insert(user.display_name.clone(), user.id.clone());
        if let Err(err) = self.persist_core_data().await {
            warn!("failed to persist local state after register_user: {}", err);
        }
        user
    }

    pub async fn get_user(&self, user_id: &str) -> Option<User> {
        self.db.users.read().await.get(user_id).cloned()
    }

    /// Stores the attempt and folds its total into the user's leaderboard
    /// row: best keeps the maximum, total accumulates, taken increments.
    pub async fn record_attempt(
        &self,
        user: &User,
        subject: &str,
        score_raw: i64,
        multiplier: f64,
        score_total: i64,
    ) -> QuizAttempt {
        let attempt = QuizAttempt {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            subject: subject.to_string(),
            score_raw,
            multiplier,
            score_total,
            created_at: Utc::now(),
        };
        self.db
            .attempts
            .write()
            .await
            .insert(attempt.id.clone(), attempt.clone());

        {
            let mut board = self.db.leaderboard.write().await;
            let entry = board.entry(user.id.clone()).or_insert_with(|| LeaderboardEntry {
                user_id: user.id.clone(),
                display_name: user.display_name.clone(),
                best_score: score_total,
                total_score: 0,
                quizzes_taken: 0,
                last_updated: attempt.created_at,
            });
            entry.total_score += score_total;
            entry.quizzes_taken += 1;
            if score_total > entry.best_score {
                entry.best_score = score_total;
            }
            entry.display_name = user.display_name.clone();
            entry.last_updated = attempt.created_at;
        }

        if let Err(err) = self.persist_core_data().await {
            warn!("failed to persist local state after record_attempt: {}", err);
        }
        attempt
    }

    /// Leaderboard rows sorted by total score, most recently updated first
    /// among ties.
    pub async fn leaderboard_entries(&self) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<LeaderboardEntry> =
            self.db.leaderboard.read().await.values().cloned().collect();
        entries.sort_by(|a, b| {
            b.total_score
                .cmp(&a.total_score)
                .then(b.last_updated.cmp(&a.last_updated))
        });
        entries
    }

    pub async fn reset_leaderboard(&self) -> usize {
        let deleted = {
            let mut board = self.db.leaderboard.write().await;
            let deleted = board.len();
            board.clear();
            deleted
        };
        if let Err(err) = self.persist_core_data().await {
            warn!(
                "failed to persist local state after reset_leaderboard: {}",
                err
            );
        }
        deleted
    }

    pub async fn persist_core_data(&self) -> anyhow::Result<()> {
        let Some(path) = self.settings.local_state_path.as_ref() else {
            return Ok(());
        };
        let snapshot = self.db.snapshot().await;
        let serialized = serde_json::to_vec_pretty(&snapshot)?;
        if let Some(parent) = Path::new(path).parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, serialized).await?;
        Ok(())
    }
}
