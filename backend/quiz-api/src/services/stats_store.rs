use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::{doc, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::ReplaceOptions;
use mongodb::{Collection, Database};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::error::QuizError;
use crate::metrics::{track_db_operation, STATS_CAS_CONFLICTS_TOTAL};
use crate::models::UserStats;
use crate::utils::retry::{retry_async_when, RetryConfig};

const STATS_COLLECTION: &str = "quiz_user_stats";
const DUPLICATE_KEY: i32 = 11000;

/// Owner of the per-user stats records.
///
/// `apply_outcome` is a read-modify-write that implementations must serialize
/// per user: two concurrent calls for the same user observe each other's
/// effects in some order, while calls for different users proceed in parallel.
#[async_trait]
pub trait StatsStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<UserStats>, QuizError>;

    async fn apply_outcome(&self, user_id: &str, correct: bool) -> Result<UserStats, QuizError>;

    async fn ping(&self) -> Result<(), QuizError> {
        Ok(())
    }
}

type Slot = Arc<Mutex<Option<UserStats>>>;

/// Keyed-mutex store. The map lock is only held long enough to find or create
/// the user's slot; the transition itself runs under the slot lock.
#[derive(Default)]
pub struct InMemoryStatsStore {
    slots: RwLock<HashMap<String, Slot>>,
}

impl InMemoryStatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, user_id: &str) -> Slot {
        if let Some(slot) = self.slots.read().await.get(user_id) {
            return Arc::clone(slot);
        }
        let mut slots = self.slots.write().await;
        Arc::clone(slots.entry(user_id.to_string()).or_default())
    }
}

#[async_trait]
impl StatsStore for InMemoryStatsStore {
    async fn get(&self, user_id: &str) -> Result<Option<UserStats>, QuizError> {
        let slot = self.slots.read().await.get(user_id).cloned();
        match slot {
            Some(slot) => Ok(slot.lock().await.clone()),
            None => Ok(None),
        }
    }

    async fn apply_outcome(&self, user_id: &str, correct: bool) -> Result<UserStats, QuizError> {
        let slot = self.slot(user_id).await;
        let mut current = slot.lock().await;

        let mut stats = current.clone().unwrap_or_else(|| UserStats::new(user_id));
        stats.apply_outcome(correct);
        *current = Some(stats.clone());

        Ok(stats)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StatsDocument {
    #[serde(rename = "_id")]
    user_id: String,
    total_answered: u32,
    correct_count: u32,
    current_streak: u32,
    best_streak: u32,
    lives: i32,
    #[serde(default)]
    version: i64,
    updated_at: DateTime<Utc>,
}

impl From<&UserStats> for StatsDocument {
    fn from(stats: &UserStats) -> Self {
        Self {
            user_id: stats.user_id.clone(),
            total_answered: stats.total_answered,
            correct_count: stats.correct_count,
            current_streak: stats.current_streak,
            best_streak: stats.best_streak,
            lives: stats.lives,
            version: stats.version as i64,
            updated_at: stats.updated_at,
        }
    }
}

impl From<StatsDocument> for UserStats {
    fn from(doc: StatsDocument) -> Self {
        Self {
            user_id: doc.user_id,
            total_answered: doc.total_answered,
            correct_count: doc.correct_count,
            current_streak: doc.current_streak,
            best_streak: doc.best_streak,
            lives: doc.lives,
            version: doc.version.max(0) as u64,
            updated_at: doc.updated_at,
        }
    }
}

/// Matches the record only if it still carries `expected_version`. Records
/// written before versioning have no `version` field and read back as 0.
fn cas_filter(user_id: &str, expected_version: i64) -> Document {
    if expected_version == 0 {
        doc! {
            "_id": user_id,
            "$or": [
                { "version": 0_i64 },
                { "version": { "$exists": false } }
            ]
        }
    } else {
        doc! { "_id": user_id, "version": expected_version }
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match *err.kind {
        ErrorKind::Write(WriteFailure::WriteError(ref we)) => we.code == DUPLICATE_KEY,
        ErrorKind::Command(ref ce) => ce.code == DUPLICATE_KEY,
        _ => false,
    }
}

/// Stats kept in `quiz_user_stats`, one document per user keyed by `_id`.
///
/// Each transition is an upsert guarded by the version that was read. If
/// another writer got there first the filter no longer matches, the upsert
/// attempts an insert under an existing `_id` and fails with a duplicate key,
/// and the transition is retried from a fresh read.
pub struct MongoStatsStore {
    db: Database,
    collection: Collection<StatsDocument>,
    retry: RetryConfig,
}

impl MongoStatsStore {
    pub fn new(db: &Database, retry: RetryConfig) -> Self {
        Self {
            db: db.clone(),
            collection: db.collection(STATS_COLLECTION),
            retry,
        }
    }

    async fn try_apply(&self, user_id: &str, correct: bool) -> Result<UserStats, QuizError> {
        let current = track_db_operation("find_one", STATS_COLLECTION, async {
            self.collection
                .find_one(doc! { "_id": user_id })
                .await
                .context("Failed to read user stats")
        })
        .await?;

        let mut stats = current
            .map(UserStats::from)
            .unwrap_or_else(|| UserStats::new(user_id));
        let expected_version = stats.version as i64;
        stats.apply_outcome(correct);

        let replacement = StatsDocument::from(&stats);
        let outcome = track_db_operation("replace_one", STATS_COLLECTION, async {
            self.collection
                .replace_one(cas_filter(user_id, expected_version), &replacement)
                .with_options(ReplaceOptions::builder().upsert(true).build())
                .await
        })
        .await;

        match outcome {
            Ok(_) => Ok(stats),
            Err(e) if is_duplicate_key(&e) => {
                STATS_CAS_CONFLICTS_TOTAL.inc();
                tracing::debug!(
                    "Stats version {} for user {} is stale, retrying",
                    expected_version,
                    user_id
                );
                Err(QuizError::StatsConflict(user_id.to_string()))
            }
            Err(e) => Err(anyhow::Error::new(e)
                .context("Failed to upsert user stats")
                .into()),
        }
    }
}

#[async_trait]
impl StatsStore for MongoStatsStore {
    async fn get(&self, user_id: &str) -> Result<Option<UserStats>, QuizError> {
        let found = track_db_operation("find_one", STATS_COLLECTION, async {
            self.collection
                .find_one(doc! { "_id": user_id })
                .await
                .context("Failed to read user stats")
        })
        .await?;

        Ok(found.map(UserStats::from))
    }

    async fn apply_outcome(&self, user_id: &str, correct: bool) -> Result<UserStats, QuizError> {
        let outcome = retry_async_when(
            self.retry.clone(),
            |e| matches!(e, QuizError::StatsConflict(_)),
            || self.try_apply(user_id, correct),
        )
        .await;

        match outcome {
            Err(QuizError::StatsConflict(user)) => Err(QuizError::Persistence(anyhow!(
                "Gave up updating stats for user {} after {} conflicting attempts",
                user,
                self.retry.max_attempts
            ))),
            other => other,
        }
    }

    async fn ping(&self) -> Result<(), QuizError> {
        self.db
            .run_command(doc! { "ping": 1 })
            .await
            .context("MongoDB ping failed")?;
        Ok(())
    }
}
