use anyhow::Context;
use async_trait::async_trait;
use mongodb::{Collection, Database};
use tokio::sync::RwLock;

use crate::error::QuizError;
use crate::metrics::track_db_operation;
use crate::models::{AnswerRecord, NewAnswer};

const ANSWERS_COLLECTION: &str = "quiz_answers";

/// Append-only log of every submission. Identical submissions are recorded
/// twice; there is no de-duplication at this layer.
#[async_trait]
pub trait AnswerLedger: Send + Sync {
    async fn append(&self, answer: NewAnswer) -> Result<AnswerRecord, QuizError>;
}

#[derive(Default)]
pub struct InMemoryAnswerLedger {
    records: RwLock<Vec<AnswerRecord>>,
}

impl InMemoryAnswerLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<AnswerRecord> {
        self.records.read().await.clone()
    }

    pub async fn records_for_user(&self, user_id: &str) -> Vec<AnswerRecord> {
        self.records
            .read()
            .await
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl AnswerLedger for InMemoryAnswerLedger {
    async fn append(&self, answer: NewAnswer) -> Result<AnswerRecord, QuizError> {
        let record = AnswerRecord::from(answer);
        self.records.write().await.push(record.clone());
        Ok(record)
    }
}

pub struct MongoAnswerLedger {
    collection: Collection<AnswerRecord>,
}

impl MongoAnswerLedger {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(ANSWERS_COLLECTION),
        }
    }
}

#[async_trait]
impl AnswerLedger for MongoAnswerLedger {
    async fn append(&self, answer: NewAnswer) -> Result<AnswerRecord, QuizError> {
        let record = AnswerRecord::from(answer);

        track_db_operation("insert_one", ANSWERS_COLLECTION, async {
            self.collection
                .insert_one(&record)
                .await
                .context("Failed to insert answer record")
        })
        .await?;

        tracing::debug!(
            "Answer record saved: id={}, user={}, question={}",
            record.id,
            record.user_id,
            record.question_id
        );
        Ok(record)
    }
}
