use anyhow::Context;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::{Collection, Database};
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::error::QuizError;
use crate::metrics::track_db_operation;
use crate::models::Question;

const QUESTIONS_COLLECTION: &str = "questions";

/// Read-only lookup over the question bank.
#[async_trait]
pub trait QuestionStore: Send + Sync {
    async fn get_by_id(&self, question_id: &str) -> Result<Question, QuizError>;

    /// Random pick, optionally restricted to one difficulty label.
    /// A blank label means no filter.
    async fn get_random(&self, difficulty: Option<&str>) -> Result<Question, QuizError>;
}

fn difficulty_filter(difficulty: Option<&str>) -> Option<&str> {
    difficulty.map(str::trim).filter(|d| !d.is_empty())
}

/// Question bank held in process memory. Built once and never mutated.
pub struct InMemoryQuestionStore {
    questions: Vec<Question>,
}

impl InMemoryQuestionStore {
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    pub fn seeded() -> Self {
        Self::new(seed_questions())
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

#[async_trait]
impl QuestionStore for InMemoryQuestionStore {
    async fn get_by_id(&self, question_id: &str) -> Result<Question, QuizError> {
        self.questions
            .iter()
            .find(|q| q.id == question_id)
            .cloned()
            .ok_or_else(|| QuizError::QuestionNotFound(question_id.to_string()))
    }

    async fn get_random(&self, difficulty: Option<&str>) -> Result<Question, QuizError> {
        let filter = difficulty_filter(difficulty);
        let candidates: Vec<&Question> = self
            .questions
            .iter()
            .filter(|q| filter.map_or(true, |d| q.difficulty == d))
            .collect();

        candidates
            .choose(&mut rand::rng())
            .map(|q| (*q).clone())
            .ok_or_else(|| QuizError::NoQuestionAvailable(filter.map(str::to_string)))
    }
}

/// Catalog used when no external question bank is configured.
pub fn seed_questions() -> Vec<Question> {
    vec![
        Question {
            id: "q1".to_string(),
            video_url: String::new(),
            thumbnail_emoji: "🎬".to_string(),
            options: vec![
                "The mouth movement looks awkward".to_string(),
                "The eyes never blink".to_string(),
                "The hair is swaying".to_string(),
                "The voice sounds different".to_string(),
            ],
            correct_index: 1,
            explanation: "Deepfake videos often get eye blinking wrong!".to_string(),
            difficulty: "easy".to_string(),
        },
        Question {
            id: "q2".to_string(),
            video_url: String::new(),
            thumbnail_emoji: "🎥".to_string(),
            options: vec![
                "The background looks natural".to_string(),
                "The edge of the face is smeared".to_string(),
                "The voice is accurate".to_string(),
                "The lighting matches".to_string(),
            ],
            correct_index: 1,
            explanation: "A blurry or smeared face boundary is a classic sign of face swapping!"
                .to_string(),
            difficulty: "medium".to_string(),
        },
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct QuestionDocument {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    video_url: String,
    #[serde(default)]
    thumbnail_emoji: String,
    options: Vec<String>,
    correct_index: i32,
    #[serde(default)]
    explanation: String,
    difficulty: String,
}

impl From<QuestionDocument> for Question {
    fn from(doc: QuestionDocument) -> Self {
        Self {
            id: doc.id,
            video_url: doc.video_url,
            thumbnail_emoji: doc.thumbnail_emoji,
            options: doc.options,
            correct_index: doc.correct_index,
            explanation: doc.explanation,
            difficulty: doc.difficulty,
        }
    }
}

/// Question bank backed by the `questions` collection.
pub struct MongoQuestionStore {
    collection: Collection<QuestionDocument>,
}

impl MongoQuestionStore {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(QUESTIONS_COLLECTION),
        }
    }
}

#[async_trait]
impl QuestionStore for MongoQuestionStore {
    async fn get_by_id(&self, question_id: &str) -> Result<Question, QuizError> {
        let found = track_db_operation("find_one", QUESTIONS_COLLECTION, async {
            self.collection
                .find_one(doc! { "_id": question_id })
                .await
                .context("Failed to query questions collection")
        })
        .await?;

        found
            .map(Question::from)
            .ok_or_else(|| QuizError::QuestionNotFound(question_id.to_string()))
    }

    async fn get_random(&self, difficulty: Option<&str>) -> Result<Question, QuizError> {
        let filter = difficulty_filter(difficulty);

        let mut pipeline: Vec<Document> = Vec::new();
        if let Some(d) = filter {
            pipeline.push(doc! { "$match": { "difficulty": d } });
        }
        pipeline.push(doc! { "$sample": { "size": 1 } });

        let sampled = track_db_operation("aggregate", QUESTIONS_COLLECTION, async {
            let mut cursor = self
                .collection
                .aggregate(pipeline)
                .await
                .context("Failed to sample questions collection")?;
            cursor
                .try_next()
                .await
                .context("Failed to read sampled question")
        })
        .await?;

        let Some(raw) = sampled else {
            return Err(QuizError::NoQuestionAvailable(filter.map(str::to_string)));
        };

        let question: QuestionDocument = mongodb::bson::from_document(raw)
            .context("Sampled question has an unexpected shape")?;
        Ok(question.into())
    }
}
