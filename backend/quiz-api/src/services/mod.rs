use std::sync::Arc;

use crate::config::{Config, EventsBackend, StorageBackend};
use crate::utils::retry::RetryConfig;

pub mod answer_ledger;
pub mod event_notifier;
pub mod question_store;
pub mod quiz_service;
pub mod stats_store;

use answer_ledger::{AnswerLedger, InMemoryAnswerLedger, MongoAnswerLedger};
use event_notifier::{
    ChannelPublisher, EventNotifier, EventPublisher, NoopPublisher, RedisStreamPublisher,
};
use question_store::{InMemoryQuestionStore, MongoQuestionStore, QuestionStore};
use quiz_service::QuizService;
use stats_store::{InMemoryStatsStore, MongoStatsStore, StatsStore};

/// Process-wide state, built once at startup and shared with every handler.
pub struct AppState {
    pub config: Config,
    pub quiz: QuizService,
}

impl AppState {
    /// Wires the stores and the event publisher selected by `config`.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let (questions, ledger, stats): (
            Arc<dyn QuestionStore>,
            Arc<dyn AnswerLedger>,
            Arc<dyn StatsStore>,
        ) = match config.storage {
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; answers and stats are lost on restart");
                (
                    Arc::new(InMemoryQuestionStore::seeded()),
                    Arc::new(InMemoryAnswerLedger::new()),
                    Arc::new(InMemoryStatsStore::new()),
                )
            }
            StorageBackend::Mongo => {
                let client = mongodb::Client::with_uri_str(&config.mongo_uri).await?;
                let db = client.database(&config.mongo_database);
                tracing::info!("MongoDB client ready for database {}", config.mongo_database);
                (
                    Arc::new(MongoQuestionStore::new(&db)),
                    Arc::new(MongoAnswerLedger::new(&db)),
                    Arc::new(MongoStatsStore::new(
                        &db,
                        RetryConfig::with_max_attempts(config.stats_max_cas_attempts),
                    )),
                )
            }
        };

        let publisher: Arc<dyn EventPublisher> = match config.events.backend {
            EventsBackend::Redis => {
                let client = redis::Client::open(config.events.redis_uri.clone())?;
                tracing::info!(
                    "Publishing events to Redis stream {}",
                    config.events.stream
                );
                Arc::new(RedisStreamPublisher::new(
                    client,
                    config.events.stream.clone(),
                    config.events.stream_max_len,
                ))
            }
            EventsBackend::Channel => Arc::new(ChannelPublisher::new(1024)),
            EventsBackend::Disabled => Arc::new(NoopPublisher),
        };

        let notifier = EventNotifier::new(publisher, config.publish_timeout());
        let quiz = QuizService::new(questions, ledger, stats, notifier);

        Ok(Self::with_service(config, quiz))
    }

    pub fn with_service(config: Config, quiz: QuizService) -> Self {
        Self { config, quiz }
    }
}
