use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tokio::sync::{broadcast, OnceCell};

use crate::error::NotifyError;
use crate::metrics::EVENTS_EMITTED_TOTAL;
use crate::models::DomainEvent;

/// Transport for domain events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &DomainEvent) -> Result<(), NotifyError>;

    async fn ping(&self) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Best-effort, at-least-once emission with a bounded attempt per event.
///
/// Failures are logged and returned to the caller but are never retried here;
/// a publisher that lost its connection reconnects on the next send.
pub struct EventNotifier {
    publisher: Arc<dyn EventPublisher>,
    timeout: Duration,
}

impl EventNotifier {
    pub fn new(publisher: Arc<dyn EventPublisher>, timeout: Duration) -> Self {
        Self { publisher, timeout }
    }

    pub async fn emit(&self, event: DomainEvent) -> Result<(), NotifyError> {
        let outcome = match tokio::time::timeout(self.timeout, self.publisher.publish(&event)).await
        {
            Ok(result) => result,
            Err(_) => Err(NotifyError::Timeout(self.timeout)),
        };

        match &outcome {
            Ok(()) => {
                EVENTS_EMITTED_TOTAL
                    .with_label_values(&[event.event_type.as_str(), "success"])
                    .inc();
                tracing::info!("Event emitted: {}", event.event_type);
            }
            Err(e) => {
                EVENTS_EMITTED_TOTAL
                    .with_label_values(&[event.event_type.as_str(), "error"])
                    .inc();
                tracing::warn!(event_type = %event.event_type, error = %e, "Failed to emit event");
            }
        }

        outcome
    }

    pub async fn ping(&self) -> Result<(), NotifyError> {
        match tokio::time::timeout(self.timeout, self.publisher.ping()).await {
            Ok(result) => result,
            Err(_) => Err(NotifyError::Timeout(self.timeout)),
        }
    }
}

/// Appends events to a Redis stream, one entry per event:
/// `XADD <stream> MAXLEN ~ <n> * event_type <type> data <envelope-json>`.
pub struct RedisStreamPublisher {
    client: redis::Client,
    conn: OnceCell<ConnectionManager>,
    stream: String,
    max_len: usize,
}

impl RedisStreamPublisher {
    pub fn new(client: redis::Client, stream: impl Into<String>, max_len: usize) -> Self {
        Self {
            client,
            conn: OnceCell::new(),
            stream: stream.into(),
            max_len,
        }
    }

    /// The first send connects; a failed connect leaves the cell empty so the
    /// next send tries again.
    async fn connection(&self) -> Result<ConnectionManager, NotifyError> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                tracing::info!("Connecting event publisher to Redis stream {}", self.stream);
                ConnectionManager::new(self.client.clone()).await
            })
            .await
            .map_err(|e| NotifyError::Unavailable(e.to_string()))?;
        Ok(conn.clone())
    }
}

#[async_trait]
impl EventPublisher for RedisStreamPublisher {
    async fn publish(&self, event: &DomainEvent) -> Result<(), NotifyError> {
        let envelope = serde_json::to_string(event)?;
        let mut conn = self.connection().await?;

        let entry_id: String = redis::cmd("XADD")
            .arg(&self.stream)
            .arg("MAXLEN")
            .arg("~")
            .arg(self.max_len)
            .arg("*")
            .arg("event_type")
            .arg(&event.event_type)
            .arg("data")
            .arg(envelope)
            .query_async(&mut conn)
            .await
            .map_err(|e| NotifyError::Broker(e.to_string()))?;

        tracing::debug!("Event {} appended as {}", event.event_type, entry_id);
        Ok(())
    }

    async fn ping(&self) -> Result<(), NotifyError> {
        let mut conn = self.connection().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| NotifyError::Broker(e.to_string()))?;
        Ok(())
    }
}

/// In-process fan-out, used in development and tests.
pub struct ChannelPublisher {
    tx: broadcast::Sender<DomainEvent>,
}

impl ChannelPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl EventPublisher for ChannelPublisher {
    async fn publish(&self, event: &DomainEvent) -> Result<(), NotifyError> {
        // No receivers just means nobody is listening.
        let _ = self.tx.send(event.clone());
        Ok(())
    }
}

/// Drops every event. Used when events are switched off.
pub struct NoopPublisher;

#[async_trait]
impl EventPublisher for NoopPublisher {
    async fn publish(&self, event: &DomainEvent) -> Result<(), NotifyError> {
        tracing::debug!("Events disabled, dropping {}", event.event_type);
        Ok(())
    }
}
