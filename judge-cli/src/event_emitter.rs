//! Publishes judged events onto the priority-keyed event queue (spec §4.F,
//! §6 "Event queue").
//!
//! `QueueSink` abstracts the backend the way `pgtrickle-relay` abstracts
//! its outbound sinks (NATS, Kafka, webhook, Redis, SQS, RabbitMQ) behind
//! one trait selected by Cargo feature — here there is exactly one shipped
//! backend (Redis `LPUSH`, matching the original judge's sink), but the
//! trait boundary is kept so an alternate backend is a new impl, not a
//! rewrite of the emitter.

use async_trait::async_trait;
use redis::AsyncCommands;

use judge_core::{Event, JudgeError, Priority};

#[async_trait]
pub trait QueueSink: Send + Sync {
    async fn lpush(&self, key: &str, payload: String) -> Result<(), String>;
}

pub struct RedisQueueSink {
    client: redis::Client,
}

impl RedisQueueSink {
    pub fn new(redis_url: &str) -> Result<Self, String> {
        let client = redis::Client::open(redis_url).map_err(|e| e.to_string())?;
        Ok(Self { client })
    }
}

#[async_trait]
impl QueueSink for RedisQueueSink {
    async fn lpush(&self, key: &str, payload: String) -> Result<(), String> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| e.to_string())?;
        conn.lpush::<_, _, ()>(key, payload)
            .await
            .map_err(|e| e.to_string())
    }
}

/// Serializes an event and left-pushes it onto its priority's queue.
///
/// Serialization errors indicate a programming error and are returned as
/// [`JudgeError::EmitSerializationError`]; backend failures (connection,
/// protocol) come back as [`JudgeError::QueueBackendError`] — both are
/// logged by the caller per their `disposition()` and never retried within
/// the turn (spec §4.F: the next alert for the same identity re-triggers
/// emission, governed by the state machine, not by the emitter retrying).
pub struct EventEmitter<S: QueueSink> {
    sink: S,
    queue_pattern: String,
}

impl<S: QueueSink> EventEmitter<S> {
    pub fn new(sink: S, queue_pattern: String) -> Self {
        Self { sink, queue_pattern }
    }

    pub async fn emit(&self, event: &Event) -> Result<(), JudgeError> {
        let payload = serde_json::to_string(event)
            .map_err(|e| JudgeError::EmitSerializationError(e.to_string()))?;
        let key = Priority(event.priority).queue_key(&self.queue_pattern);
        self.sink
            .lpush(&key, payload)
            .await
            .map_err(JudgeError::QueueBackendError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use judge_core::{Status, Tags};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        pushed: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl QueueSink for RecordingSink {
        async fn lpush(&self, key: &str, payload: String) -> Result<(), String> {
            self.pushed
                .lock()
                .unwrap()
                .push((key.to_string(), payload));
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl QueueSink for FailingSink {
        async fn lpush(&self, _key: &str, _payload: String) -> Result<(), String> {
            Err("connection refused".to_string())
        }
    }

    fn event(priority: i64) -> Event {
        Event {
            id: "s_1_fp".to_string(),
            strategy_id: 1,
            endpoint: "host1".to_string(),
            left_value: 11.0,
            event_time: 1000,
            status: Status::Problem,
            current_step: 1,
            pushed_tags: Tags::new(),
            priority,
        }
    }

    #[tokio::test]
    async fn emits_to_the_priority_templated_key() {
        let emitter = EventEmitter::new(RecordingSink::default(), "event:p%d".to_string());
        emitter.emit(&event(2)).await.unwrap();
        let pushed = emitter.sink.pushed.lock().unwrap();
        assert_eq!(pushed.len(), 1);
        assert_eq!(pushed[0].0, "event:p2");
        assert!(pushed[0].1.contains("\"Id\":\"s_1_fp\""));
    }

    #[tokio::test]
    async fn backend_failure_surfaces_as_queue_backend_error() {
        let emitter = EventEmitter::new(FailingSink, "event:p%d".to_string());
        let err = emitter.emit(&event(0)).await.unwrap_err();
        assert!(matches!(err, JudgeError::QueueBackendError(_)));
    }
}
