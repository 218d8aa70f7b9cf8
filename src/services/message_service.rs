//! Message intake - persist a submitted message and get it to Kafka.
//!
//! Two strategies implement [`MessageService`]:
//! - [`OutboxDelivery`] writes the message and an outbox entry in one
//!   transaction; the relay publishes later.
//! - [`DirectDelivery`] inserts and then publishes in the request path.
//!   A failed publish leaves the committed row without a record on the
//!   topic.

use async_trait::async_trait;
use sea_orm::SqlErr;
use std::sync::Arc;

use crate::config::DeliveryMode;
use crate::domain::{Accepted, Message, OutboxEntry, Submission};
use crate::errors::{AppError, AppResult};
use crate::infra::{MessagePublisher, OutboundRecord, UnitOfWork};

/// Message intake trait for dependency injection.
#[async_trait]
pub trait MessageService: Send + Sync {
    /// Delivery strategy this service implements
    fn mode(&self) -> DeliveryMode;

    /// Accept one message
    async fn accept(&self, submission: Submission) -> AppResult<Accepted>;
}

/// Insert, then publish synchronously.
pub struct DirectDelivery<U: UnitOfWork> {
    uow: Arc<U>,
    publisher: Arc<dyn MessagePublisher>,
}

impl<U: UnitOfWork> DirectDelivery<U> {
    pub fn new(uow: Arc<U>, publisher: Arc<dyn MessagePublisher>) -> Self {
        Self { uow, publisher }
    }
}

#[async_trait]
impl<U: UnitOfWork> MessageService for DirectDelivery<U> {
    fn mode(&self) -> DeliveryMode {
        DeliveryMode::Direct
    }

    async fn accept(&self, submission: Submission) -> AppResult<Accepted> {
        if submission.idempotency_key.is_some() {
            tracing::debug!("Idempotency key ignored in direct mode");
        }

        let message = Message::new(submission.content, None);
        let stored = self
            .uow
            .messages()
            .insert(&message)
            .await
            .map_err(AppError::into_persist)?;

        let delivery = self
            .publisher
            .publish(OutboundRecord::for_message(&stored))
            .await?;

        tracing::info!(
            message_id = %stored.id,
            partition = delivery.partition,
            offset = delivery.offset,
            "Message stored and published"
        );

        Ok(Accepted {
            message_id: stored.id,
            duplicate: false,
        })
    }
}

/// Insert the message and its outbox entry atomically.
pub struct OutboxDelivery<U: UnitOfWork> {
    uow: Arc<U>,
    topic: String,
}

impl<U: UnitOfWork> OutboxDelivery<U> {
    pub fn new(uow: Arc<U>, topic: impl Into<String>) -> Self {
        Self {
            uow,
            topic: topic.into(),
        }
    }

    async fn find_duplicate(&self, key: &str) -> AppResult<Option<Accepted>> {
        let existing = self.uow.messages().find_by_idempotency_key(key).await?;
        Ok(existing.map(|message| Accepted {
            message_id: message.id,
            duplicate: true,
        }))
    }

    /// Map a failed intake transaction to its answer.
    ///
    /// A unique violation on a keyed submission means a concurrent request
    /// with the same key committed first; its message is the answer.
    async fn resolve_failure(&self, err: AppError, key: Option<&str>) -> AppResult<Accepted> {
        let key = match key {
            Some(key) if is_unique_violation(&err) => key,
            _ => return Err(err.into_persist()),
        };

        match self.find_duplicate(key).await {
            Ok(Some(accepted)) => {
                tracing::info!(message_id = %accepted.message_id, "Lost idempotency race, returning stored message");
                Ok(accepted)
            }
            _ => Err(err.into_persist()),
        }
    }
}

#[async_trait]
impl<U: UnitOfWork> MessageService for OutboxDelivery<U> {
    fn mode(&self) -> DeliveryMode {
        DeliveryMode::Outbox
    }

    async fn accept(&self, submission: Submission) -> AppResult<Accepted> {
        let key = submission.idempotency_key.clone();
        let message = Message::new(submission.content, submission.idempotency_key);
        let topic = self.topic.clone();

        let result = crate::with_transaction!(self.uow, |ctx| {
            if let Some(key) = message.idempotency_key.as_deref() {
                if let Some(existing) = ctx.messages().find_by_idempotency_key(key).await? {
                    return Ok(Accepted {
                        message_id: existing.id,
                        duplicate: true,
                    });
                }
            }

            let stored = ctx.messages().insert(&message).await?;
            ctx.outbox()
                .enqueue(&OutboxEntry::pending_for(&stored, topic))
                .await?;

            Ok(Accepted {
                message_id: stored.id,
                duplicate: false,
            })
        });

        match result {
            Ok(accepted) => {
                if accepted.duplicate {
                    tracing::info!(message_id = %accepted.message_id, "Duplicate submission, returning stored message");
                } else {
                    tracing::info!(message_id = %accepted.message_id, "Message stored with outbox entry");
                }
                Ok(accepted)
            }
            Err(e) => self.resolve_failure(e, key.as_deref()).await,
        }
    }
}

fn is_unique_violation(err: &AppError) -> bool {
    match err {
        AppError::Database(e) => matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OutboxStatus;
    use crate::infra::db::testing::sqlite;
    use crate::infra::{Delivery, MockMessagePublisher, Persistence, PublishError};

    async fn persistence(migrate: bool) -> Arc<Persistence> {
        Arc::new(Persistence::new(sqlite(migrate).await.get_connection()))
    }

    #[tokio::test]
    async fn test_outbox_stores_message_and_pending_entry() {
        let uow = persistence(true).await;
        let service = OutboxDelivery::new(uow.clone(), "my-topic");

        let accepted = service.accept(Submission::new("hello")).await.unwrap();
        assert!(!accepted.duplicate);

        let stored = uow.messages().find_by_id(accepted.message_id).await.unwrap().unwrap();
        assert_eq!(stored.content, "hello");

        let entries = uow.outbox().find_by_message_id(accepted.message_id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, OutboxStatus::Pending);
        assert_eq!(entries[0].topic, "my-topic");
        assert_eq!(entries[0].payload, "hello");
        assert_eq!(entries[0].attempts, 0);
    }

    #[tokio::test]
    async fn test_outbox_returns_stored_message_for_repeated_key() {
        let uow = persistence(true).await;
        let service = OutboxDelivery::new(uow.clone(), "my-topic");

        let first = service
            .accept(Submission::new("hello").with_idempotency_key("abc"))
            .await
            .unwrap();
        let second = service
            .accept(Submission::new("hello again").with_idempotency_key("abc"))
            .await
            .unwrap();

        assert_eq!(first.message_id, second.message_id);
        assert!(second.duplicate);
        assert_eq!(uow.messages().count().await.unwrap(), 1);
        assert_eq!(uow.outbox().find_by_message_id(first.message_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_outbox_store_failure_is_persist_error() {
        let service = OutboxDelivery::new(persistence(false).await, "my-topic");

        let err = service.accept(Submission::new("hello")).await.unwrap_err();
        assert!(matches!(err, AppError::Persist(_)));
    }

    #[tokio::test]
    async fn test_outbox_lost_race_returns_winner() {
        let uow = persistence(true).await;
        let service = OutboxDelivery::new(uow.clone(), "my-topic");

        // The winner commits between the loser's lookup and insert
        let winner = uow
            .messages()
            .insert(&Message::new("first", Some("abc".to_string())))
            .await
            .unwrap();
        let err = uow
            .messages()
            .insert(&Message::new("second", Some("abc".to_string())))
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));

        let accepted = service.resolve_failure(err, Some("abc")).await.unwrap();
        assert_eq!(accepted.message_id, winner.id);
        assert!(accepted.duplicate);
        assert_eq!(uow.messages().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_outbox_unique_violation_without_key_is_persist_error() {
        let uow = persistence(true).await;
        let service = OutboxDelivery::new(uow.clone(), "my-topic");

        uow.messages()
            .insert(&Message::new("first", Some("abc".to_string())))
            .await
            .unwrap();
        let err = uow
            .messages()
            .insert(&Message::new("second", Some("abc".to_string())))
            .await
            .unwrap_err();

        let err = service.resolve_failure(err, None).await.unwrap_err();
        assert!(matches!(err, AppError::Persist(_)));
    }

    #[tokio::test]
    async fn test_direct_publishes_after_insert() {
        let uow = persistence(true).await;
        let mut publisher = MockMessagePublisher::new();
        publisher
            .expect_publish()
            .withf(|record| record.payload == b"hello" && record.headers.contains_key("message-id"))
            .times(1)
            .returning(|_| Ok(Delivery { partition: 0, offset: 7 }));

        let service = DirectDelivery::new(uow.clone(), Arc::new(publisher));
        let accepted = service.accept(Submission::new("hello")).await.unwrap();

        assert!(uow.messages().find_by_id(accepted.message_id).await.unwrap().is_some());
        assert!(uow.outbox().find_by_message_id(accepted.message_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_direct_publish_failure_keeps_row() {
        let uow = persistence(true).await;
        let mut publisher = MockMessagePublisher::new();
        publisher
            .expect_publish()
            .times(1)
            .returning(|_| Err(PublishError::Unavailable("connection refused".into())));

        let service = DirectDelivery::new(uow.clone(), Arc::new(publisher));
        let err = service.accept(Submission::new("hello")).await.unwrap_err();

        assert!(matches!(err, AppError::Publish(_)));
        assert_eq!(uow.messages().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_direct_store_failure_skips_publish() {
        let mut publisher = MockMessagePublisher::new();
        publisher.expect_publish().never();

        let service = DirectDelivery::new(persistence(false).await, Arc::new(publisher));
        let err = service.accept(Submission::new("hello")).await.unwrap_err();

        assert!(matches!(err, AppError::Persist(_)));
    }
}
