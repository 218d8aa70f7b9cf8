//! Message repository - message persistence outside explicit transactions.
//!
//! Outbox-mode writes go through [`crate::infra::TransactionContext`] so
//! that a message and its outbox entry share one transaction.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
};
use uuid::Uuid;

use super::entities::message::{self, ActiveModel as MessageActiveModel, Entity as MessageEntity};
use crate::domain::Message;
use crate::errors::AppResult;

/// Message repository trait for dependency injection.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Insert a message outside any explicit transaction
    async fn insert(&self, message: &Message) -> AppResult<Message>;

    /// Find message by ID
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Message>>;

    /// Find the message stored under a client idempotency key
    async fn find_by_idempotency_key(&self, key: &str) -> AppResult<Option<Message>>;

    /// Count stored messages
    async fn count(&self) -> AppResult<u64>;
}

/// SeaORM-backed message repository
pub struct MessageStore {
    db: DatabaseConnection,
}

impl MessageStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MessageRepository for MessageStore {
    async fn insert(&self, message: &Message) -> AppResult<Message> {
        let model = MessageActiveModel::from(message).insert(&self.db).await?;
        Ok(Message::from(model))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Message>> {
        let model = MessageEntity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Message::from))
    }

    async fn find_by_idempotency_key(&self, key: &str) -> AppResult<Option<Message>> {
        let model = MessageEntity::find()
            .filter(message::Column::IdempotencyKey.eq(key))
            .one(&self.db)
            .await?;
        Ok(model.map(Message::from))
    }

    async fn count(&self) -> AppResult<u64> {
        Ok(MessageEntity::find().count(&self.db).await?)
    }
}
