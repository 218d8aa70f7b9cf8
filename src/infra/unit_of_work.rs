//! Unit of Work pattern implementation.
//!
//! The Unit of Work:
//! - Centralizes access to all repositories
//! - Manages database transactions (begin, commit, rollback)
//! - Lets a message and its outbox entry commit atomically
//! - Gives the relay a transaction in which claimed rows stay locked

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, LockBehavior, LockType};
use sea_orm::{
    AccessMode, ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, IsolationLevel, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use std::sync::Arc;
use uuid::Uuid;

use super::repositories::entities::message::{self, ActiveModel as MessageActiveModel, Entity as MessageEntity};
use super::repositories::entities::outbox_entry::{
    self, ActiveModel as OutboxActiveModel, Entity as OutboxEntity,
};
use super::repositories::{MessageRepository, MessageStore, OutboxRepository, OutboxStore};
use crate::domain::{Message, OutboxEntry, OutboxStatus, RetryDecision};
use crate::errors::{AppError, AppResult};

/// Unit of Work trait for dependency injection.
///
/// Not object-safe because of the generic transaction methods; services
/// take it as a type parameter instead.
#[async_trait]
pub trait UnitOfWork: Send + Sync + 'static {
    /// Get message repository
    fn messages(&self) -> Arc<dyn MessageRepository>;

    /// Get outbox repository
    fn outbox(&self) -> Arc<dyn OutboxRepository>;

    /// Execute a closure within a transaction.
    ///
    /// The transaction is committed on success or rolled back on error.
    /// Uses ReadCommitted isolation.
    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> std::pin::Pin<
                Box<dyn std::future::Future<Output = AppResult<T>> + Send + 'a>,
            > + Send,
        T: Send;
}

/// Transaction context providing repository access within a transaction.
///
/// All repository operations performed through this context are part
/// of the same database transaction.
pub struct TransactionContext<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TransactionContext<'a> {
    fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    /// Get message repository for this transaction
    pub fn messages(&self) -> TxMessageRepository<'_> {
        TxMessageRepository { txn: self.txn }
    }

    /// Get outbox repository for this transaction
    pub fn outbox(&self) -> TxOutboxRepository<'_> {
        TxOutboxRepository { txn: self.txn }
    }
}

/// Concrete implementation of UnitOfWork
pub struct Persistence {
    db: DatabaseConnection,
    message_repo: Arc<MessageStore>,
    outbox_repo: Arc<OutboxStore>,
}

impl Persistence {
    pub fn new(db: DatabaseConnection) -> Self {
        let message_repo = Arc::new(MessageStore::new(db.clone()));
        let outbox_repo = Arc::new(OutboxStore::new(db.clone()));
        Self {
            db,
            message_repo,
            outbox_repo,
        }
    }
}

#[async_trait]
impl UnitOfWork for Persistence {
    fn messages(&self) -> Arc<dyn MessageRepository> {
        self.message_repo.clone()
    }

    fn outbox(&self) -> Arc<dyn OutboxRepository> {
        self.outbox_repo.clone()
    }

    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> std::pin::Pin<
                Box<dyn std::future::Future<Output = AppResult<T>> + Send + 'a>,
            > + Send,
        T: Send,
    {
        let txn = self
            .db
            .begin_with_config(
                Some(IsolationLevel::ReadCommitted),
                Some(AccessMode::ReadWrite),
            )
            .await
            .map_err(AppError::from)?;

        let ctx = TransactionContext::new(&txn);

        match f(ctx).await {
            Ok(result) => {
                txn.commit().await.map_err(AppError::from)?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!("Transaction rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}

/// Transaction-bound message repository.
pub struct TxMessageRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TxMessageRepository<'a> {
    /// Insert a message row
    pub async fn insert(&self, message: &Message) -> AppResult<Message> {
        let model = MessageActiveModel::from(message).insert(self.txn).await?;
        Ok(Message::from(model))
    }

    /// Find the message stored under a client idempotency key
    pub async fn find_by_idempotency_key(&self, key: &str) -> AppResult<Option<Message>> {
        let model = MessageEntity::find()
            .filter(message::Column::IdempotencyKey.eq(key))
            .one(self.txn)
            .await?;
        Ok(model.map(Message::from))
    }
}

/// Transaction-bound outbox repository.
pub struct TxOutboxRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TxOutboxRepository<'a> {
    /// Record the intent to publish
    pub async fn enqueue(&self, entry: &OutboxEntry) -> AppResult<()> {
        OutboxActiveModel::from(entry).insert(self.txn).await?;
        Ok(())
    }

    /// Lock up to `limit` due pending entries, oldest first.
    ///
    /// Rows locked by another relay are skipped rather than waited on.
    pub async fn claim_due(&self, limit: u64, now: DateTime<Utc>) -> AppResult<Vec<OutboxEntry>> {
        let models = OutboxEntity::find()
            .filter(outbox_entry::Column::Status.eq(OutboxStatus::Pending.as_str()))
            .filter(outbox_entry::Column::NextAttemptAt.lte(now.timestamp_millis()))
            .order_by_asc(outbox_entry::Column::Id)
            .limit(limit)
            .lock_with_behavior(LockType::Update, LockBehavior::SkipLocked)
            .all(self.txn)
            .await?;

        Ok(models
            .into_iter()
            .map(OutboxEntry::try_from)
            .collect::<Result<_, _>>()?)
    }

    /// Mark an entry as delivered
    pub async fn mark_published(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        OutboxEntity::update_many()
            .col_expr(
                outbox_entry::Column::Status,
                Expr::value(OutboxStatus::Published.as_str()),
            )
            .col_expr(outbox_entry::Column::PublishedAt, Expr::value(at))
            .col_expr(outbox_entry::Column::LastError, Expr::value(Option::<String>::None))
            .filter(outbox_entry::Column::Id.eq(id))
            .exec(self.txn)
            .await?;
        Ok(())
    }

    /// Record a failed publish and either reschedule or dead-letter the entry
    pub async fn record_failure(
        &self,
        id: Uuid,
        attempts: i32,
        error: &str,
        decision: RetryDecision,
    ) -> AppResult<()> {
        let mut update = OutboxEntity::update_many()
            .col_expr(outbox_entry::Column::Attempts, Expr::value(attempts))
            .col_expr(outbox_entry::Column::LastError, Expr::value(error.to_string()));

        update = match decision {
            RetryDecision::RetryAt(at) => {
                update.col_expr(outbox_entry::Column::NextAttemptAt, Expr::value(at))
            }
            RetryDecision::DeadLetter => update.col_expr(
                outbox_entry::Column::Status,
                Expr::value(OutboxStatus::Dead.as_str()),
            ),
        };

        update
            .filter(outbox_entry::Column::Id.eq(id))
            .exec(self.txn)
            .await?;
        Ok(())
    }
}

/// Simpler API for executing transactional operations.
///
/// This helper macro reduces boilerplate when using transactions.
#[macro_export]
macro_rules! with_transaction {
    ($uow:expr, |$ctx:ident| $body:expr) => {
        $uow.transaction(|$ctx| Box::pin(async move { $body })).await
    };
}
