//! Outbox repository - inspection and operator maintenance.
//!
//! The relay's claim/publish/update cycle runs inside a transaction and
//! lives on [`crate::infra::unit_of_work::TxOutboxRepository`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::entities::outbox_entry::{self, Entity as OutboxEntity};
use crate::domain::{OutboxEntry, OutboxStatus};
use crate::errors::AppResult;

/// Outbox repository trait for dependency injection.
#[async_trait]
pub trait OutboxRepository: Send + Sync {
    /// Entries recorded for a message
    async fn find_by_message_id(&self, message_id: Uuid) -> AppResult<Vec<OutboxEntry>>;

    /// Oldest-first entries with the given status
    async fn list_by_status(&self, status: OutboxStatus, limit: u64) -> AppResult<Vec<OutboxEntry>>;

    /// Number of entries per status; statuses with no entries are omitted
    async fn count_by_status(&self) -> AppResult<BTreeMap<String, i64>>;

    /// Move dead entries back to pending with a fresh retry budget
    async fn requeue_dead(&self) -> AppResult<u64>;

    /// Delete entries published before `cutoff`
    async fn purge_published_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64>;
}

/// SeaORM-backed outbox repository
pub struct OutboxStore {
    db: DatabaseConnection,
}

impl OutboxStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OutboxRepository for OutboxStore {
    async fn find_by_message_id(&self, message_id: Uuid) -> AppResult<Vec<OutboxEntry>> {
        let models = OutboxEntity::find()
            .filter(outbox_entry::Column::MessageId.eq(message_id))
            .order_by_asc(outbox_entry::Column::Id)
            .all(&self.db)
            .await?;

        Ok(models
            .into_iter()
            .map(OutboxEntry::try_from)
            .collect::<Result<_, _>>()?)
    }

    async fn list_by_status(&self, status: OutboxStatus, limit: u64) -> AppResult<Vec<OutboxEntry>> {
        let models = OutboxEntity::find()
            .filter(outbox_entry::Column::Status.eq(status.as_str()))
            .order_by_asc(outbox_entry::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?;

        Ok(models
            .into_iter()
            .map(OutboxEntry::try_from)
            .collect::<Result<_, _>>()?)
    }

    async fn count_by_status(&self) -> AppResult<BTreeMap<String, i64>> {
        let rows: Vec<(String, i64)> = OutboxEntity::find()
            .select_only()
            .column(outbox_entry::Column::Status)
            .column_as(outbox_entry::Column::Id.count(), "count")
            .group_by(outbox_entry::Column::Status)
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(rows.into_iter().collect())
    }

    async fn requeue_dead(&self) -> AppResult<u64> {
        let result = OutboxEntity::update_many()
            .col_expr(
                outbox_entry::Column::Status,
                Expr::value(OutboxStatus::Pending.as_str()),
            )
            .col_expr(outbox_entry::Column::Attempts, Expr::value(0))
            .col_expr(
                outbox_entry::Column::NextAttemptAt,
                Expr::value(Utc::now().timestamp_millis()),
            )
            .filter(outbox_entry::Column::Status.eq(OutboxStatus::Dead.as_str()))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }

    async fn purge_published_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let result = OutboxEntity::delete_many()
            .filter(outbox_entry::Column::Status.eq(OutboxStatus::Published.as_str()))
            .filter(outbox_entry::Column::PublishedAt.lt(cutoff))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }
}
