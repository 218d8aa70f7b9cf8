//! `message_outbox` table entity.

use sea_orm::entity::prelude::*;

use crate::domain::{OutboxEntry, OutboxStatus};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "message_outbox")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub message_id: Uuid,
    pub topic: String,
    #[sea_orm(column_type = "Text")]
    pub payload: String,
    pub status: String,
    pub attempts: i32,
    #[sea_orm(column_type = "Text", nullable)]
    pub last_error: Option<String>,
    /// Unix epoch milliseconds
    pub next_attempt_at: i64,
    pub created_at: DateTimeUtc,
    pub published_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for OutboxEntry {
    type Error = DbErr;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let status = model
            .status
            .parse::<OutboxStatus>()
            .map_err(DbErr::Custom)?;

        Ok(Self {
            id: model.id,
            message_id: model.message_id,
            topic: model.topic,
            payload: model.payload,
            status,
            attempts: model.attempts,
            last_error: model.last_error,
            next_attempt_at: model.next_attempt_at,
            created_at: model.created_at,
            published_at: model.published_at,
        })
    }
}

impl From<&OutboxEntry> for ActiveModel {
    fn from(entry: &OutboxEntry) -> Self {
        use sea_orm::Set;

        Self {
            id: Set(entry.id),
            message_id: Set(entry.message_id),
            topic: Set(entry.topic.clone()),
            payload: Set(entry.payload.clone()),
            status: Set(entry.status.as_str().to_string()),
            attempts: Set(entry.attempts),
            last_error: Set(entry.last_error.clone()),
            next_attempt_at: Set(entry.next_attempt_at),
            created_at: Set(entry.created_at),
            published_at: Set(entry.published_at),
        }
    }
}
