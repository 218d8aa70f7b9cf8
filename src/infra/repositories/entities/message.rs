//! `messages` table entity.

use sea_orm::entity::prelude::*;

use crate::domain::Message;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "messages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    #[sea_orm(unique)]
    pub idempotency_key: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Message {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            content: model.content,
            idempotency_key: model.idempotency_key,
            created_at: model.created_at,
        }
    }
}

impl From<&Message> for ActiveModel {
    fn from(message: &Message) -> Self {
        use sea_orm::Set;

        Self {
            id: Set(message.id),
            content: Set(message.content.clone()),
            idempotency_key: Set(message.idempotency_key.clone()),
            created_at: Set(message.created_at),
        }
    }
}
