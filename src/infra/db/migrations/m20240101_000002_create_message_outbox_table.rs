//! Migration: Create the message outbox drained by the relay.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MessageOutbox::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MessageOutbox::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MessageOutbox::MessageId).uuid().not_null())
                    .col(ColumnDef::new(MessageOutbox::Topic).string_len(255).not_null())
                    .col(ColumnDef::new(MessageOutbox::Payload).text().not_null())
                    .col(
                        ColumnDef::new(MessageOutbox::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(MessageOutbox::Attempts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(MessageOutbox::LastError).text().null())
                    .col(
                        ColumnDef::new(MessageOutbox::NextAttemptAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MessageOutbox::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MessageOutbox::PublishedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_message_outbox_message_id")
                            .from(MessageOutbox::Table, MessageOutbox::MessageId)
                            .to(Messages::Table, Messages::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Relay claim query: WHERE status = 'pending' AND next_attempt_at <= now
        manager
            .create_index(
                Index::create()
                    .name("idx_message_outbox_status_next_attempt")
                    .table(MessageOutbox::Table)
                    .col(MessageOutbox::Status)
                    .col(MessageOutbox::NextAttemptAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MessageOutbox::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum MessageOutbox {
    Table,
    Id,
    MessageId,
    Topic,
    Payload,
    Status,
    Attempts,
    LastError,
    NextAttemptAt,
    CreatedAt,
    PublishedAt,
}

#[derive(Iden)]
enum Messages {
    Table,
    Id,
}
