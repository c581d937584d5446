//! Create `message_history` table for edit history.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MessageHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MessageHistory::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MessageHistory::MessageId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MessageHistory::OldContent)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MessageHistory::EditedBy)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MessageHistory::EditedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_message_history_message")
                            .from(MessageHistory::Table, MessageHistory::MessageId)
                            .to(Message::Table, Message::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_message_history_editor")
                            .from(MessageHistory::Table, MessageHistory::EditedBy)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Per-message history lookup
        manager
            .create_index(
                Index::create()
                    .name("idx_message_history_message_id")
                    .table(MessageHistory::Table)
                    .col(MessageHistory::MessageId)
                    .to_owned(),
            )
            .await?;

        // Chronological ordering
        manager
            .create_index(
                Index::create()
                    .name("idx_message_history_edited_at")
                    .table(MessageHistory::Table)
                    .col(MessageHistory::EditedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_message_history_edited_by")
                    .table(MessageHistory::Table)
                    .col(MessageHistory::EditedBy)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MessageHistory::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum MessageHistory {
    Table,
    Id,
    MessageId,
    OldContent,
    EditedBy,
    EditedAt,
}

#[derive(Iden)]
enum Message {
    Table,
    Id,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
