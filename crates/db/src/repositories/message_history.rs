//! Message edit history repository.

use std::sync::Arc;

use crate::entities::{MessageHistory, message_history};
use courier_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder,
};

/// Repository for message edit history.
#[derive(Clone)]
pub struct MessageHistoryRepository {
    db: Arc<DatabaseConnection>,
}

impl MessageHistoryRepository {
    /// Create a new message history repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert a history record on a specific connection.
    ///
    /// The edit path inserts the record in the same transaction that
    /// persists the new content, so `edited = true` is never observable
    /// without the matching row.
    pub async fn create_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: message_history::ActiveModel,
    ) -> AppResult<message_history::Model> {
        model.insert(conn).await.map_err(super::write_err)
    }

    /// Edit history for a message, most recent first.
    pub async fn find_by_message(
        &self,
        message_id: &str,
    ) -> AppResult<Vec<message_history::Model>> {
        MessageHistory::find()
            .filter(message_history::Column::MessageId.eq(message_id))
            .order_by_desc(message_history::Column::EditedAt)
            .order_by_desc(message_history::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count history rows for a message.
    pub async fn count_by_message(&self, message_id: &str) -> AppResult<u64> {
        MessageHistory::find()
            .filter(message_history::Column::MessageId.eq(message_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count history rows written by an editor, on a specific connection.
    pub async fn count_by_editor_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: &str,
    ) -> AppResult<u64> {
        MessageHistory::find()
            .filter(message_history::Column::EditedBy.eq(user_id))
            .count(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete history rows written by an editor, on a specific connection.
    pub async fn delete_by_editor_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: &str,
    ) -> AppResult<u64> {
        let result = MessageHistory::delete_many()
            .filter(message_history::Column::EditedBy.eq(user_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Delete history rows attached to a set of messages, on a specific
    /// connection.
    pub async fn delete_by_message_ids_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        message_ids: &[String],
    ) -> AppResult<u64> {
        if message_ids.is_empty() {
            return Ok(0);
        }
        let result = MessageHistory::delete_many()
            .filter(
                message_history::Column::MessageId.is_in(message_ids.iter().map(String::as_str)),
            )
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }
}
