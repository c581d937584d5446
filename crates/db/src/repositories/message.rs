//! Message repository.

use std::sync::Arc;

use crate::entities::{Message, message};
use courier_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

/// Repository for message operations.
#[derive(Clone)]
pub struct MessageRepository {
    db: Arc<DatabaseConnection>,
}

impl MessageRepository {
    /// Create a new message repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a message by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<message::Model>> {
        Message::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a message by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<message::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::MessageNotFound(id.to_string()))
    }

    /// Find a message by ID on a specific connection (for transactional paths).
    pub async fn find_by_id_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<Option<message::Model>> {
        Message::find_by_id(id)
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a new message on a specific connection.
    pub async fn create_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: message::ActiveModel,
    ) -> AppResult<message::Model> {
        model.insert(conn).await.map_err(super::write_err)
    }

    /// Update a message on a specific connection.
    pub async fn update_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: message::ActiveModel,
    ) -> AppResult<message::Model> {
        model.update(conn).await.map_err(super::write_err)
    }

    /// Unread messages for a receiver, newest first.
    pub async fn find_unread_for_receiver(&self, user_id: &str) -> AppResult<Vec<message::Model>> {
        Message::find()
            .filter(message::Column::ReceiverId.eq(user_id))
            .filter(message::Column::IsRead.eq(false))
            .order_by_desc(message::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count unread messages for a receiver.
    pub async fn count_unread(&self, user_id: &str) -> AppResult<u64> {
        Message::find()
            .filter(message::Column::ReceiverId.eq(user_id))
            .filter(message::Column::IsRead.eq(false))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark a single message as read.
    pub async fn mark_as_read(&self, id: &str) -> AppResult<message::Model> {
        let message = self.get_by_id(id).await?;
        if message.is_read {
            return Ok(message);
        }
        let mut active: message::ActiveModel = message.into();
        active.is_read = Set(true);
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find messages in a conversation between two users, newest first.
    pub async fn find_conversation(
        &self,
        user_id: &str,
        partner_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<message::Model>> {
        let mut query = Message::find()
            .filter(
                // Messages sent by user to partner OR messages sent by partner to user
                Condition::any()
                    .add(
                        Condition::all()
                            .add(message::Column::SenderId.eq(user_id))
                            .add(message::Column::ReceiverId.eq(partner_id)),
                    )
                    .add(
                        Condition::all()
                            .add(message::Column::SenderId.eq(partner_id))
                            .add(message::Column::ReceiverId.eq(user_id)),
                    ),
            )
            .order_by_desc(message::Column::CreatedAt);

        if let Some(until) = until_id
            && let Some(until_msg) = self.find_by_id(until).await?
        {
            query = query.filter(message::Column::CreatedAt.lt(until_msg.created_at));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Immediate replies to a set of messages, oldest first.
    pub async fn find_children(&self, parent_ids: &[String]) -> AppResult<Vec<message::Model>> {
        self.find_children_in(self.db.as_ref(), parent_ids).await
    }

    /// Immediate replies to a set of messages on a specific connection.
    pub async fn find_children_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        parent_ids: &[String],
    ) -> AppResult<Vec<message::Model>> {
        if parent_ids.is_empty() {
            return Ok(Vec::new());
        }
        Message::find()
            .filter(message::Column::ParentId.is_in(parent_ids.iter().map(String::as_str)))
            .order_by_asc(message::Column::CreatedAt)
            .all(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All messages a user participates in (as sender or receiver), on a
    /// specific connection.
    pub async fn find_by_participant_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: &str,
    ) -> AppResult<Vec<message::Model>> {
        Message::find()
            .filter(
                Condition::any()
                    .add(message::Column::SenderId.eq(user_id))
                    .add(message::Column::ReceiverId.eq(user_id)),
            )
            .all(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a set of messages on a specific connection.
    pub async fn delete_many_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        ids: &[String],
    ) -> AppResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = Message::delete_many()
            .filter(message::Column::Id.is_in(ids.iter().map(String::as_str)))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }
}
