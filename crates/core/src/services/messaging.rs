//! Messaging service: the message write path and its lifecycle hooks.

use std::collections::HashSet;

use crate::services::notification::NotificationService;
use chrono::Utc;
use courier_common::{AppError, AppResult, IdGenerator};
use courier_db::{
    entities::{message, message_history},
    repositories::{MessageHistoryRepository, MessageRepository, UserRepository},
};
use sea_orm::{DatabaseConnection, Set, TransactionTrait};
use std::sync::Arc;
use validator::Validate;

/// Input for creating a new message.
#[derive(Debug, Clone, Validate)]
pub struct CreateMessageInput {
    /// Message text; must be non-empty.
    #[validate(length(min = 1, message = "content must not be empty"))]
    pub content: String,
    /// Optional parent message for threaded replies.
    pub parent_id: Option<String>,
}

/// Input for editing a message's content.
#[derive(Debug, Clone, Validate)]
pub struct UpdateMessageInput {
    /// Replacement text; must be non-empty.
    #[validate(length(min = 1, message = "content must not be empty"))]
    pub content: String,
}

/// Messaging service.
#[derive(Clone)]
pub struct MessagingService {
    db: Arc<DatabaseConnection>,
    message_repo: MessageRepository,
    history_repo: MessageHistoryRepository,
    user_repo: UserRepository,
    notification_service: NotificationService,
    id_gen: IdGenerator,
}

impl MessagingService {
    /// Create a new messaging service.
    #[must_use]
    pub const fn new(
        db: Arc<DatabaseConnection>,
        message_repo: MessageRepository,
        history_repo: MessageHistoryRepository,
        user_repo: UserRepository,
        notification_service: NotificationService,
    ) -> Self {
        Self {
            db,
            message_repo,
            history_repo,
            user_repo,
            notification_service,
            id_gen: IdGenerator::new(),
        }
    }

    /// Send a message to another user.
    ///
    /// The message insert and the receiver's notification commit together;
    /// if the notification cannot be created the whole operation fails.
    pub async fn send_message(
        &self,
        sender_id: &str,
        receiver_id: &str,
        input: CreateMessageInput,
    ) -> AppResult<message::Model> {
        input.validate()?;

        let _sender = self.user_repo.get_by_id(sender_id).await?;
        let _receiver = self.user_repo.get_by_id(receiver_id).await?;

        if let Some(ref parent_id) = input.parent_id {
            let _parent = self.message_repo.get_by_id(parent_id).await?;
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let model = message::ActiveModel {
            id: Set(self.id_gen.generate()),
            sender_id: Set(sender_id.to_string()),
            receiver_id: Set(receiver_id.to_string()),
            content: Set(input.content),
            parent_id: Set(input.parent_id),
            edited: Set(false),
            is_read: Set(false),
            created_at: Set(Utc::now().into()),
        };

        let message = self.message_repo.create_in(&txn, model).await?;

        // Post-create hook: exactly one notification for the receiver.
        self.notification_service
            .notify_message_received_in(&txn, &message)
            .await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::debug!(
            message_id = %message.id,
            sender_id = %message.sender_id,
            receiver_id = %message.receiver_id,
            "Message sent"
        );

        Ok(message)
    }

    /// Edit a message's content.
    ///
    /// Pre-update hook: when the new content differs from the stored
    /// content, a history record carrying the pre-update content is
    /// inserted in the same transaction that persists the new content and
    /// the `edited` flag. An identical-content edit is a no-op.
    pub async fn update_content(
        &self,
        message_id: &str,
        editor_id: &str,
        input: UpdateMessageInput,
    ) -> AppResult<message::Model> {
        input.validate()?;

        let _editor = self.user_repo.get_by_id(editor_id).await?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let stored = self
            .message_repo
            .find_by_id_in(&txn, message_id)
            .await?
            .ok_or_else(|| AppError::MessageNotFound(message_id.to_string()))?;

        if stored.content == input.content {
            txn.commit()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            return Ok(stored);
        }

        let history = message_history::ActiveModel {
            id: Set(self.id_gen.generate()),
            message_id: Set(stored.id.clone()),
            old_content: Set(stored.content.clone()),
            edited_by: Set(editor_id.to_string()),
            edited_at: Set(Utc::now().into()),
        };
        self.history_repo.create_in(&txn, history).await?;

        let mut active: message::ActiveModel = stored.into();
        active.content = Set(input.content);
        active.edited = Set(true);
        let updated = self.message_repo.update_in(&txn, active).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(
            message_id = %updated.id,
            editor_id = %editor_id,
            "Message content edited"
        );

        Ok(updated)
    }

    /// Get a message by ID.
    pub async fn get_message(&self, message_id: &str) -> AppResult<Option<message::Model>> {
        self.message_repo.find_by_id(message_id).await
    }

    /// Unread messages for a user, newest first.
    pub async fn list_unread(&self, user_id: &str) -> AppResult<Vec<message::Model>> {
        let _user = self.user_repo.get_by_id(user_id).await?;
        self.message_repo.find_unread_for_receiver(user_id).await
    }

    /// Count unread messages for a user.
    pub async fn count_unread(&self, user_id: &str) -> AppResult<u64> {
        self.message_repo.count_unread(user_id).await
    }

    /// Mark a single message as read.
    pub async fn mark_read(&self, message_id: &str) -> AppResult<message::Model> {
        self.message_repo.mark_as_read(message_id).await
    }

    /// Messages in a conversation between two users, newest first.
    pub async fn get_conversation(
        &self,
        user_id: &str,
        partner_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<message::Model>> {
        self.message_repo
            .find_conversation(user_id, partner_id, limit, until_id)
            .await
    }

    /// Full thread containing a message, ordered by depth then creation
    /// time.
    ///
    /// The parent chain is data and may be malformed; both the walk up to
    /// the root and the walk down over replies track visited IDs and stop
    /// on a repeat, so a parent cycle cannot cause non-termination. Any
    /// starting message within a thread yields the same set.
    pub async fn get_thread(&self, message_id: &str) -> AppResult<Vec<message::Model>> {
        let start = self.message_repo.get_by_id(message_id).await?;

        // Walk up to the thread root.
        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(start.id.clone());
        let mut root = start;
        while let Some(parent_id) = root.parent_id.clone() {
            if !seen.insert(parent_id.clone()) {
                // Parent cycle; treat the last sound node as the root.
                break;
            }
            match self.message_repo.find_by_id(&parent_id).await? {
                Some(parent) => root = parent,
                // Dangling parent pointer; the subtree below is the thread.
                None => break,
            }
        }

        // Breadth-first over replies, depth by depth. Children of one
        // level come back ordered by creation time.
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(root.id.clone());
        let mut thread = vec![root];
        let mut frontier: Vec<String> = vec![thread[0].id.clone()];

        while !frontier.is_empty() {
            let children = self.message_repo.find_children(&frontier).await?;
            frontier = Vec::new();
            for child in children {
                if visited.insert(child.id.clone()) {
                    frontier.push(child.id.clone());
                    thread.push(child);
                }
            }
        }

        Ok(thread)
    }

    /// Edit history for a message, most recent first.
    pub async fn get_history(
        &self,
        message_id: &str,
    ) -> AppResult<Vec<message_history::Model>> {
        let _message = self.message_repo.get_by_id(message_id).await?;
        self.history_repo.find_by_message(message_id).await
    }

    /// Count edits for a message.
    pub async fn count_edits(&self, message_id: &str) -> AppResult<u64> {
        self.history_repo.count_by_message(message_id).await
    }

    /// Check if a message has been edited.
    pub async fn is_edited(&self, message_id: &str) -> AppResult<bool> {
        let count = self.history_repo.count_by_message(message_id).await?;
        Ok(count > 0)
    }
}
