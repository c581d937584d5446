//! Notification service.

use courier_common::{AppResult, IdGenerator};
use courier_db::{
    entities::{message, notification},
    repositories::NotificationRepository,
};
use sea_orm::{ConnectionTrait, Set};

/// Notification service for business logic.
#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
    id_gen: IdGenerator,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub const fn new(notification_repo: NotificationRepository) -> Self {
        Self {
            notification_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Post-create hook: create the single notification for a newly
    /// persisted message.
    ///
    /// Runs on the caller's connection so the message write path can keep
    /// the pair atomic. A failure here propagates and fails the whole
    /// creation; there is no internal retry.
    pub async fn notify_message_received_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        message: &message::Model,
    ) -> AppResult<notification::Model> {
        let model = notification::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(message.receiver_id.clone()),
            message_id: Set(message.id.clone()),
            is_read: Set(false),
            created_at: Set(chrono::Utc::now().into()),
        };

        let notification = self.notification_repo.create_in(conn, model).await?;

        tracing::debug!(
            notification_id = %notification.id,
            user_id = %notification.user_id,
            message_id = %notification.message_id,
            "Notification created for new message"
        );

        Ok(notification)
    }

    /// Get notifications for a user, newest first.
    pub async fn get_notifications(
        &self,
        user_id: &str,
        limit: u64,
        unread_only: bool,
    ) -> AppResult<Vec<notification::Model>> {
        self.notification_repo
            .find_by_user(user_id, limit, unread_only)
            .await
    }

    /// Mark a notification as read.
    pub async fn mark_as_read(&self, user_id: &str, notification_id: &str) -> AppResult<()> {
        // Verify the notification belongs to the user
        let notification = self.notification_repo.find_by_id(notification_id).await?;
        if let Some(n) = notification
            && n.user_id == user_id
        {
            self.notification_repo.mark_as_read(notification_id).await?;
        }
        Ok(())
    }

    /// Mark all notifications as read for a user.
    pub async fn mark_all_as_read(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.mark_all_as_read(user_id).await
    }

    /// Count unread notifications for a user.
    pub async fn count_unread(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.count_unread(user_id).await
    }
}
