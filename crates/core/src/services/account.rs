//! Account service: user deletion and its cascade cleanup hook.

use std::collections::HashSet;
use std::sync::Arc;

use courier_common::{AppError, AppResult};
use courier_db::repositories::{
    MessageHistoryRepository, MessageRepository, NotificationRepository, UserRepository,
};
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};

/// Audit record of what a user deletion removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    /// Deleted user's ID.
    pub user_id: String,
    /// Deleted user's username.
    pub username: String,
    /// Messages the user sent.
    pub sent_messages: u64,
    /// Messages the user received.
    pub received_messages: u64,
    /// Total message rows removed, thread replies included.
    pub messages_deleted: u64,
    /// Notification rows removed.
    pub notifications_deleted: u64,
    /// History rows removed.
    pub history_deleted: u64,
}

/// Account service.
#[derive(Clone)]
pub struct AccountService {
    db: Arc<DatabaseConnection>,
    user_repo: UserRepository,
    message_repo: MessageRepository,
    notification_repo: NotificationRepository,
    history_repo: MessageHistoryRepository,
}

impl AccountService {
    /// Create a new account service.
    #[must_use]
    pub const fn new(
        db: Arc<DatabaseConnection>,
        user_repo: UserRepository,
        message_repo: MessageRepository,
        notification_repo: NotificationRepository,
        history_repo: MessageHistoryRepository,
    ) -> Self {
        Self {
            db,
            user_repo,
            message_repo,
            notification_repo,
            history_repo,
        }
    }

    /// Delete a user and every row that references them.
    ///
    /// Post-delete hook, run as explicit deletion in dependency order
    /// inside one transaction: history, then notifications, then messages
    /// (the user's own plus all reply descendants), then the user row.
    /// After commit, no Message references the user as sender or receiver,
    /// no Notification as owner, and no MessageHistory as editor; other
    /// users' unrelated data is untouched. A mid-way failure rolls the
    /// transaction back and surfaces as [`AppError::PartialCleanup`].
    pub async fn delete_user(&self, user_id: &str) -> AppResult<CleanupReport> {
        let user = self.user_repo.get_by_id(user_id).await?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let report = match self.cleanup_in(&txn, user_id, &user.username).await {
            Ok(report) => report,
            Err(err) => {
                // Explicit rollback; dropping the transaction would do the
                // same, but the audit trail should say so.
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!(
                        user_id = %user_id,
                        error = %rollback_err,
                        "Rollback failed after cleanup error"
                    );
                }
                return Err(err);
            }
        };

        txn.commit().await.map_err(|e| AppError::PartialCleanup {
            user_id: user_id.to_string(),
            phase: "commit",
            detail: e.to_string(),
        })?;

        tracing::info!(
            user_id = %report.user_id,
            username = %report.username,
            sent_messages = report.sent_messages,
            received_messages = report.received_messages,
            messages_deleted = report.messages_deleted,
            notifications_deleted = report.notifications_deleted,
            history_deleted = report.history_deleted,
            "User and all related data cleaned up"
        );

        Ok(report)
    }

    async fn cleanup_in(
        &self,
        txn: &DatabaseTransaction,
        user_id: &str,
        username: &str,
    ) -> AppResult<CleanupReport> {
        let cleanup_error = |phase: &'static str| {
            let user_id = user_id.to_string();
            move |e: AppError| AppError::PartialCleanup {
                user_id,
                phase,
                detail: e.to_string(),
            }
        };

        // The user's own messages plus every reply reachable below them.
        // The walk tracks visited IDs so a malformed parent cycle in the
        // data cannot loop.
        let direct = self
            .message_repo
            .find_by_participant_in(txn, user_id)
            .await
            .map_err(cleanup_error("collect"))?;

        let sent_messages = direct.iter().filter(|m| m.sender_id == user_id).count() as u64;
        let received_messages = direct.iter().filter(|m| m.receiver_id == user_id).count() as u64;

        let mut doomed: HashSet<String> = direct.into_iter().map(|m| m.id).collect();
        let mut frontier: Vec<String> = doomed.iter().cloned().collect();
        while !frontier.is_empty() {
            let children = self
                .message_repo
                .find_children_in(txn, &frontier)
                .await
                .map_err(cleanup_error("collect"))?;
            frontier = Vec::new();
            for child in children {
                if doomed.insert(child.id.clone()) {
                    frontier.push(child.id);
                }
            }
        }
        let doomed: Vec<String> = doomed.into_iter().collect();

        // Audit counts before anything is removed, mirroring what the
        // deletion log should show for manual remediation.
        let notifications_owned = self
            .notification_repo
            .count_for_user_in(txn, user_id)
            .await
            .map_err(cleanup_error("audit"))?;
        let edits_made = self
            .history_repo
            .count_by_editor_in(txn, user_id)
            .await
            .map_err(cleanup_error("audit"))?;
        tracing::info!(
            user_id = %user_id,
            username = %username,
            sent_messages,
            received_messages,
            notifications = notifications_owned,
            message_edits = edits_made,
            "Starting user deletion cleanup"
        );

        // History first: rows hang off both messages and the editing user.
        let mut history_deleted = self
            .history_repo
            .delete_by_message_ids_in(txn, &doomed)
            .await
            .map_err(cleanup_error("history"))?;
        history_deleted += self
            .history_repo
            .delete_by_editor_in(txn, user_id)
            .await
            .map_err(cleanup_error("history"))?;

        let mut notifications_deleted = self
            .notification_repo
            .delete_by_message_ids_in(txn, &doomed)
            .await
            .map_err(cleanup_error("notifications"))?;
        notifications_deleted += self
            .notification_repo
            .delete_for_user_in(txn, user_id)
            .await
            .map_err(cleanup_error("notifications"))?;

        let messages_deleted = self
            .message_repo
            .delete_many_in(txn, &doomed)
            .await
            .map_err(cleanup_error("messages"))?;

        self.user_repo
            .delete_in(txn, user_id)
            .await
            .map_err(cleanup_error("user"))?;

        Ok(CleanupReport {
            user_id: user_id.to_string(),
            username: username.to_string(),
            sent_messages,
            received_messages,
            messages_deleted,
            notifications_deleted,
            history_deleted,
        })
    }
}
