//! End-to-end hook tests against a real database.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test hooks_integration -- --ignored`
//!
//! Environment variables are the same as for the `courier-db` integration
//! tests (`TEST_DB_HOST`, `TEST_DB_PORT`, ...).

#![allow(clippy::unwrap_used)]

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use courier_common::IdGenerator;
use courier_core::services::{
    AccountService, CreateMessageInput, MessagingService, NotificationService, UpdateMessageInput,
};
use courier_db::entities::user;
use courier_db::repositories::{
    MessageHistoryRepository, MessageRepository, NotificationRepository, UserRepository,
};
use courier_db::test_utils::TestDatabase;
use sea_orm::{Database, DatabaseConnection, Set};

struct Fixture {
    db: TestDatabase,
    conn: Arc<DatabaseConnection>,
    users: UserRepository,
    messaging: MessagingService,
    notifications: NotificationService,
    accounts: AccountService,
}

impl Fixture {
    async fn new() -> Self {
        let db = TestDatabase::create_unique().await.unwrap();
        let conn = Arc::new(Database::connect(&db.config.database_url()).await.unwrap());

        let users = UserRepository::new(conn.clone());
        let message_repo = MessageRepository::new(conn.clone());
        let history_repo = MessageHistoryRepository::new(conn.clone());
        let notification_repo = NotificationRepository::new(conn.clone());

        let notifications = NotificationService::new(notification_repo.clone());
        let messaging = MessagingService::new(
            conn.clone(),
            message_repo.clone(),
            history_repo.clone(),
            users.clone(),
            notifications.clone(),
        );
        let accounts = AccountService::new(
            conn.clone(),
            users.clone(),
            message_repo,
            notification_repo,
            history_repo,
        );

        Self {
            db,
            conn,
            users,
            messaging,
            notifications,
            accounts,
        }
    }

    async fn create_user(&self, username: &str) -> user::Model {
        let id_gen = IdGenerator::new();
        self.users
            .create(user::ActiveModel {
                id: Set(id_gen.generate()),
                username: Set(username.to_string()),
                username_lower: Set(username.to_lowercase()),
                name: Set(None),
                email: Set(None),
                created_at: Set(Utc::now().into()),
                updated_at: Set(None),
            })
            .await
            .unwrap()
    }

    async fn finish(self) {
        drop(self.conn);
        self.db.drop_database().await.unwrap();
    }
}

fn input(content: &str) -> CreateMessageInput {
    CreateMessageInput {
        content: content.to_string(),
        parent_id: None,
    }
}

fn reply(content: &str, parent_id: &str) -> CreateMessageInput {
    CreateMessageInput {
        content: content.to_string(),
        parent_id: Some(parent_id.to_string()),
    }
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_every_creation_yields_exactly_one_notification() {
    let fx = Fixture::new().await;
    let alice = fx.create_user("alice").await;
    let bob = fx.create_user("bob").await;

    let message = fx
        .messaging
        .send_message(&alice.id, &bob.id, input("Hello!"))
        .await
        .unwrap();

    let for_bob = fx.notifications.get_notifications(&bob.id, 10, false).await.unwrap();
    assert_eq!(for_bob.len(), 1);
    assert_eq!(for_bob[0].message_id, message.id);
    assert_eq!(for_bob[0].user_id, bob.id);
    assert!(!for_bob[0].is_read);

    // Updates never notify.
    fx.messaging
        .update_content(&message.id, &alice.id, UpdateMessageInput {
            content: "Hello, again!".to_string(),
        })
        .await
        .unwrap();
    let after_edit = fx.notifications.get_notifications(&bob.id, 10, false).await.unwrap();
    assert_eq!(after_edit.len(), 1);

    fx.finish().await;
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_edit_chain_preserves_prior_contents_in_order() {
    let fx = Fixture::new().await;
    let alice = fx.create_user("alice").await;
    let bob = fx.create_user("bob").await;

    let message = fx
        .messaging
        .send_message(&alice.id, &bob.id, input("v1"))
        .await
        .unwrap();
    assert!(!message.edited);
    assert_eq!(fx.messaging.count_edits(&message.id).await.unwrap(), 0);

    for new_content in ["v2", "v3", "v4"] {
        fx.messaging
            .update_content(&message.id, &alice.id, UpdateMessageInput {
                content: new_content.to_string(),
            })
            .await
            .unwrap();
    }

    let current = fx.messaging.get_message(&message.id).await.unwrap().unwrap();
    assert!(current.edited);
    assert_eq!(current.content, "v4");

    // Most recent first; the chain of old contents is v3, v2, v1.
    let history = fx.messaging.get_history(&message.id).await.unwrap();
    let olds: Vec<&str> = history.iter().map(|h| h.old_content.as_str()).collect();
    assert_eq!(olds, vec!["v3", "v2", "v1"]);
    assert!(history.iter().all(|h| h.edited_by == alice.id));
    assert!(fx.messaging.is_edited(&message.id).await.unwrap());

    fx.finish().await;
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_identical_content_edit_is_a_noop() {
    let fx = Fixture::new().await;
    let alice = fx.create_user("alice").await;
    let bob = fx.create_user("bob").await;

    let message = fx
        .messaging
        .send_message(&alice.id, &bob.id, input("same"))
        .await
        .unwrap();

    let updated = fx
        .messaging
        .update_content(&message.id, &alice.id, UpdateMessageInput {
            content: "same".to_string(),
        })
        .await
        .unwrap();

    assert!(!updated.edited);
    assert_eq!(fx.messaging.count_edits(&message.id).await.unwrap(), 0);

    fx.finish().await;
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_user_deletion_removes_all_references_and_spares_others() {
    let fx = Fixture::new().await;
    let alice = fx.create_user("alice").await;
    let bob = fx.create_user("bob").await;
    let carol = fx.create_user("carol").await;
    let dave = fx.create_user("dave").await;

    // Alice's world: a conversation with Bob, edited once.
    let a_to_b = fx
        .messaging
        .send_message(&alice.id, &bob.id, input("hi bob"))
        .await
        .unwrap();
    fx.messaging
        .send_message(&bob.id, &alice.id, input("hi alice"))
        .await
        .unwrap();
    fx.messaging
        .update_content(&a_to_b.id, &alice.id, UpdateMessageInput {
            content: "hi bob!".to_string(),
        })
        .await
        .unwrap();

    // Unrelated world: Carol and Dave.
    let c_to_d = fx
        .messaging
        .send_message(&carol.id, &dave.id, input("untouched"))
        .await
        .unwrap();
    fx.messaging
        .update_content(&c_to_d.id, &carol.id, UpdateMessageInput {
            content: "still untouched".to_string(),
        })
        .await
        .unwrap();

    let report = fx.accounts.delete_user(&alice.id).await.unwrap();
    assert_eq!(report.sent_messages, 1);
    assert_eq!(report.received_messages, 1);
    assert_eq!(report.messages_deleted, 2);
    // One notification per message of the pair.
    assert_eq!(report.notifications_deleted, 2);
    assert_eq!(report.history_deleted, 1);

    // Nothing references Alice anymore; Bob lost the conversation but
    // still exists.
    assert!(fx.users.find_by_id(&alice.id).await.unwrap().is_none());
    assert!(fx.users.find_by_id(&bob.id).await.unwrap().is_some());
    assert!(fx.messaging.get_message(&a_to_b.id).await.unwrap().is_none());
    assert_eq!(
        fx.notifications.get_notifications(&bob.id, 10, false).await.unwrap().len(),
        0
    );

    // Carol and Dave's data is count-preserving.
    let dave_notifications = fx
        .notifications
        .get_notifications(&dave.id, 10, false)
        .await
        .unwrap();
    assert_eq!(dave_notifications.len(), 1);
    assert_eq!(fx.messaging.count_edits(&c_to_d.id).await.unwrap(), 1);
    let survivor = fx.messaging.get_message(&c_to_d.id).await.unwrap().unwrap();
    assert_eq!(survivor.content, "still untouched");

    fx.finish().await;
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_user_deletion_cascades_through_reply_threads() {
    let fx = Fixture::new().await;
    let alice = fx.create_user("alice").await;
    let bob = fx.create_user("bob").await;
    let carol = fx.create_user("carol").await;

    // Alice starts a thread; Bob and Carol reply below it.
    let root = fx
        .messaging
        .send_message(&alice.id, &bob.id, input("thread root"))
        .await
        .unwrap();
    let r1 = fx
        .messaging
        .send_message(&bob.id, &carol.id, reply("first reply", &root.id))
        .await
        .unwrap();
    let r2 = fx
        .messaging
        .send_message(&carol.id, &bob.id, reply("nested reply", &r1.id))
        .await
        .unwrap();

    fx.accounts.delete_user(&alice.id).await.unwrap();

    // The whole thread went with its root.
    assert!(fx.messaging.get_message(&root.id).await.unwrap().is_none());
    assert!(fx.messaging.get_message(&r1.id).await.unwrap().is_none());
    assert!(fx.messaging.get_message(&r2.id).await.unwrap().is_none());
    // The repliers themselves survive.
    assert!(fx.users.find_by_id(&bob.id).await.unwrap().is_some());
    assert!(fx.users.find_by_id(&carol.id).await.unwrap().is_some());

    fx.finish().await;
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_thread_traversal_is_start_point_independent() {
    let fx = Fixture::new().await;
    let alice = fx.create_user("alice").await;
    let bob = fx.create_user("bob").await;

    let root = fx
        .messaging
        .send_message(&alice.id, &bob.id, input("root"))
        .await
        .unwrap();
    let child = fx
        .messaging
        .send_message(&bob.id, &alice.id, reply("child", &root.id))
        .await
        .unwrap();
    let grandchild = fx
        .messaging
        .send_message(&alice.id, &bob.id, reply("grandchild", &child.id))
        .await
        .unwrap();
    let sibling = fx
        .messaging
        .send_message(&bob.id, &alice.id, reply("sibling", &root.id))
        .await
        .unwrap();

    let expected: HashSet<String> = [
        root.id.clone(),
        child.id.clone(),
        grandchild.id.clone(),
        sibling.id.clone(),
    ]
    .into_iter()
    .collect();

    for start in [&root.id, &child.id, &grandchild.id, &sibling.id] {
        let thread = fx.messaging.get_thread(start).await.unwrap();
        let ids: HashSet<String> = thread.iter().map(|m| m.id.clone()).collect();
        assert_eq!(ids, expected, "thread set differs when starting at {start}");
    }

    // Depth-then-time ordering from the root.
    let thread = fx.messaging.get_thread(&root.id).await.unwrap();
    let ids: Vec<&str> = thread.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            root.id.as_str(),
            child.id.as_str(),
            sibling.id.as_str(),
            grandchild.id.as_str()
        ]
    );

    fx.finish().await;
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_unread_listing_and_read_flags() {
    let fx = Fixture::new().await;
    let alice = fx.create_user("alice").await;
    let bob = fx.create_user("bob").await;

    let first = fx
        .messaging
        .send_message(&alice.id, &bob.id, input("one"))
        .await
        .unwrap();
    let second = fx
        .messaging
        .send_message(&alice.id, &bob.id, input("two"))
        .await
        .unwrap();

    let unread = fx.messaging.list_unread(&bob.id).await.unwrap();
    assert_eq!(unread.len(), 2);
    // Newest first.
    assert_eq!(unread[0].id, second.id);
    assert_eq!(unread[1].id, first.id);

    fx.messaging.mark_read(&first.id).await.unwrap();
    let unread = fx.messaging.list_unread(&bob.id).await.unwrap();
    assert_eq!(unread.len(), 1);
    assert_eq!(unread[0].id, second.id);
    assert_eq!(fx.messaging.count_unread(&bob.id).await.unwrap(), 1);

    // The sender has no unread inbox entries from their own sends.
    assert!(fx.messaging.list_unread(&alice.id).await.unwrap().is_empty());

    fx.finish().await;
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_example_scenario_end_to_end() {
    let fx = Fixture::new().await;
    let a = fx.create_user("a").await;
    let b = fx.create_user("b").await;

    // A sends "Hi" to B.
    let message = fx
        .messaging
        .send_message(&a.id, &b.id, input("Hi"))
        .await
        .unwrap();
    assert_eq!(
        fx.notifications.get_notifications(&b.id, 10, false).await.unwrap().len(),
        1
    );
    assert_eq!(fx.messaging.count_edits(&message.id).await.unwrap(), 0);
    assert!(!message.edited);

    // Edit to "Hi there".
    fx.messaging
        .update_content(&message.id, &a.id, UpdateMessageInput {
            content: "Hi there".to_string(),
        })
        .await
        .unwrap();
    let history = fx.messaging.get_history(&message.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].old_content, "Hi");
    assert!(fx.messaging.get_message(&message.id).await.unwrap().unwrap().edited);

    // Identical edit changes nothing.
    fx.messaging
        .update_content(&message.id, &a.id, UpdateMessageInput {
            content: "Hi there".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(fx.messaging.count_edits(&message.id).await.unwrap(), 1);

    // Edit to "Hello".
    fx.messaging
        .update_content(&message.id, &a.id, UpdateMessageInput {
            content: "Hello".to_string(),
        })
        .await
        .unwrap();
    let history = fx.messaging.get_history(&message.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].old_content, "Hi there");

    // Delete A: everything tied to the conversation goes, B remains.
    fx.accounts.delete_user(&a.id).await.unwrap();
    assert!(fx.messaging.get_message(&message.id).await.unwrap().is_none());
    assert_eq!(
        fx.notifications.get_notifications(&b.id, 10, false).await.unwrap().len(),
        0
    );
    assert!(fx.users.find_by_id(&b.id).await.unwrap().is_some());

    fx.finish().await;
}
