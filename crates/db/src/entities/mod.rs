//! Database entities.

pub mod message;
pub mod message_history;
pub mod notification;
pub mod user;

pub use message::Entity as Message;
pub use message_history::Entity as MessageHistory;
pub use notification::Entity as Notification;
pub use user::Entity as User;
