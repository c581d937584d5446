//! Business logic services.
//!
//! The write path invokes the lifecycle hooks directly: message creation
//! runs the post-create notification hook, content updates run the
//! pre-update edit interception, and user deletion runs the cascade
//! cleanup. Hooks are wired at service construction rather than through a
//! global dispatch registry.

#![allow(missing_docs)]

pub mod account;
pub mod messaging;
pub mod notification;

pub use account::{AccountService, CleanupReport};
pub use messaging::{CreateMessageInput, MessagingService, UpdateMessageInput};
pub use notification::NotificationService;
