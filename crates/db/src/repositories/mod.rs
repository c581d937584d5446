//! Database repositories.

use courier_common::AppError;
use sea_orm::{DbErr, SqlErr};

pub mod message;
pub mod message_history;
pub mod notification;
pub mod user;

/// Map an insert/update failure, surfacing constraint violations as
/// integrity errors rather than opaque database errors.
pub(crate) fn write_err(e: DbErr) -> AppError {
    match e.sql_err() {
        Some(SqlErr::ForeignKeyConstraintViolation(detail) | SqlErr::UniqueConstraintViolation(detail)) => {
            AppError::IntegrityViolation(detail)
        }
        _ => AppError::Database(e.to_string()),
    }
}

pub use message::MessageRepository;
pub use message_history::MessageHistoryRepository;
pub use notification::NotificationRepository;
pub use user::UserRepository;
