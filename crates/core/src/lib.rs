//! Core business logic for courier-rs.

pub mod services;

pub use services::*;
