//! Common utilities and shared types for courier-rs.
//!
//! This crate provides foundational components used across all courier-rs
//! crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//! - **Telemetry**: Tracing subscriber setup via [`init_tracing`]
//!
//! # Example
//!
//! ```no_run
//! use courier_common::{AppResult, Config, IdGenerator};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let id = id_gen.generate();
//!     println!("Generated ID: {}", id);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod telemetry;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use telemetry::init_tracing;
