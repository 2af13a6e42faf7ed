//! Messaging core for the social backend.
//!
//! Owns conversations (direct and group) and the messages inside them.
//! Conversations are deduplicated by a canonical key derived from the
//! participant set, records are never hard-deleted (per-user `removed_for`
//! sets instead), and the inbox view surfaces the single latest visible
//! message per conversation. Transport, auth and persistence wiring live in
//! the surrounding services; this crate exposes the
//! [`services::messaging::MessagingService`] facade plus the store traits it
//! is built on.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod migrations;
pub mod models;
pub mod services;
pub mod store;

pub use error::{AppError, AppResult};
