//! Core type definitions for formweave.
//!
//! This crate defines the small, plugin-agnostic types every other crate
//! depends on:
//! - Composition, entry and user identifiers (UUID v7)
//! - URL slugs for compositions
//!
//! Form schemas, plugin data and compositions live in `formweave-model`.

mod ids;
mod slug;

pub use ids::{CompositionId, EntryId, UserId};
pub use slug::Slug;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("invalid slug: {0:?}")]
    InvalidSlug(String),
}
