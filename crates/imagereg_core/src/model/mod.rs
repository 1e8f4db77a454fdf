//! Registry domain model.
//!
//! # Responsibility
//! - Define the stored `Image` and `ImageRepository` records.
//! - Define the transient `ImageRepositoryMapping` write request.
//! - Own the naming rules every write path validates against.
//!
//! # Invariants
//! - `uid` and `created_at` are assigned by the store, never by clients.
//! - An image's `content_reference` and `metadata` never change after creation.

pub mod image;
pub mod mapping;
pub mod names;
pub mod repository;

/// Current wall clock as epoch milliseconds.
pub(crate) fn now_epoch_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}
