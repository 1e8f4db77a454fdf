//! Cross-entity use-case services.
//!
//! # Responsibility
//! - `MappingProcessor` is the only component coordinating both stores.
//! - `TagResolver` answers read-side tag lookups.
//!
//! # Invariants
//! - Services never bypass store contracts to reach the object store.
//! - Write order is image first, tag table second, so every observable tag
//!   names a durably stored image.

pub mod mapping_service;
pub mod tag_resolver;
