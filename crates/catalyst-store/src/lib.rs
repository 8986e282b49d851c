//! Content storage for the Catalyst content engine.
//!
//! A narrow, durable key/value byte store addressed by
//! [`StorageCategory`] and key. The deployment engine writes content files
//! (keyed by content hash), pointer records (keyed by pointer, one category
//! per entity type), history events and audit proofs through it.
//!
//! # Storage Backends
//!
//! All backends implement the [`ContentStorage`] trait:
//!
//! - [`InMemoryContentStorage`]: map-based store for tests and embedding
//! - [`FileSystemContentStorage`]: one directory per category, atomic renames
//!
//! # Design Rules
//!
//! 1. The store never interprets values.
//! 2. There are no transactional guarantees across keys.
//! 3. A write is durable before `store` returns.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod category;
pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

pub use category::StorageCategory;
pub use error::{StorageError, StorageResult};
pub use fs::FileSystemContentStorage;
pub use memory::InMemoryContentStorage;
pub use traits::ContentStorage;
