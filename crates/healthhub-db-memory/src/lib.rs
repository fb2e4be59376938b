//! In-memory record store backend for HealthHub.
//!
//! This crate provides an in-memory implementation of the `RecordStore` trait
//! from `healthhub-storage`, using a `DashMap` for concurrent access. It is
//! used by tests and for local runs without a PostgREST endpoint.
//!
//! # Example
//!
//! ```ignore
//! use healthhub_db_memory::InMemoryStore;
//! use healthhub_storage::RecordStore;
//!
//! let store = InMemoryStore::new();
//! let bed = store
//!     .insert("beds", &serde_json::json!({"bed_number": "A-1", "status": "available"}))
//!     .await?;
//! ```

pub mod query;
pub mod storage;

// Re-export the RecordStore trait for convenience
pub use healthhub_storage::{RecordStore, StorageError};

pub use storage::{InMemoryStore, StorageKey};

/// Creates a new shared in-memory store.
pub fn create_store() -> healthhub_storage::DynStore {
    std::sync::Arc::new(InMemoryStore::new())
}
