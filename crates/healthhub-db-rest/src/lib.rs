//! PostgREST storage backend for HealthHub.
//!
//! This crate provides an implementation of the `RecordStore` trait from
//! `healthhub-storage` that talks to a PostgREST endpoint (`/rest/v1/{table}`)
//! over HTTP, using reqwest.
//!
//! # Example
//!
//! ```ignore
//! use healthhub_db_rest::{RestStore, RestStoreConfig};
//! use healthhub_storage::RecordStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RestStoreConfig::new("https://project.example.co", "anon-key")?
//!     .with_timeout_ms(5_000);
//! let store = RestStore::new(config)?;
//!
//! let bed = store.get_by_id("beds", "6f1c...").await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`config`]: endpoint, key, schema and timeout
//! - [`error`]: mapping of PostgREST error bodies and transport failures
//! - [`filter`]: encoding of filters and ordering as PostgREST query parameters
//! - [`storage`]: the `RecordStore` implementation

pub mod config;
pub mod error;
pub mod filter;
mod storage;

pub use config::{ConfigError, RestStoreConfig};
pub use storage::RestStore;

// Re-export the RecordStore trait for convenience
pub use healthhub_storage::{RecordStore, StorageError};
