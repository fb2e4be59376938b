//! # healthhub-storage
//!
//! Record store abstraction for the HealthHub bed service.
//!
//! This crate defines the trait and types that every persistence backend
//! implements. It contains no backend itself: see `healthhub-db-memory` and
//! `healthhub-db-rest`.
//!
//! ## Overview
//!
//! The main trait is [`RecordStore`], a table-oriented contract:
//! - `insert` a JSON record into a table
//! - `get_by_id`
//! - `update_where` a single row, optionally conditioned on its current values
//! - `select` with filters, ordering and paging
//! - `delete_where`
//!
//! There is deliberately no multi-statement transaction in this contract.
//! Callers that need two dependent writes sequence them and use conditional
//! updates for mutual exclusion.
//!
//! ## Example
//!
//! ```ignore
//! use healthhub_storage::{Filter, RecordStore, StorageError};
//!
//! async fn occupy(store: &dyn RecordStore, bed_id: &str) -> Result<(), StorageError> {
//!     let filter = Filter::by_id(bed_id).and_eq("status", "available");
//!     store
//!         .update_where("beds", &filter, &serde_json::json!({"status": "occupied"}))
//!         .await?;
//!     Ok(())
//! }
//! ```

mod error;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use traits::RecordStore;
pub use types::{Condition, Filter, FilterOp, ID_COLUMN, Page, Query, SortParam};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared store trait object.
pub type DynStore = std::sync::Arc<dyn RecordStore>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use healthhub_storage::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ErrorCategory, StorageError};
    pub use crate::traits::RecordStore;
    pub use crate::types::{Condition, Filter, FilterOp, Page, Query, SortParam};
    pub use crate::{DynStore, StorageResult};
}
