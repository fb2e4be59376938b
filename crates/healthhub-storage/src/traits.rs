//! The record store trait.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StorageError;
use crate::types::{Filter, Page, Query};

/// The contract every persistence backend implements.
///
/// Records are JSON objects addressed by table name and `id`. Implementations
/// must be thread-safe (`Send + Sync`) and must not hold local locks across
/// remote calls: mutual exclusion between callers comes from conditional
/// updates against the store itself.
///
/// # Example
///
/// ```ignore
/// use healthhub_storage::{Filter, RecordStore, StorageError};
///
/// async fn release(store: &dyn RecordStore, bed_id: &str) -> Result<(), StorageError> {
///     let patch = serde_json::json!({"status": "available", "patient_id": null});
///     store.update_where("beds", &Filter::by_id(bed_id), &patch).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Inserts a record and returns it as stored.
    ///
    /// If the record has no `id`, the backend generates one. `created_at` and
    /// `updated_at` are filled in when absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if a record with the same id exists.
    /// Returns `StorageError::InvalidRecord` if the record is not a JSON object.
    async fn insert(&self, table: &str, record: &Value) -> Result<Value, StorageError>;

    /// Reads a record by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no record has this id.
    async fn get_by_id(&self, table: &str, id: &str) -> Result<Value, StorageError>;

    /// Applies `patch` to the single row selected by `filter`.
    ///
    /// The filter must pin the row with an `id` equality condition. Any other
    /// conditions are checked against the row's current values atomically with
    /// the write, which makes this the store's compare-and-set primitive.
    /// `patch` is shallow-merged into the row; `null` values clear columns.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidRecord` if the filter has no id or the patch
    /// is not an object.
    /// Returns `StorageError::NotFound` if no row has the id.
    /// Returns `StorageError::ConditionFailed` if the row exists but another
    /// condition does not hold; nothing is written in that case.
    async fn update_where(
        &self,
        table: &str,
        filter: &Filter,
        patch: &Value,
    ) -> Result<Value, StorageError>;

    /// Selects rows matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error for infrastructure issues or unsupported queries.
    async fn select(&self, table: &str, query: &Query) -> Result<Page, StorageError>;

    /// Deletes rows matching `filter` and returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error for infrastructure issues.
    async fn delete_where(&self, table: &str, filter: &Filter) -> Result<u64, StorageError>;

    /// Returns the name of this backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time test that RecordStore is object-safe
    fn _assert_store_object_safe(_: &dyn RecordStore) {}
}
