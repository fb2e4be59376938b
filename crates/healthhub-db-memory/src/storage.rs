use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use healthhub_core::{generate_id, validate_id};
use healthhub_storage::{Filter, Page, Query, RecordStore, StorageError};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::query::{paginate, sort_records};

pub type StorageKey = String; // Format: "table/id"

pub(crate) fn make_storage_key(table: &str, id: &str) -> StorageKey {
    format!("{table}/{id}")
}

const BACKEND: &str = "memory";

fn now_rfc3339() -> Value {
    Value::String(
        OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default(),
    )
}

fn as_object<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>, StorageError> {
    value
        .as_object()
        .ok_or_else(|| StorageError::invalid_record(format!("{what} must be a JSON object")))
}

/// In-memory record store backed by a `DashMap`.
///
/// This storage implementation provides:
/// - Concurrent access via sharded locking
/// - Atomic conditional updates: the filter check and the write happen under
///   the row's shard lock, so concurrent compare-and-set calls on one row have
///   exactly one winner
/// - Filtering, ordering, paging and exact counts for selects
#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: DashMap<StorageKey, Value>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
        }
    }

    /// Number of rows across all tables.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of rows in one table.
    pub fn count_in(&self, table: &str) -> usize {
        let prefix = format!("{table}/");
        self.data
            .iter()
            .filter(|entry| entry.key().starts_with(&prefix))
            .count()
    }

    fn matching_rows(&self, table: &str, filter: &Filter) -> Vec<Value> {
        let prefix = format!("{table}/");
        self.data
            .iter()
            .filter(|entry| entry.key().starts_with(&prefix) && filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn insert(&self, table: &str, record: &Value) -> Result<Value, StorageError> {
        let fields = as_object(record, "record")?;
        let id = match fields.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Null) | None => generate_id(),
            Some(other) => {
                return Err(StorageError::invalid_record(format!(
                    "id must be a string, got {other}"
                )));
            }
        };
        validate_id(&id).map_err(|e| StorageError::invalid_record(e.to_string()))?;

        let mut row = fields.clone();
        let now = now_rfc3339();
        row.insert("id".to_string(), Value::String(id.clone()));
        row.entry("created_at").or_insert_with(|| now.clone());
        row.entry("updated_at").or_insert(now);
        let row = Value::Object(row);

        match self.data.entry(make_storage_key(table, &id)) {
            Entry::Occupied(_) => Err(StorageError::already_exists(table, id)),
            Entry::Vacant(slot) => {
                slot.insert(row.clone());
                tracing::debug!(backend = BACKEND, table, id = %id, "record inserted");
                Ok(row)
            }
        }
    }

    async fn get_by_id(&self, table: &str, id: &str) -> Result<Value, StorageError> {
        self.data
            .get(&make_storage_key(table, id))
            .map(|row| row.value().clone())
            .ok_or_else(|| StorageError::not_found(table, id))
    }

    async fn update_where(
        &self,
        table: &str,
        filter: &Filter,
        patch: &Value,
    ) -> Result<Value, StorageError> {
        let patch = as_object(patch, "patch")?;
        let id = filter
            .id()
            .ok_or_else(|| StorageError::invalid_record("update_where requires an id condition"))?;

        // The shard write lock is held from the condition check to the write.
        let mut row = self
            .data
            .get_mut(&make_storage_key(table, id))
            .ok_or_else(|| StorageError::not_found(table, id))?;

        if !filter.matches(row.value()) {
            return Err(StorageError::condition_failed(table, id));
        }

        let fields = row
            .value_mut()
            .as_object_mut()
            .ok_or_else(|| StorageError::internal(format!("row {table}/{id} is not an object")))?;
        for (column, value) in patch {
            if column != "id" {
                fields.insert(column.clone(), value.clone());
            }
        }
        fields.insert("updated_at".to_string(), now_rfc3339());

        tracing::debug!(backend = BACKEND, table, id, "record updated");
        Ok(row.value().clone())
    }

    async fn select(&self, table: &str, query: &Query) -> Result<Page, StorageError> {
        let mut records = self.matching_rows(table, &query.filter);
        sort_records(&mut records, &query.order);
        let total = records.len() as u64;
        let page = Page::new(paginate(records, query.offset, query.limit));
        Ok(if query.count { page.with_total(total) } else { page })
    }

    async fn delete_where(&self, table: &str, filter: &Filter) -> Result<u64, StorageError> {
        if filter.is_empty() {
            return Err(StorageError::invalid_record(
                "delete_where requires at least one condition",
            ));
        }
        let prefix = format!("{table}/");
        let keys: Vec<StorageKey> = self
            .data
            .iter()
            .filter(|entry| entry.key().starts_with(&prefix) && filter.matches(entry.value()))
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        for key in keys {
            // Re-check: the row may have changed since it was listed.
            if self.data.remove_if(&key, |_, row| filter.matches(row)).is_some() {
                removed += 1;
            }
        }
        tracing::debug!(backend = BACKEND, table, removed, "records deleted");
        Ok(removed)
    }

    fn backend_name(&self) -> &'static str {
        BACKEND
    }
}
