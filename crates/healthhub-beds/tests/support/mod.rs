//! Store wrappers and seed helpers shared by the workflow tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use healthhub_core::{Bed, BedAllocation, BedStatus, NewBed, decode_record, encode_record};
use healthhub_db_memory::InMemoryStore;
use healthhub_storage::{DynStore, Filter, Page, Query, RecordStore, StorageError};
use serde_json::Value;

pub const BEDS: &str = "beds";
pub const ALLOCATIONS: &str = "bed_allocations";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Insert,
    Get,
    Update,
    Select,
    Delete,
}

struct Fault {
    op: Op,
    table: String,
    /// `None` fails every matching call.
    remaining: Option<usize>,
    error: fn(&str) -> StorageError,
}

/// Wraps an in-memory store and fails chosen calls.
///
/// Also counts the writes that reached the inner store.
pub struct FaultyStore {
    inner: Arc<InMemoryStore>,
    faults: Mutex<Vec<Fault>>,
    writes: AtomicUsize,
}

impl FaultyStore {
    pub fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            faults: Mutex::new(Vec::new()),
            writes: AtomicUsize::new(0),
        }
    }

    /// Fails the next `op` on `table` with the given error.
    pub fn fail_next(&self, op: Op, table: &str, error: fn(&str) -> StorageError) {
        self.push(op, table, Some(1), error);
    }

    /// Fails every `op` on `table` with the given error.
    pub fn fail_always(&self, op: Op, table: &str, error: fn(&str) -> StorageError) {
        self.push(op, table, None, error);
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn push(&self, op: Op, table: &str, remaining: Option<usize>, error: fn(&str) -> StorageError) {
        self.faults.lock().unwrap().push(Fault {
            op,
            table: table.to_string(),
            remaining,
            error,
        });
    }

    fn check(&self, op: Op, table: &str) -> Result<(), StorageError> {
        let mut faults = self.faults.lock().unwrap();
        let Some(index) = faults
            .iter()
            .position(|f| f.op == op && f.table == table && f.remaining != Some(0))
        else {
            return Ok(());
        };
        let fault = &mut faults[index];
        if let Some(remaining) = fault.remaining.as_mut() {
            *remaining -= 1;
        }
        Err((fault.error)(table))
    }

    fn wrote(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordStore for FaultyStore {
    async fn insert(&self, table: &str, record: &Value) -> Result<Value, StorageError> {
        self.check(Op::Insert, table)?;
        self.wrote();
        self.inner.insert(table, record).await
    }

    async fn get_by_id(&self, table: &str, id: &str) -> Result<Value, StorageError> {
        self.check(Op::Get, table)?;
        self.inner.get_by_id(table, id).await
    }

    async fn update_where(
        &self,
        table: &str,
        filter: &Filter,
        patch: &Value,
    ) -> Result<Value, StorageError> {
        self.check(Op::Update, table)?;
        self.wrote();
        self.inner.update_where(table, filter, patch).await
    }

    async fn select(&self, table: &str, query: &Query) -> Result<Page, StorageError> {
        self.check(Op::Select, table)?;
        self.inner.select(table, query).await
    }

    async fn delete_where(&self, table: &str, filter: &Filter) -> Result<u64, StorageError> {
        self.check(Op::Delete, table)?;
        self.wrote();
        self.inner.delete_where(table, filter).await
    }

    fn backend_name(&self) -> &'static str {
        "faulty"
    }
}

/// Yields to the scheduler before every call, so concurrent workflows
/// interleave between their steps the way remote calls do.
pub struct YieldingStore {
    inner: DynStore,
}

impl YieldingStore {
    pub fn new(inner: DynStore) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl RecordStore for YieldingStore {
    async fn insert(&self, table: &str, record: &Value) -> Result<Value, StorageError> {
        tokio::task::yield_now().await;
        self.inner.insert(table, record).await
    }

    async fn get_by_id(&self, table: &str, id: &str) -> Result<Value, StorageError> {
        tokio::task::yield_now().await;
        self.inner.get_by_id(table, id).await
    }

    async fn update_where(
        &self,
        table: &str,
        filter: &Filter,
        patch: &Value,
    ) -> Result<Value, StorageError> {
        tokio::task::yield_now().await;
        self.inner.update_where(table, filter, patch).await
    }

    async fn select(&self, table: &str, query: &Query) -> Result<Page, StorageError> {
        tokio::task::yield_now().await;
        self.inner.select(table, query).await
    }

    async fn delete_where(&self, table: &str, filter: &Filter) -> Result<u64, StorageError> {
        tokio::task::yield_now().await;
        self.inner.delete_where(table, filter).await
    }

    fn backend_name(&self) -> &'static str {
        "yielding"
    }
}

pub fn timeout(table: &str) -> StorageError {
    StorageError::timeout(format!("write to {table} timed out"))
}

pub fn connection_reset(table: &str) -> StorageError {
    StorageError::connection(format!("connection reset while writing {table}"))
}

/// Inserts a bed with the given number and status and returns its id.
pub async fn seed_bed(store: &dyn RecordStore, number: &str, status: BedStatus) -> String {
    let record = encode_record(&NewBed::new(number, 1, "General").with_status(status)).unwrap();
    let row = store.insert(BEDS, &record).await.unwrap();
    row["id"].as_str().unwrap().to_string()
}

pub async fn read_bed(store: &dyn RecordStore, id: &str) -> Bed {
    decode_record(store.get_by_id(BEDS, id).await.unwrap()).unwrap()
}

pub async fn read_allocation(store: &dyn RecordStore, id: &str) -> BedAllocation {
    decode_record(store.get_by_id(ALLOCATIONS, id).await.unwrap()).unwrap()
}

/// Active allocations referencing a bed.
pub async fn active_allocations_for(store: &dyn RecordStore, bed_id: &str) -> Vec<BedAllocation> {
    let query = Query::new().with_filter(
        Filter::new()
            .and_eq("bed_id", bed_id)
            .and_eq("status", "active"),
    );
    store
        .select(ALLOCATIONS, &query)
        .await
        .unwrap()
        .records
        .into_iter()
        .map(|row| decode_record(row).unwrap())
        .collect()
}
