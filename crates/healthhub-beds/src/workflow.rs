//! Allocate and discharge: two dependent writes without a transaction.
//!
//! The allocation row is the source of truth and is always written first.
//! The bed row is a projection of it and is written second. When the second
//! write fails the outcome is [`WorkflowOutcome::PartialFailure`], carrying
//! the ids a reconciliation sweep needs. No step is retried and nothing is
//! rolled back.

use healthhub_core::{
    AllocationStatus, Bed, BedAllocation, BedStatus, NewAllocation, Timestamp, allocation, bed,
    now_utc,
};
use healthhub_storage::{DynStore, Filter};
use serde_json::Value;
use tracing::{debug, error, instrument};

use crate::outcome::{Entity, Operation, PartialFailure, WorkflowError, WorkflowOutcome};
use crate::records::{
    AllocationClose, BedBinding, decode_allocation, encode, fetch_allocation, fetch_bed,
};
use crate::tables::TableNames;

/// Stands in for the id of an inserted allocation the store returned without one.
const UNKNOWN_ID: &str = "<unknown>";

/// Coordinates allocation and bed writes against an injected store.
///
/// Safe to share and call concurrently: mutual exclusion on a bed comes from
/// the conditional `status = available` write, never from a local lock.
#[derive(Clone)]
pub struct AllocationWorkflow {
    store: DynStore,
    tables: TableNames,
}

impl AllocationWorkflow {
    pub fn new(store: DynStore) -> Self {
        Self {
            store,
            tables: TableNames::default(),
        }
    }

    #[must_use]
    pub fn with_tables(mut self, tables: TableNames) -> Self {
        self.tables = tables;
        self
    }

    pub fn tables(&self) -> &TableNames {
        &self.tables
    }

    /// Admits a patient to an available bed.
    ///
    /// Fails without writing if the bed is missing or not available. Once the
    /// allocation row exists, any failure to occupy the bed (including losing
    /// a race for it) is a partial failure carrying the allocation id.
    #[instrument(skip(self, notes))]
    pub async fn allocate(
        &self,
        bed_id: &str,
        patient_id: &str,
        admission: Timestamp,
        notes: Option<&str>,
    ) -> WorkflowOutcome<BedAllocation> {
        let bed = match fetch_bed(&*self.store, &self.tables.beds, bed_id).await {
            Ok(bed) => bed,
            Err(err) => return err.into(),
        };
        if !bed.is_available() {
            debug!(bed_id, status = %bed.status, "bed is not available");
            return WorkflowError::invalid_state(
                Entity::Bed,
                bed_id,
                BedStatus::Available.as_str(),
                bed.status.as_str(),
            )
            .into();
        }

        let mut request = NewAllocation::active(bed_id, patient_id, admission);
        if let Some(notes) = notes {
            request = request.with_notes(notes);
        }
        let record = match encode(Entity::Allocation, &request) {
            Ok(record) => record,
            Err(err) => return err.into(),
        };

        // Step 1: the allocation row.
        let row = match self.store.insert(&self.tables.allocations, &record).await {
            Ok(row) => row,
            Err(err) => return WorkflowError::Store(err).into(),
        };
        let inserted_id = row
            .get(allocation::fields::ID)
            .and_then(Value::as_str)
            .map(str::to_owned);
        let created = match decode_allocation(row.clone()) {
            Ok(created) => created,
            Err(err) => {
                let allocation_id = inserted_id.unwrap_or_else(|| UNKNOWN_ID.to_string());
                error!(allocation_id = %allocation_id, bed_id, %row, "inserted allocation could not be read back");
                return partial(Operation::Allocate, &allocation_id, bed_id, err);
            }
        };
        debug!(allocation_id = %created.id, bed_id, "allocation created");

        // Step 2: occupy the bed, only if nobody else did in the meantime.
        let filter = Filter::by_id(bed_id).and_eq(bed::fields::STATUS, BedStatus::Available.as_str());
        let patch = match encode(Entity::Bed, &BedBinding::occupied_by(&created)) {
            Ok(patch) => patch,
            Err(err) => return partial(Operation::Allocate, &created.id, bed_id, err),
        };
        match self
            .store
            .update_where(&self.tables.beds, &filter, &patch)
            .await
        {
            Ok(_) => {
                debug!(allocation_id = %created.id, bed_id, "bed occupied");
                WorkflowOutcome::Success(created)
            }
            Err(err) => partial(
                Operation::Allocate,
                &created.id,
                bed_id,
                WorkflowError::from_store(err, Entity::Bed, bed_id),
            ),
        }
    }

    /// Ends an active stay and frees its bed.
    ///
    /// `at` defaults to now. Discharging a stay that is no longer active is an
    /// `InvalidState` failure with no writes. Once the allocation is closed,
    /// a failure to free the bed is a partial failure carrying the bed id.
    ///
    /// The bed is only freed while it is still bound to this stay. A bed held
    /// by another stay, or one that no longer exists, is left untouched. A
    /// rebind between the read and the release loses with `Conflict`.
    #[instrument(skip(self))]
    pub async fn discharge(
        &self,
        allocation_id: &str,
        at: Option<Timestamp>,
    ) -> WorkflowOutcome<BedAllocation> {
        let current = match fetch_allocation(&*self.store, &self.tables.allocations, allocation_id)
            .await
        {
            Ok(current) => current,
            Err(err) => return err.into(),
        };
        if !current.is_active() {
            debug!(allocation_id, status = %current.status, "allocation is not active");
            return WorkflowError::invalid_state(
                Entity::Allocation,
                allocation_id,
                AllocationStatus::Active.as_str(),
                current.status.as_str(),
            )
            .into();
        }
        let bed_id = current.bed_id.as_str();

        // Step 1: close the allocation, guarded against a concurrent discharge.
        let close = AllocationClose {
            status: AllocationStatus::Discharged,
            discharge_date: at.unwrap_or_else(now_utc),
        };
        let patch = match encode(Entity::Allocation, &close) {
            Ok(patch) => patch,
            Err(err) => return err.into(),
        };
        let filter = Filter::by_id(allocation_id)
            .and_eq(allocation::fields::STATUS, AllocationStatus::Active.as_str());
        let row = match self
            .store
            .update_where(&self.tables.allocations, &filter, &patch)
            .await
        {
            Ok(row) => row,
            Err(err) => {
                return WorkflowError::from_store(err, Entity::Allocation, allocation_id).into();
            }
        };
        debug!(allocation_id, bed_id, "allocation discharged");
        let closed = match decode_allocation(row) {
            Ok(closed) => closed,
            Err(err) => return partial(Operation::Discharge, allocation_id, bed_id, err),
        };

        // Step 2: free the bed, but only while this stay still holds it.
        let held = match fetch_bed(&*self.store, &self.tables.beds, bed_id).await {
            Ok(held) => held,
            Err(WorkflowError::NotFound { .. }) => {
                debug!(allocation_id, bed_id, "bed no longer exists, nothing to release");
                return WorkflowOutcome::Success(closed);
            }
            Err(err) => return partial(Operation::Discharge, allocation_id, bed_id, err),
        };
        let Some(filter) = release_filter(&held, &closed) else {
            debug!(
                allocation_id,
                bed_id,
                bound_to = ?held.allocation_id,
                "bed is held by another stay, left untouched"
            );
            return WorkflowOutcome::Success(closed);
        };
        let patch = match encode(Entity::Bed, &BedBinding::released()) {
            Ok(patch) => patch,
            Err(err) => return partial(Operation::Discharge, allocation_id, bed_id, err),
        };
        match self
            .store
            .update_where(&self.tables.beds, &filter, &patch)
            .await
        {
            Ok(_) => {
                debug!(allocation_id, bed_id, "bed released");
                WorkflowOutcome::Success(closed)
            }
            Err(err) => partial(
                Operation::Discharge,
                allocation_id,
                bed_id,
                WorkflowError::from_store(err, Entity::Bed, bed_id),
            ),
        }
    }
}

/// Conditional write that releases `target` only if `stay` still holds it.
///
/// A bed bound by allocation id must still carry that id. Rows written before
/// beds carried an allocation reference are matched on the occupying patient
/// and must still have no reference. Any other bed belongs to someone else.
fn release_filter(target: &Bed, stay: &BedAllocation) -> Option<Filter> {
    let by_id = Filter::by_id(target.id.as_str());
    match target.allocation_id.as_deref() {
        Some(bound) if bound == stay.id => {
            Some(by_id.and_eq(bed::fields::ALLOCATION_ID, stay.id.as_str()))
        }
        None if target.status == BedStatus::Occupied
            && target.patient_id.as_deref() == Some(stay.patient_id.as_str()) =>
        {
            Some(
                by_id
                    .and_null(bed::fields::ALLOCATION_ID)
                    .and_eq(bed::fields::STATUS, BedStatus::Occupied.as_str())
                    .and_eq(bed::fields::PATIENT_ID, stay.patient_id.as_str()),
            )
        }
        _ => None,
    }
}

fn partial<T>(
    operation: Operation,
    allocation_id: &str,
    bed_id: &str,
    source: WorkflowError,
) -> WorkflowOutcome<T> {
    let failure = PartialFailure::new(operation, allocation_id, bed_id, source);
    error!(
        operation = %failure.operation,
        allocation_id,
        bed_id,
        kind = %failure.kind,
        error.category = %failure.source.category(),
        error = %failure.source,
        "bed left out of sync with its allocation"
    );
    WorkflowOutcome::PartialFailure(failure)
}
