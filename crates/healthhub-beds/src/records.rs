//! Typed reads and patches shared by the workflows.

use healthhub_core::{
    AllocationStatus, Bed, BedAllocation, BedStatus, Timestamp, decode_record, encode_record,
};
use healthhub_storage::RecordStore;
use serde::Serialize;
use serde_json::Value;

use crate::outcome::{Entity, WorkflowError};

pub(crate) fn decode_bed(row: Value) -> Result<Bed, WorkflowError> {
    decode_record(row).map_err(|e| WorkflowError::decode(Entity::Bed, e))
}

pub(crate) fn decode_allocation(row: Value) -> Result<BedAllocation, WorkflowError> {
    decode_record(row).map_err(|e| WorkflowError::decode(Entity::Allocation, e))
}

pub(crate) fn encode<T: Serialize>(entity: Entity, value: &T) -> Result<Value, WorkflowError> {
    encode_record(value).map_err(|e| WorkflowError::decode(entity, e))
}

pub(crate) async fn fetch_bed(
    store: &dyn RecordStore,
    table: &str,
    id: &str,
) -> Result<Bed, WorkflowError> {
    let row = store
        .get_by_id(table, id)
        .await
        .map_err(|e| WorkflowError::from_store(e, Entity::Bed, id))?;
    decode_bed(row)
}

pub(crate) async fn fetch_allocation(
    store: &dyn RecordStore,
    table: &str,
    id: &str,
) -> Result<BedAllocation, WorkflowError> {
    let row = store
        .get_by_id(table, id)
        .await
        .map_err(|e| WorkflowError::from_store(e, Entity::Allocation, id))?;
    decode_allocation(row)
}

/// Bed columns that bind a bed to its occupant. `None` serializes as null,
/// which clears the column.
#[derive(Debug, Serialize)]
pub(crate) struct BedBinding<'a> {
    pub status: BedStatus,
    pub patient_id: Option<&'a str>,
    pub allocation_id: Option<&'a str>,
}

impl<'a> BedBinding<'a> {
    pub fn occupied_by(allocation: &'a BedAllocation) -> Self {
        Self {
            status: BedStatus::Occupied,
            patient_id: Some(&allocation.patient_id),
            allocation_id: Some(&allocation.id),
        }
    }

    pub fn released() -> Self {
        Self {
            status: BedStatus::Available,
            patient_id: None,
            allocation_id: None,
        }
    }
}

/// Allocation columns written when a stay ends.
#[derive(Debug, Serialize)]
pub(crate) struct AllocationClose {
    pub status: AllocationStatus,
    pub discharge_date: Timestamp,
}
