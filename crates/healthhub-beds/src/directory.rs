//! Bed and allocation lookups and bed maintenance.

use std::collections::HashMap;

use healthhub_core::{
    Bed, BedAllocation, BedPatch, BedStatus, NewBed, allocation, bed,
};
use healthhub_storage::{DynStore, Filter, Query, SortParam};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::outcome::{Entity, WorkflowError};
use crate::records::{decode_allocation, decode_bed, encode, fetch_allocation, fetch_bed};
use crate::tables::TableNames;

/// Page size used when listing beds without an explicit limit.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// One page of beds.
#[derive(Debug, Clone, Serialize)]
pub struct BedPage {
    pub beds: Vec<Bed>,
    /// Number of beds across all pages.
    pub total: u64,
}

/// An allocation together with the bed it refers to.
#[derive(Debug, Clone, Serialize)]
pub struct AllocationWithBed {
    #[serde(flatten)]
    pub allocation: BedAllocation,
    /// `None` when the bed row no longer exists.
    pub bed: Option<Bed>,
}

/// Read access to beds and allocations plus bed maintenance.
///
/// Beds only become occupied through [`crate::AllocationWorkflow`]; the
/// maintenance operations here refuse to touch an occupied bed.
#[derive(Clone)]
pub struct BedDirectory {
    store: DynStore,
    tables: TableNames,
}

impl BedDirectory {
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

    /// Lists beds ordered by bed number, with the total count.
    #[instrument(skip(self))]
    pub async fn list_beds(&self, limit: u32, offset: u32) -> Result<BedPage, WorkflowError> {
        let query = Query::new()
            .with_order(SortParam::asc(bed::fields::BED_NUMBER))
            .with_limit(limit)
            .with_offset(offset)
            .with_count();
        let page = self.store.select(&self.tables.beds, &query).await?;
        let fetched = page.len() as u64;
        let total = page.total.unwrap_or(u64::from(offset) + fetched);
        let beds = page
            .records
            .into_iter()
            .map(decode_bed)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(BedPage { beds, total })
    }

    /// Lists available beds, lowest floor first.
    #[instrument(skip(self))]
    pub async fn available_beds(&self) -> Result<Vec<Bed>, WorkflowError> {
        let query = Query::new()
            .with_filter(Filter::new().and_eq(bed::fields::STATUS, BedStatus::Available.as_str()))
            .with_order(SortParam::asc(bed::fields::FLOOR))
            .with_order(SortParam::asc(bed::fields::BED_NUMBER));
        let page = self.store.select(&self.tables.beds, &query).await?;
        page.records.into_iter().map(decode_bed).collect()
    }

    pub async fn get_bed(&self, id: &str) -> Result<Bed, WorkflowError> {
        fetch_bed(&*self.store, &self.tables.beds, id).await
    }

    /// Adds a bed. New beds can be available or in maintenance, never occupied.
    #[instrument(skip(self))]
    pub async fn create_bed(&self, new_bed: &NewBed) -> Result<Bed, WorkflowError> {
        if new_bed.status == BedStatus::Occupied {
            return Err(occupied_by_hand(&new_bed.bed_number));
        }
        let record = encode(Entity::Bed, new_bed)?;
        let row = self.store.insert(&self.tables.beds, &record).await?;
        let created = decode_bed(row)?;
        debug!(bed_id = %created.id, bed_number = %created.bed_number, "bed created");
        Ok(created)
    }

    /// Updates descriptive columns or moves a free bed in or out of maintenance.
    ///
    /// Any patch is refused on an occupied bed so the bed never drifts from
    /// its allocation; the check is part of the write.
    #[instrument(skip(self))]
    pub async fn update_bed(&self, id: &str, patch: &BedPatch) -> Result<Bed, WorkflowError> {
        if patch.status == Some(BedStatus::Occupied) {
            return Err(occupied_by_hand(id));
        }
        if patch.is_empty() {
            return self.get_bed(id).await;
        }
        let filter = Filter::by_id(id).and_neq(bed::fields::STATUS, BedStatus::Occupied.as_str());
        let record = encode(Entity::Bed, patch)?;
        match self.store.update_where(&self.tables.beds, &filter, &record).await {
            Ok(row) => decode_bed(row),
            Err(err) if err.is_condition_failed() => Err(self.occupied_conflict(id).await),
            Err(err) => Err(WorkflowError::from_store(err, Entity::Bed, id)),
        }
    }

    /// Removes a bed that is not occupied.
    #[instrument(skip(self))]
    pub async fn delete_bed(&self, id: &str) -> Result<(), WorkflowError> {
        let filter = Filter::by_id(id).and_neq(bed::fields::STATUS, BedStatus::Occupied.as_str());
        let removed = self.store.delete_where(&self.tables.beds, &filter).await?;
        if removed == 0 {
            // Tell a missing bed from an occupied one.
            self.get_bed(id).await?;
            return Err(self.occupied_conflict(id).await);
        }
        debug!(bed_id = id, "bed deleted");
        Ok(())
    }

    pub async fn get_allocation(&self, id: &str) -> Result<BedAllocation, WorkflowError> {
        fetch_allocation(&*self.store, &self.tables.allocations, id).await
    }

    /// A patient's stays, most recent admission first, each with its bed.
    #[instrument(skip(self))]
    pub async fn patient_allocations(
        &self,
        patient_id: &str,
    ) -> Result<Vec<AllocationWithBed>, WorkflowError> {
        let query = Query::new()
            .with_filter(Filter::new().and_eq(allocation::fields::PATIENT_ID, patient_id))
            .with_order(SortParam::desc(allocation::fields::ADMISSION_DATE));
        let page = self.store.select(&self.tables.allocations, &query).await?;
        let allocations = page
            .records
            .into_iter()
            .map(decode_allocation)
            .collect::<Result<Vec<_>, _>>()?;

        let mut beds: HashMap<String, Option<Bed>> = HashMap::new();
        let mut joined = Vec::with_capacity(allocations.len());
        for allocation in allocations {
            if !beds.contains_key(&allocation.bed_id) {
                let bed = match self.get_bed(&allocation.bed_id).await {
                    Ok(bed) => Some(bed),
                    Err(WorkflowError::NotFound { .. }) => None,
                    Err(err) => return Err(err),
                };
                beds.insert(allocation.bed_id.clone(), bed);
            }
            let bed = beds.get(&allocation.bed_id).cloned().flatten();
            joined.push(AllocationWithBed { allocation, bed });
        }
        Ok(joined)
    }

    async fn occupied_conflict(&self, id: &str) -> WorkflowError {
        match self.get_bed(id).await {
            Ok(bed) if bed.status == BedStatus::Occupied => WorkflowError::invalid_state(
                Entity::Bed,
                id,
                "not occupied",
                bed.status.as_str(),
            ),
            // It changed again since the failed write.
            Ok(_) => WorkflowError::conflict(Entity::Bed, id),
            Err(err) => err,
        }
    }
}

fn occupied_by_hand(id: &str) -> WorkflowError {
    WorkflowError::invalid_state(
        Entity::Bed,
        id,
        "available or maintenance (beds are occupied by allocation)",
        BedStatus::Occupied.as_str(),
    )
}
