//! Bed status reconciliation.
//!
//! A bed's status is derived from the allocations that reference it. After a
//! partial failure the two can disagree; the reconciler recomputes every bed
//! from the set of active allocations:
//! - an occupied bed with no active allocation is released
//! - a bed with exactly one active allocation is occupied and bound to it
//! - double bookings and allocations on missing beds are reported, not fixed

use std::collections::BTreeMap;

use healthhub_core::{AllocationStatus, Bed, BedAllocation, BedStatus, allocation, bed};
use healthhub_storage::{DynStore, Filter, ID_COLUMN, Query, SortParam};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::outcome::{Entity, WorkflowError};
use crate::records::{BedBinding, decode_allocation, decode_bed, encode};
use crate::tables::TableNames;

/// Rows fetched per request while scanning a table.
const SCAN_PAGE_SIZE: u32 = 500;

/// How a bed disagrees with its allocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DriftKind {
    /// Occupied, but no active allocation references the bed.
    StaleOccupied,
    /// Available, but still carries a patient or allocation reference.
    StaleBinding,
    /// Exactly one active allocation, but the bed is not occupied by it.
    Unbound {
        allocation_id: String,
        patient_id: String,
    },
    /// More than one active allocation references the bed.
    DoubleBooked { allocation_ids: Vec<String> },
    /// Active allocations reference a bed that does not exist.
    MissingBed { allocation_ids: Vec<String> },
}

/// A bed whose stored state disagrees with its allocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BedDrift {
    pub bed_id: String,
    /// Status seen while planning; `None` for a missing bed.
    pub observed: Option<BedStatus>,
    /// Allocation reference seen while planning.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_allocation_id: Option<String>,
    #[serde(flatten)]
    pub kind: DriftKind,
}

impl BedDrift {
    /// Whether [`Reconciler::apply`] repairs this drift.
    pub fn is_fixable(&self) -> bool {
        matches!(
            self.kind,
            DriftKind::StaleOccupied | DriftKind::StaleBinding | DriftKind::Unbound { .. }
        )
    }
}

/// Result of [`Reconciler::plan`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileReport {
    pub beds_checked: usize,
    pub active_allocations: usize,
    pub drifts: Vec<BedDrift>,
}

impl ReconcileReport {
    pub fn is_consistent(&self) -> bool {
        self.drifts.is_empty()
    }

    pub fn fixable(&self) -> impl Iterator<Item = &BedDrift> {
        self.drifts.iter().filter(|d| d.is_fixable())
    }
}

/// Result of [`Reconciler::apply`].
#[derive(Debug, Default, Serialize)]
pub struct ApplySummary {
    /// Beds rewritten.
    pub applied: Vec<String>,
    /// Beds that changed since planning, or vanished, and were left alone.
    pub skipped: Vec<String>,
    /// Beds whose repair failed, with the error message.
    pub failed: Vec<(String, String)>,
    /// Drifts only an operator can resolve.
    pub unresolved: usize,
}

/// Recomputes bed status from active allocations.
#[derive(Clone)]
pub struct Reconciler {
    store: DynStore,
    tables: TableNames,
}

impl Reconciler {
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

    /// Compares every bed with the active allocations and lists the drifts.
    #[instrument(skip(self))]
    pub async fn plan(&self) -> Result<ReconcileReport, WorkflowError> {
        // 1. Load beds and active allocations
        let beds = self
            .scan(&self.tables.beds, Filter::new())
            .await?
            .into_iter()
            .map(decode_bed)
            .collect::<Result<Vec<Bed>, _>>()?;
        let active = self
            .scan(
                &self.tables.allocations,
                Filter::new().and_eq(allocation::fields::STATUS, AllocationStatus::Active.as_str()),
            )
            .await?
            .into_iter()
            .map(decode_allocation)
            .collect::<Result<Vec<BedAllocation>, _>>()?;

        let mut report = ReconcileReport {
            beds_checked: beds.len(),
            active_allocations: active.len(),
            drifts: Vec::new(),
        };

        // 2. Group active allocations by bed
        let mut by_bed: BTreeMap<String, Vec<BedAllocation>> = BTreeMap::new();
        for allocation in active {
            by_bed.entry(allocation.bed_id.clone()).or_default().push(allocation);
        }

        // 3. Check every bed against its allocations
        for bed in &beds {
            let allocations = by_bed.remove(&bed.id).unwrap_or_default();
            if let Some(kind) = classify(bed, &allocations) {
                report.drifts.push(BedDrift {
                    bed_id: bed.id.clone(),
                    observed: Some(bed.status),
                    observed_allocation_id: bed.allocation_id.clone(),
                    kind,
                });
            }
        }

        // 4. Whatever is left points at beds that do not exist
        for (bed_id, allocations) in by_bed {
            report.drifts.push(BedDrift {
                bed_id,
                observed: None,
                observed_allocation_id: None,
                kind: DriftKind::MissingBed {
                    allocation_ids: allocations.into_iter().map(|a| a.id).collect(),
                },
            });
        }

        info!(
            beds = report.beds_checked,
            active_allocations = report.active_allocations,
            drifts = report.drifts.len(),
            "bed reconciliation planned"
        );
        Ok(report)
    }

    /// Repairs the fixable drifts of a report.
    ///
    /// Each repair is conditioned on the status and allocation reference
    /// observed while planning, so a bed that changed in between is skipped
    /// rather than overwritten.
    #[instrument(skip(self, report))]
    pub async fn apply(&self, report: &ReconcileReport) -> ApplySummary {
        let mut summary = ApplySummary {
            unresolved: report.drifts.len() - report.fixable().count(),
            ..ApplySummary::default()
        };

        for drift in report.fixable() {
            let Some(observed) = drift.observed else {
                continue;
            };
            let patch = match repair_patch(drift) {
                Ok(patch) => patch,
                Err(err) => {
                    summary.failed.push((drift.bed_id.clone(), err.to_string()));
                    continue;
                }
            };
            let filter = Filter::by_id(drift.bed_id.as_str())
                .and_eq(bed::fields::STATUS, observed.as_str());
            let filter = match &drift.observed_allocation_id {
                Some(id) => filter.and_eq(bed::fields::ALLOCATION_ID, id.as_str()),
                None => filter.and_null(bed::fields::ALLOCATION_ID),
            };

            match self
                .store
                .update_where(&self.tables.beds, &filter, &patch)
                .await
            {
                Ok(_) => summary.applied.push(drift.bed_id.clone()),
                Err(err) if err.is_condition_failed() || err.is_not_found() => {
                    warn!(bed_id = %drift.bed_id, "bed changed since planning, skipped");
                    summary.skipped.push(drift.bed_id.clone());
                }
                Err(err) => summary.failed.push((drift.bed_id.clone(), err.to_string())),
            }
        }

        info!(
            applied = summary.applied.len(),
            skipped = summary.skipped.len(),
            failed = summary.failed.len(),
            unresolved = summary.unresolved,
            "bed reconciliation applied"
        );
        summary
    }

    /// Reads every matching row, page by page.
    async fn scan(&self, table: &str, filter: Filter) -> Result<Vec<Value>, WorkflowError> {
        let mut rows = Vec::new();
        let mut offset = 0;
        loop {
            let query = Query::new()
                .with_filter(filter.clone())
                .with_order(SortParam::asc(ID_COLUMN))
                .with_limit(SCAN_PAGE_SIZE)
                .with_offset(offset);
            let page = self.store.select(table, &query).await?;
            let fetched = page.len();
            rows.extend(page.records);
            if fetched < SCAN_PAGE_SIZE as usize {
                return Ok(rows);
            }
            offset += SCAN_PAGE_SIZE;
        }
    }
}

fn classify(bed: &Bed, allocations: &[BedAllocation]) -> Option<DriftKind> {
    match allocations {
        [] => match bed.status {
            BedStatus::Occupied => Some(DriftKind::StaleOccupied),
            BedStatus::Available if bed.patient_id.is_some() || bed.allocation_id.is_some() => {
                Some(DriftKind::StaleBinding)
            }
            _ => None,
        },
        [only] => {
            let bound = bed.is_bound_to(&only.id)
                && bed.patient_id.as_deref() == Some(only.patient_id.as_str());
            (!bound).then(|| DriftKind::Unbound {
                allocation_id: only.id.clone(),
                patient_id: only.patient_id.clone(),
            })
        }
        many => Some(DriftKind::DoubleBooked {
            allocation_ids: many.iter().map(|a| a.id.clone()).collect(),
        }),
    }
}

fn repair_patch(drift: &BedDrift) -> Result<Value, WorkflowError> {
    let repair = match &drift.kind {
        DriftKind::Unbound {
            allocation_id,
            patient_id,
        } => BedBinding {
            status: BedStatus::Occupied,
            patient_id: Some(patient_id.as_str()),
            allocation_id: Some(allocation_id.as_str()),
        },
        _ => BedBinding::released(),
    };
    encode(Entity::Bed, &repair)
}
