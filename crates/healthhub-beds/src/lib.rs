//! # healthhub-beds
//!
//! Bed allocation for the HealthHub service: the allocate/discharge workflow,
//! bed and allocation lookups, and the reconciliation sweep.
//!
//! Beds and allocations live in two tables of a [`RecordStore`] that offers no
//! multi-row transaction. Every two-step operation therefore returns a
//! [`WorkflowOutcome`] that tells a full success and a clean failure apart
//! from a partial failure, where the allocation was written but the bed was
//! not. [`Reconciler`] repairs beds from the active allocations afterwards.
//!
//! ## Example
//!
//! ```ignore
//! use healthhub_beds::{AllocationWorkflow, WorkflowOutcome};
//! use healthhub_core::now_utc;
//!
//! let workflow = AllocationWorkflow::new(store.clone());
//! match workflow.allocate(&bed_id, &patient_id, now_utc(), None).await {
//!     WorkflowOutcome::Success(allocation) => println!("admitted: {}", allocation.id),
//!     WorkflowOutcome::Failed(err) => eprintln!("not admitted: {err}"),
//!     WorkflowOutcome::PartialFailure(partial) => eprintln!("needs reconcile: {partial}"),
//! }
//! ```
//!
//! [`RecordStore`]: healthhub_storage::RecordStore

pub mod directory;
pub mod outcome;
pub mod reconcile;
mod records;
pub mod tables;
pub mod workflow;

pub use directory::{AllocationWithBed, BedDirectory, BedPage, DEFAULT_PAGE_SIZE};
pub use outcome::{
    Entity, FailureKind, Operation, OutcomeError, PartialFailure, WorkflowError, WorkflowOutcome,
};
pub use reconcile::{ApplySummary, BedDrift, DriftKind, ReconcileReport, Reconciler};
pub use tables::TableNames;
pub use workflow::AllocationWorkflow;
