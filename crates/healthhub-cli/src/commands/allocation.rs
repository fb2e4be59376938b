use anyhow::Result;
use colored::Colorize;
use healthhub_beds::{AllocationWorkflow, BedDirectory, WorkflowOutcome};
use healthhub_core::now_utc;

use super::Completion;
use crate::cli::{AllocateArgs, DischargeArgs, OutputFormat};
use crate::output::{allocation_table, print_partial, print_success, print_value, stays_table};

pub async fn allocate(
    workflow: &AllocationWorkflow,
    args: &AllocateArgs,
    format: OutputFormat,
) -> Result<Completion> {
    let admission = args.admission.unwrap_or_else(now_utc);
    let outcome = workflow
        .allocate(&args.bed, &args.patient, admission, args.notes.as_deref())
        .await;
    match outcome {
        WorkflowOutcome::Success(allocation) => {
            print_success(&format!(
                "Patient {} admitted to bed {} (allocation {})",
                allocation.patient_id.cyan(),
                allocation.bed_id.cyan(),
                allocation.id.cyan()
            ));
            print_value(&allocation, format, allocation_table)?;
            Ok(Completion::Done)
        }
        WorkflowOutcome::Failed(err) => {
            Err(anyhow::Error::new(err).context(format!("Failed to allocate bed {}", args.bed)))
        }
        WorkflowOutcome::PartialFailure(partial) => {
            print_partial(&partial, format)?;
            Ok(Completion::Partial)
        }
    }
}

pub async fn discharge(
    workflow: &AllocationWorkflow,
    args: &DischargeArgs,
    format: OutputFormat,
) -> Result<Completion> {
    match workflow.discharge(&args.allocation_id, args.at).await {
        WorkflowOutcome::Success(allocation) => {
            print_success(&format!(
                "Allocation {} discharged, bed {} released",
                allocation.id.cyan(),
                allocation.bed_id.cyan()
            ));
            print_value(&allocation, format, allocation_table)?;
            Ok(Completion::Done)
        }
        WorkflowOutcome::Failed(err) => Err(anyhow::Error::new(err)
            .context(format!("Failed to discharge allocation {}", args.allocation_id))),
        WorkflowOutcome::PartialFailure(partial) => {
            print_partial(&partial, format)?;
            Ok(Completion::Partial)
        }
    }
}

pub async fn patient_allocations(
    directory: &BedDirectory,
    patient_id: &str,
    format: OutputFormat,
) -> Result<()> {
    let stays = directory.patient_allocations(patient_id).await?;
    print_value(&stays, format, |stays| stays_table(stays))
}
