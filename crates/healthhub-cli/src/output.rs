use anyhow::Result;
use colored::Colorize;
use healthhub_beds::{
    AllocationWithBed, ApplySummary, BedDrift, DriftKind, PartialFailure, ReconcileReport,
};
use healthhub_core::{Bed, BedAllocation};
use serde::Serialize;
use serde_json::{Value, json};
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::cli::OutputFormat;

/// Prints `value` as pretty JSON, or through `table` for the table format.
pub fn print_value<T: Serialize>(
    value: &T,
    format: OutputFormat,
    table: impl FnOnce(&T) -> String,
) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Table => println!("{}", table(value)),
    }
    Ok(())
}

pub fn print_success(msg: &str) {
    eprintln!("{} {}", "✓".green(), msg);
}

pub fn print_warning(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Reports a partial failure: the error on stderr, the ids needed for
/// reconciliation on stdout when JSON is requested.
pub fn print_partial(partial: &PartialFailure, format: OutputFormat) -> Result<()> {
    print_error(&partial.to_string());
    print_warning(&format!(
        "{} needs attention; run `healthhub reconcile` to repair bed {}",
        partial.artifact_id().cyan(),
        partial.bed_id.cyan()
    ));
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&partial_body(partial))?);
    }
    Ok(())
}

pub fn partial_body(partial: &PartialFailure) -> Value {
    json!({
        "outcome": "partial_failure",
        "operation": partial.operation,
        "kind": partial.kind,
        "allocation_id": partial.allocation_id,
        "bed_id": partial.bed_id,
        "error": partial.source.to_string(),
    })
}

fn or_dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

fn render(builder: Builder) -> String {
    builder.build().with(Style::rounded()).to_string()
}

pub fn beds_table(beds: &[Bed]) -> String {
    if beds.is_empty() {
        return "No beds found.".to_string();
    }
    let mut builder = Builder::default();
    builder.push_record(["ID", "Number", "Floor", "Ward", "Status", "Patient", "Allocation"]);
    for bed in beds {
        builder.push_record([
            bed.id.clone(),
            bed.bed_number.clone(),
            bed.floor.to_string(),
            bed.ward.clone(),
            bed.status.to_string(),
            or_dash(bed.patient_id.as_deref()).to_string(),
            or_dash(bed.allocation_id.as_deref()).to_string(),
        ]);
    }
    render(builder)
}

pub fn bed_table(bed: &Bed) -> String {
    beds_table(std::slice::from_ref(bed))
}

pub fn allocation_table(allocation: &BedAllocation) -> String {
    let discharged = allocation
        .discharge_date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "-".into());
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (field, value) in [
        ("ID", allocation.id.clone()),
        ("Bed", allocation.bed_id.clone()),
        ("Patient", allocation.patient_id.clone()),
        ("Status", allocation.status.to_string()),
        ("Admitted", allocation.admission_date.to_string()),
        ("Discharged", discharged),
        ("Notes", or_dash(allocation.notes.as_deref()).to_string()),
    ] {
        builder.push_record([field.to_string(), value]);
    }
    render(builder)
}

pub fn stays_table(stays: &[AllocationWithBed]) -> String {
    if stays.is_empty() {
        return "No allocations found.".to_string();
    }
    let mut builder = Builder::default();
    builder.push_record(["ID", "Status", "Admitted", "Discharged", "Bed", "Ward"]);
    for stay in stays {
        let allocation = &stay.allocation;
        let (bed, ward) = match &stay.bed {
            Some(bed) => (bed.bed_number.clone(), bed.ward.clone()),
            None => (format!("{} (removed)", allocation.bed_id), "-".to_string()),
        };
        builder.push_record([
            allocation.id.clone(),
            allocation.status.to_string(),
            allocation.admission_date.to_string(),
            allocation
                .discharge_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".into()),
            bed,
            ward,
        ]);
    }
    render(builder)
}

fn drift_detail(drift: &BedDrift) -> String {
    match &drift.kind {
        DriftKind::StaleOccupied => "occupied without an active allocation".into(),
        DriftKind::StaleBinding => "available but still bound".into(),
        DriftKind::Unbound {
            allocation_id,
            patient_id,
        } => format!("not bound to allocation {allocation_id} (patient {patient_id})"),
        DriftKind::DoubleBooked { allocation_ids } => {
            format!("double booked: {}", allocation_ids.join(", "))
        }
        DriftKind::MissingBed { allocation_ids } => {
            format!("bed missing for: {}", allocation_ids.join(", "))
        }
    }
}

pub fn report_table(report: &ReconcileReport) -> String {
    let header = format!(
        "Checked {} beds against {} active allocations.",
        report.beds_checked, report.active_allocations
    );
    if report.is_consistent() {
        return format!("{header}\nNo drift found.");
    }
    let mut builder = Builder::default();
    builder.push_record(["Bed", "Observed", "Drift", "Repair"]);
    for drift in &report.drifts {
        builder.push_record([
            drift.bed_id.clone(),
            drift
                .observed
                .map(|s| s.to_string())
                .unwrap_or_else(|| "missing".into()),
            drift_detail(drift),
            if drift.is_fixable() { "auto" } else { "manual" }.to_string(),
        ]);
    }
    format!("{header}\n{}", render(builder))
}

pub fn summary_table(summary: &ApplySummary) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Bed", "Result"]);
    for id in &summary.applied {
        builder.push_record([id.as_str(), "repaired"]);
    }
    for id in &summary.skipped {
        builder.push_record([id.as_str(), "skipped (changed since planning)"]);
    }
    for (id, error) in &summary.failed {
        builder.push_record([id.clone(), format!("failed: {error}")]);
    }
    format!(
        "{}\nRepaired: {}, skipped: {}, failed: {}, needs manual review: {}",
        render(builder),
        summary.applied.len(),
        summary.skipped.len(),
        summary.failed.len(),
        summary.unresolved
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use healthhub_core::BedStatus;

    fn bed(id: &str, status: BedStatus) -> Bed {
        Bed {
            id: id.into(),
            bed_number: format!("N-{id}"),
            floor: 2,
            ward: "Cardiology".into(),
            status,
            patient_id: None,
            allocation_id: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_beds_table_lists_each_bed() {
        let table = beds_table(&[bed("b1", BedStatus::Available), bed("b2", BedStatus::Maintenance)]);
        assert!(table.contains("N-b1"));
        assert!(table.contains("maintenance"));
        assert!(table.contains("Cardiology"));
        assert_eq!(beds_table(&[]), "No beds found.");
    }

    #[test]
    fn test_report_table_marks_manual_repairs() {
        let report = ReconcileReport {
            beds_checked: 2,
            active_allocations: 2,
            drifts: vec![
                BedDrift {
                    bed_id: "b1".into(),
                    observed: Some(BedStatus::Occupied),
                    observed_allocation_id: None,
                    kind: DriftKind::StaleOccupied,
                },
                BedDrift {
                    bed_id: "b2".into(),
                    observed: None,
                    observed_allocation_id: None,
                    kind: DriftKind::MissingBed {
                        allocation_ids: vec!["a1".into(), "a2".into()],
                    },
                },
            ],
        };
        let table = report_table(&report);
        assert!(table.starts_with("Checked 2 beds against 2 active allocations."));
        assert!(table.contains("auto"));
        assert!(table.contains("manual"));
        assert!(table.contains("bed missing for: a1, a2"));

        let clean = ReconcileReport {
            beds_checked: 1,
            ..ReconcileReport::default()
        };
        assert!(report_table(&clean).ends_with("No drift found."));
    }
}
