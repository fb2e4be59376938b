use anyhow::{Result, bail};
use healthhub_beds::Reconciler;

use crate::cli::OutputFormat;
use crate::output::{print_success, print_value, print_warning, report_table, summary_table};

pub async fn reconcile(reconciler: &Reconciler, apply: bool, format: OutputFormat) -> Result<()> {
    let report = reconciler.plan().await?;
    print_value(&report, format, report_table)?;

    if report.is_consistent() {
        print_success("Beds match their active allocations");
        return Ok(());
    }
    if !apply {
        print_warning(&format!(
            "{} of {} drifts can be repaired; rerun with --apply",
            report.fixable().count(),
            report.drifts.len()
        ));
        return Ok(());
    }

    let summary = reconciler.apply(&report).await;
    print_value(&summary, format, summary_table)?;
    if !summary.failed.is_empty() {
        bail!("{} bed repairs failed", summary.failed.len());
    }
    print_success(&format!("Repaired {} beds", summary.applied.len()));
    Ok(())
}
