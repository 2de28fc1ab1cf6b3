//! Markdown summary generation
//!
//! Writes a human-readable report of a finished crawl: run metadata, traversal
//! totals, record totals and the per-category breakdown.

use crate::output::traits::{SessionReport, SinkResult};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the markdown summary of a crawl to `output_path`
pub fn generate_markdown_summary(report: &SessionReport, output_path: &Path) -> SinkResult<()> {
    let markdown = format_markdown_summary(report);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a session report as markdown
pub fn format_markdown_summary(report: &SessionReport) -> String {
    let mut md = String::new();

    md.push_str("# Shelf Scout Crawl Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Seed**: {}\n", report.seed_url));
    md.push_str(&format!("- **Backend**: {}\n", report.backend));
    md.push_str(&format!("- **Started**: {}\n", report.started_at.to_rfc3339()));
    if let Some(finished) = report.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished.to_rfc3339()));
    }
    if let Some(duration) = report.duration_seconds() {
        md.push_str(&format!(
            "- **Duration**: {} seconds ({:.2} minutes)\n",
            duration,
            duration as f64 / 60.0
        ));
    }
    if !report.config_hash.is_empty() {
        md.push_str(&format!("- **Config Hash**: {}\n", report.config_hash));
    }
    md.push('\n');

    // Traversal
    md.push_str("## Traversal\n\n");
    md.push_str("| Event | Count |\n");
    md.push_str("|-------|-------|\n");
    md.push_str(&format!("| Pages processed | {} |\n", report.units_processed));
    md.push_str(&format!("| Retries scheduled | {} |\n", report.retries_scheduled));
    md.push_str(&format!("| Abandoned after retries | {} |\n", report.units_abandoned));
    md.push_str(&format!("| Ignored (non-retryable) | {} |\n", report.units_ignored));
    md.push_str(&format!("| Stage faults | {} |\n", report.stage_faults));
    md.push_str(&format!("| Duplicates dropped | {} |\n", report.duplicates_dropped));
    md.push_str(&format!("| Offsite links dropped | {} |\n\n", report.offsite_filtered));

    // Records
    md.push_str("## Records\n\n");
    md.push_str(&format!("- **Emitted**: {}\n", report.records_emitted));
    md.push_str(&format!("- **Failed**: {}\n", report.failed_records));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n\n",
        report.record_success_rate()
    ));

    if !report.records_by_category.is_empty() {
        md.push_str("## Records by Category\n\n");
        md.push_str("| Category | Records |\n");
        md.push_str("|----------|---------|\n");

        let mut categories: Vec<_> = report.records_by_category.iter().collect();
        categories.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        for (category, count) in categories {
            md.push_str(&format!("| {} | {} |\n", category, count));
        }
        md.push('\n');
    }

    md
}
