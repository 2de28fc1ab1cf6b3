//! Console statistics for a finished crawl

use crate::output::traits::SessionReport;

/// Prints the end-of-run report to stdout
pub fn print_statistics(report: &SessionReport) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Seed: {}", report.seed_url);
    println!("  Backend: {}", report.backend);
    if let Some(duration) = report.duration_seconds() {
        println!("  Duration: {}s", duration);
    }
    println!("  Pages processed: {}", report.units_processed);
    println!();

    println!("Failures:");
    println!("  Retries scheduled: {}", report.retries_scheduled);
    println!("  Abandoned after retries: {}", report.units_abandoned);
    println!("  Ignored (non-retryable): {}", report.units_ignored);
    println!("  Stage faults: {}", report.stage_faults);
    println!("  Failed records: {}", report.failed_records);
    println!();

    println!("Filtered:");
    println!("  Duplicates dropped: {}", report.duplicates_dropped);
    println!("  Offsite links dropped: {}", report.offsite_filtered);
    println!();

    if !report.records_by_category.is_empty() {
        println!("Records by Category:");
        let mut categories: Vec<_> = report.records_by_category.iter().collect();
        categories.sort_by(|a, b| b.1.cmp(a.1));

        for (category, count) in categories {
            let percentage = if report.records_emitted > 0 {
                (*count as f64 / report.records_emitted as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", category, count, percentage);
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} product pages produced a record)",
        report.record_success_rate(),
        report.records_emitted,
        report.records_emitted + report.failed_records
    );
}
