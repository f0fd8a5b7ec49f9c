//! Report sink: CSV and JSON export plus the console run summary.
//!
//! The CSV column set and order are the published contract; downstream
//! consumers key on the header names. Export failure is fatal to the
//! publish step so the watermark is never advanced past unpublished data.

use anyhow::{Context, Result};
use csv::Writer;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::incident::EnrichedRecord;
use crate::pipeline::{RunReport, StageCounts};

/// Report column set, in publication order.
pub const CSV_COLUMNS: &[&str] = &[
    "Date of Breach",
    "Company Name",
    "Company Website",
    "Company Size",
    "Type of Breach",
    "CDN",
    "Security",
    "Country",
    "Contact Name",
    "Contact Title",
    "Contact Phone",
    "Contact Email",
    "LinkedIn URL",
    "Source",
];

pub fn export_csv(records: &[EnrichedRecord], output_path: &Path) -> Result<()> {
    debug!("Exporting {} records to CSV: {}", records.len(), output_path.display());

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory {:?}", parent))?;
        }
    }

    let file = File::create(output_path)
        .with_context(|| format!("Failed to create report file {:?}", output_path))?;
    let mut wtr = Writer::from_writer(file);

    wtr.write_record(CSV_COLUMNS)?;

    for record in records {
        wtr.write_record(&[
            &record.date,
            &record.company_name,
            &record.company_website,
            &record.company_size,
            &record.breach_type,
            &record.cdn,
            &record.security,
            &record.country,
            &record.contact_name,
            &record.contact_title,
            &record.contact_phone,
            &record.contact_email,
            &record.linkedin_url,
            &record.source,
        ])?;
    }

    wtr.flush()?;
    info!(
        "Exported {} records to CSV: {}",
        records.len(),
        output_path.display()
    );

    Ok(())
}

#[derive(serde::Serialize)]
struct JsonExport<'a> {
    run_date: String,
    counts: &'a StageCounts,
    records: &'a [EnrichedRecord],
}

pub fn export_json(report: &RunReport, output_path: &Path) -> Result<()> {
    debug!(
        "Exporting {} records to JSON: {}",
        report.records.len(),
        output_path.display()
    );

    let export = JsonExport {
        run_date: report.run_date.format("%Y-%m-%d").to_string(),
        counts: &report.counts,
        records: &report.records,
    };

    let json_string = serde_json::to_string_pretty(&export)?;
    let mut file = File::create(output_path)
        .with_context(|| format!("Failed to create JSON report {:?}", output_path))?;
    file.write_all(json_string.as_bytes())?;

    info!(
        "Exported {} records to JSON: {}",
        report.records.len(),
        output_path.display()
    );

    Ok(())
}

/// Compact run summary printed to stdout after a run.
pub fn print_run_summary(report: &RunReport) {
    let counts = &report.counts;

    println!("\n=== Run Summary ({}) ===", report.run_date.format("%Y-%m-%d"));
    println!("Incidents fetched:        {}", counts.fetched);
    println!("After dedup/watermark:    {}", counts.deduplicated);
    println!("Resolvable domains:       {}", counts.validated);
    println!("Passed size screen:       {}", counts.screened);
    println!("Discovered targets:       {}", counts.discovered);
    println!("Records published:        {}", counts.published);

    if report.records.is_empty() {
        println!("\nNo records to publish.");
        println!("===================================\n");
        return;
    }

    println!(
        "\n{:<14} {:<28} {:<24} {:<12} {}",
        "Date", "Domain", "Company", "Size", "Type"
    );
    for record in &report.records {
        println!(
            "{:<14} {:<28} {:<24} {:<12} {}",
            truncate(&record.date, 14),
            truncate(&record.company_website, 28),
            truncate(&record.company_name, 24),
            truncate(&record.company_size, 12),
            truncate(&record.breach_type, 40),
        );
    }
    println!("===================================\n");
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        value.to_string()
    } else {
        let kept: String = value.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}
