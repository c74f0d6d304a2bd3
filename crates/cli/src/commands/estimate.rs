//! The estimate command: collect, estimate, render

use anyhow::{Context, Result};
use chrono::Utc;
use colored::Colorize;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tabled::Tabled;
use tiering_lib::{
    price, run_estimate, AccessWindow, AwsSession, CloudWatchSource, CollectorMetrics,
    PricedEstimate, ResourceId, TieringError, TieringOutcome, TieringReport,
};

use crate::output::{
    format_bytes, format_count, format_currency, format_figure, format_optional, format_percent,
    print_info, print_section, print_table, print_warning, OutputFormat,
};
use crate::Cli;

/// Row for the label/value tables
#[derive(Tabled)]
struct FigureRow {
    #[tabled(rename = "Figure")]
    label: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

/// Row for the access window table
#[derive(Tabled)]
struct WindowRow {
    #[tabled(rename = "Window")]
    window: String,
    #[tabled(rename = "Read ops")]
    read_ops: String,
    #[tabled(rename = "Write ops")]
    write_ops: String,
    #[tabled(rename = "Metadata ops")]
    metadata_ops: String,
    #[tabled(rename = "Throughput/day")]
    throughput: String,
}

/// Row for the tier split table
#[derive(Tabled)]
struct TierRow {
    #[tabled(rename = "Tier")]
    tier: &'static str,
    #[tabled(rename = "Share")]
    share: String,
    #[tabled(rename = "Bytes")]
    bytes: String,
    #[tabled(rename = "Monthly cost")]
    cost: String,
}

/// JSON document printed with `--format json`
#[derive(Serialize)]
struct JsonOutput<'a> {
    report: &'a TieringReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pricing: Option<&'a PricedEstimate>,
}

/// Run the estimate for the volume named on the command line
pub async fn run(cli: &Cli) -> Result<()> {
    let config = crate::config::load(cli.config.as_deref())?;
    let session = AwsSession::connect(&cli.profile, &cli.region)
        .await
        .map_err(TieringError::from)?;

    let resource = ResourceId::new(&cli.fsx_id, &cli.volume_id);
    let metrics = match &cli.metrics_file {
        Some(_) => Some(CollectorMetrics::new().context("Failed to create collector metrics")?),
        None => None,
    };

    let source = Arc::new(CloudWatchSource::new(session.cloudwatch()));
    let outcome = run_estimate(
        source,
        &resource,
        session.region(),
        &config,
        metrics.clone(),
        Utc::now(),
    )
    .await;

    let export = cli.metrics_file.as_deref().zip(metrics.as_ref());
    let report = export_then(outcome, export)?;
    let priced = config.pricing.as_ref().map(|table| price(&report, table));

    match cli.format {
        OutputFormat::Json => {
            let doc = JsonOutput {
                report: &report,
                pricing: priced.as_ref(),
            };
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        OutputFormat::Table => print_report(&report, priced.as_ref()),
    }

    Ok(())
}

/// Write collector metrics, even for a failed run, then hand back the run outcome.
/// A failed write is only logged.
fn export_then<T, E>(
    outcome: Result<T, E>,
    export: Option<(&Path, &CollectorMetrics)>,
) -> Result<T, E> {
    if let Some((path, metrics)) = export {
        if let Err(e) = write_metrics(path, metrics) {
            tracing::warn!(error = %e, "Failed to write collector metrics");
        }
    }
    outcome
}

fn write_metrics(path: &Path, metrics: &CollectorMetrics) -> Result<()> {
    let text = metrics
        .render()
        .context("Failed to encode collector metrics")?;
    std::fs::write(path, text)
        .with_context(|| format!("Failed to write metrics to {}", path.display()))?;
    tracing::info!(path = %path.display(), "Wrote collector metrics");
    Ok(())
}

fn print_report(report: &TieringReport, priced: Option<&PricedEstimate>) {
    println!("{}", "FSx → S3 Intelligent-Tiering Estimate".bold());
    println!("{}", "=".repeat(60));
    println!("File system:            {}", report.resource.fsx_id.cyan());
    println!("Volume:                 {}", report.resource.volume_id.cyan());
    println!("Region:                 {}", report.region);
    println!(
        "Generated:              {}",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string().dimmed()
    );

    print_section("Storage");
    let s = &report.snapshot;
    print_table(vec![
        FigureRow {
            label: "User data (to migrate)",
            value: format_bytes(s.total_stored_bytes),
        },
        FigureRow {
            label: "Snapshot data",
            value: format_figure(&s.snapshot_bytes, format_bytes),
        },
        FigureRow {
            label: "Other data",
            value: format_figure(&s.other_bytes, format_bytes),
        },
        FigureRow {
            label: "Used",
            value: format_figure(&s.used_bytes, format_bytes),
        },
        FigureRow {
            label: "Capacity",
            value: format_figure(&s.capacity_bytes, format_bytes),
        },
        FigureRow {
            label: "Available",
            value: format_figure(&s.available_bytes, format_bytes),
        },
        FigureRow {
            label: "Utilization",
            value: format_figure(&s.utilization_percent, |p| format!("{:.1}%", p)),
        },
        FigureRow {
            label: "Files",
            value: format_figure(&s.file_count, format_count),
        },
        FigureRow {
            label: "Files capacity",
            value: format_figure(&s.files_capacity, format_count),
        },
        FigureRow {
            label: "Average object size",
            value: format_figure(&s.average_object_size_bytes, |b| format_bytes(b.round() as u64)),
        },
    ]);

    print_section("Access windows");
    print_table(report.windows.iter().map(window_row).collect());

    print_section("Tier projection");
    match &report.cost.tiering {
        TieringOutcome::Estimated {
            access_ratio,
            buckets,
        } => {
            match access_ratio {
                Some(r) => println!("Access ratio (7d / 14d): {:.3}", r),
                None => print_info("No read or write activity in 14 days; all bytes treated as cold"),
            }
            let rows = buckets
                .iter()
                .map(|b| TierRow {
                    tier: b.tier.label(),
                    share: format_percent(b.fraction),
                    bytes: format_bytes(b.bytes),
                    cost: priced
                        .and_then(|p| p.storage.iter().find(|c| c.tier == b.tier))
                        .map(|c| format_currency(c.monthly_usd, "USD"))
                        .unwrap_or_else(|| "-".to_string()),
                })
                .collect();
            print_table(rows);
        }
        TieringOutcome::Unavailable { reason } => {
            print_warning(&format!("Tier projection unavailable: {}", reason));
        }
    }

    print_section("Monthly operations (linear projection from 7 days)");
    let ops = &report.cost.monthly_operations;
    print_table(vec![
        FigureRow {
            label: "Read",
            value: format_figure(&ops.read, format_count),
        },
        FigureRow {
            label: "Write",
            value: format_figure(&ops.write, format_count),
        },
        FigureRow {
            label: "Metadata",
            value: format_figure(&ops.metadata, format_count),
        },
    ]);

    print_section("S3 Select (projection from 14-day reads)");
    let select = &report.select;
    print_table(vec![
        FigureRow {
            label: "Scanned per month",
            value: format_figure(&select.scanned_bytes_per_month, |b| {
                format_bytes(b.round() as u64)
            }),
        },
        FigureRow {
            label: "Returned per month",
            value: format_figure(&select.returned_bytes_per_month, |b| {
                format_bytes(b.round() as u64)
            }),
        },
        FigureRow {
            label: "Returned ratio",
            value: format_percent(select.returned_ratio),
        },
    ]);

    if let Some(p) = priced {
        print_section("Monthly cost (USD)");
        let usd = |v: f64| format_currency(v, "USD");
        print_table(vec![
            FigureRow {
                label: "Storage",
                value: format_figure(&p.storage_total_usd, usd),
            },
            FigureRow {
                label: "Write requests",
                value: format_figure(&p.write_requests_usd, usd),
            },
            FigureRow {
                label: "Read requests",
                value: format_figure(&p.read_requests_usd, usd),
            },
            FigureRow {
                label: "Monitoring & automation",
                value: format_figure(&p.monitoring_usd, usd),
            },
            FigureRow {
                label: "S3 Select",
                value: format_figure(&p.select_usd, usd),
            },
        ]);
        println!(
            "{} {}",
            "Total:".bold(),
            format_figure(&p.total_usd, usd).green().bold()
        );
    }

    if !report.notes.is_empty() {
        print_section("Collector notes");
        for note in &report.notes {
            print_warning(&format!("{}: {}", note.metric, note.reason));
        }
    }
}

fn window_row(window: &AccessWindow) -> WindowRow {
    let count = |v: f64| format_count(v.round() as u64);
    WindowRow {
        window: format!("{} days", window.span.days()),
        read_ops: format_optional(window.read_ops, count),
        write_ops: format_optional(window.write_ops, count),
        metadata_ops: format_optional(window.metadata_ops, count),
        throughput: format_optional(window.daily_throughput_bytes(), |b| {
            format_bytes(b.round() as u64)
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiering_lib::WindowSpan;

    #[test]
    fn test_window_row_labels_missing_counts() {
        let row = window_row(&AccessWindow {
            span: WindowSpan::SevenDay,
            read_ops: Some(700_000.0),
            write_ops: None,
            metadata_ops: None,
            read_bytes: Some(7.0 * 1024.0),
            write_bytes: None,
        });

        assert_eq!(row.window, "7 days");
        assert_eq!(row.read_ops, "700,000");
        assert_eq!(row.write_ops, "n/a");
        assert_eq!(row.throughput, "1.00Ki");
    }

    #[test]
    fn test_metrics_written_for_failed_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collector.prom");
        let metrics = CollectorMetrics::new().unwrap();

        let outcome: Result<(), &str> =
            export_then(Err("collection failed"), Some((path.as_path(), &metrics)));

        assert_eq!(outcome, Err("collection failed"));
        assert!(path.exists());
    }

    #[test]
    fn test_metrics_write_failure_keeps_run_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("collector.prom");
        let metrics = CollectorMetrics::new().unwrap();

        assert!(write_metrics(&path, &metrics).is_err());

        let failed: Result<(), &str> =
            export_then(Err("collection failed"), Some((path.as_path(), &metrics)));
        assert_eq!(failed, Err("collection failed"));

        let succeeded: Result<u64, &str> = export_then(Ok(42), Some((path.as_path(), &metrics)));
        assert_eq!(succeeded, Ok(42));
    }
}
