//! Window aggregation and linear monthly projections

use crate::models::{
    AccessWindow, FileSystemSnapshot, Figure, MetricName, MetricSet, MonthlyOperations,
    SelectProjection, UndefinedReason, WindowSpan,
};
use chrono::{DateTime, Duration, Utc};

/// Days in the projected month
pub const DAYS_PER_MONTH: f64 = 30.0;

/// Sum each activity metric over the last `span` days.
///
/// A collected series holds at least one valid sample, so an empty span
/// means every sample is older than the span: zero recent activity. A
/// metric that was never collected stays `None`.
pub fn access_window(set: &MetricSet, span: WindowSpan, now: DateTime<Utc>) -> AccessWindow {
    let since = now - Duration::days(span.days());
    let sum = |metric: MetricName| set.series(metric).map(|s| s.sum_since(since).unwrap_or(0.0));

    AccessWindow {
        span,
        read_ops: sum(MetricName::DataReadOperations),
        write_ops: sum(MetricName::DataWriteOperations),
        metadata_ops: sum(MetricName::MetadataOperations),
        read_bytes: sum(MetricName::DataReadBytes),
        write_bytes: sum(MetricName::DataWriteBytes),
    }
}

/// Scale a count observed over `days` to a 30-day month, rounded half away from zero
pub fn project_monthly(count: Option<f64>, days: i64, metric: MetricName) -> Figure<u64> {
    match count {
        Some(c) => Figure::Value((c.max(0.0) * DAYS_PER_MONTH / days as f64).round() as u64),
        None => Figure::Undefined(UndefinedReason::MetricUnavailable(metric)),
    }
}

/// Monthly request counts per class from a recency window
pub fn monthly_operations(window: &AccessWindow) -> MonthlyOperations {
    let days = window.span.days();
    MonthlyOperations {
        read: project_monthly(window.read_ops, days, MetricName::DataReadOperations),
        write: project_monthly(window.write_ops, days, MetricName::DataWriteOperations),
        metadata: project_monthly(window.metadata_ops, days, MetricName::MetadataOperations),
    }
}

/// Capacity and file-count figures from the latest valid samples
pub fn snapshot(set: &MetricSet, total_stored_bytes: u64, now: DateTime<Utc>) -> FileSystemSnapshot {
    let capacity_bytes = latest(set, MetricName::StorageCapacity);
    let snapshot_bytes = latest(set, MetricName::StorageUsedSnapshot);
    let other_bytes = latest(set, MetricName::StorageUsedOther);
    let file_count = latest(set, MetricName::FilesUsed);
    let files_capacity = latest(set, MetricName::FilesCapacity);

    let used_bytes = match (&snapshot_bytes, &other_bytes) {
        (Figure::Value(snap), Figure::Value(other)) => {
            Figure::Value(total_stored_bytes.saturating_add(*snap).saturating_add(*other))
        }
        (Figure::Undefined(reason), _) | (_, Figure::Undefined(reason)) => {
            Figure::Undefined(reason.clone())
        }
    };

    let available_bytes = match (&capacity_bytes, &used_bytes) {
        (Figure::Value(capacity), Figure::Value(used)) => Figure::Value(capacity.saturating_sub(*used)),
        (Figure::Undefined(reason), _) | (_, Figure::Undefined(reason)) => {
            Figure::Undefined(reason.clone())
        }
    };

    let utilization_percent = match (&capacity_bytes, &used_bytes) {
        (Figure::Value(0), _) => Figure::Undefined(UndefinedReason::ZeroDenominator),
        (Figure::Value(capacity), Figure::Value(used)) => {
            Figure::Value(*used as f64 / *capacity as f64 * 100.0)
        }
        (Figure::Undefined(reason), _) | (_, Figure::Undefined(reason)) => {
            Figure::Undefined(reason.clone())
        }
    };

    let average_object_size_bytes = average_object_size(total_stored_bytes, &file_count);

    FileSystemSnapshot {
        taken_at: now,
        total_stored_bytes,
        capacity_bytes,
        snapshot_bytes,
        other_bytes,
        used_bytes,
        available_bytes,
        utilization_percent,
        file_count,
        files_capacity,
        average_object_size_bytes,
    }
}

/// Stored bytes per file; undefined for an unknown or zero file count
pub fn average_object_size(total_stored_bytes: u64, file_count: &Figure<u64>) -> Figure<f64> {
    match file_count {
        Figure::Value(0) => Figure::Undefined(UndefinedReason::ZeroDenominator),
        Figure::Value(count) => Figure::Value(total_stored_bytes as f64 / *count as f64),
        Figure::Undefined(reason) => Figure::Undefined(reason.clone()),
    }
}

/// Monthly S3 Select volumes assuming today's read throughput is served by Select
pub fn select_projection(window: &AccessWindow, returned_ratio: f64) -> SelectProjection {
    let scanned = project_bytes(window.read_bytes, window.span.days());
    let returned = scanned.clone().map(|bytes| bytes * returned_ratio);

    SelectProjection {
        scanned_bytes_per_month: scanned,
        returned_bytes_per_month: returned,
        returned_ratio,
    }
}

fn project_bytes(bytes: Option<f64>, days: i64) -> Figure<f64> {
    Figure::from_option(
        bytes.map(|b| b.max(0.0) / days as f64 * DAYS_PER_MONTH),
        UndefinedReason::MetricUnavailable(MetricName::DataReadBytes),
    )
}

fn latest(set: &MetricSet, metric: MetricName) -> Figure<u64> {
    Figure::from_option(
        set.series(metric)
            .and_then(|s| s.latest_valid())
            .and_then(|s| s.value)
            .map(|v| v.max(0.0).round() as u64),
        UndefinedReason::MetricUnavailable(metric),
    )
}
