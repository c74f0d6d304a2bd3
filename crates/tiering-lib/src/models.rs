//! Core data models for the tiering estimator

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// CloudWatch namespace for all FSx metrics
pub const FSX_NAMESPACE: &str = "AWS/FSx";

/// File system and volume pair the metrics are scoped to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceId {
    pub fsx_id: String,
    pub volume_id: String,
}

impl ResourceId {
    pub fn new(fsx_id: impl Into<String>, volume_id: impl Into<String>) -> Self {
        Self {
            fsx_id: fsx_id.into(),
            volume_id: volume_id.into(),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.fsx_id, self.volume_id)
    }
}

/// Statistic requested from CloudWatch for a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Statistic {
    Average,
    Sum,
    Maximum,
}

/// Whether the latest value or the windowed total of a metric matters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricKind {
    Snapshot,
    Activity,
}

/// Unit of a metric's samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricUnit {
    Bytes,
    Count,
}

/// Every metric the estimator reads from CloudWatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricName {
    StorageCapacity,
    StorageUsedUser,
    StorageUsedSnapshot,
    StorageUsedOther,
    FilesUsed,
    FilesCapacity,
    DataReadOperations,
    DataWriteOperations,
    MetadataOperations,
    DataReadBytes,
    DataWriteBytes,
}

impl MetricName {
    pub const ALL: [MetricName; 11] = [
        MetricName::StorageCapacity,
        MetricName::StorageUsedUser,
        MetricName::StorageUsedSnapshot,
        MetricName::StorageUsedOther,
        MetricName::FilesUsed,
        MetricName::FilesCapacity,
        MetricName::DataReadOperations,
        MetricName::DataWriteOperations,
        MetricName::MetadataOperations,
        MetricName::DataReadBytes,
        MetricName::DataWriteBytes,
    ];

    /// Metric name as published in the `AWS/FSx` namespace
    pub fn cloudwatch_name(&self) -> &'static str {
        match self {
            MetricName::StorageCapacity => "StorageCapacity",
            MetricName::StorageUsedUser
            | MetricName::StorageUsedSnapshot
            | MetricName::StorageUsedOther => "StorageUsed",
            MetricName::FilesUsed => "FilesUsed",
            MetricName::FilesCapacity => "FilesCapacity",
            MetricName::DataReadOperations => "DataReadOperations",
            MetricName::DataWriteOperations => "DataWriteOperations",
            MetricName::MetadataOperations => "MetadataOperations",
            MetricName::DataReadBytes => "DataReadBytes",
            MetricName::DataWriteBytes => "DataWriteBytes",
        }
    }

    pub fn statistic(&self) -> Statistic {
        match self {
            MetricName::FilesCapacity => Statistic::Maximum,
            MetricName::StorageCapacity
            | MetricName::StorageUsedUser
            | MetricName::StorageUsedSnapshot
            | MetricName::StorageUsedOther
            | MetricName::FilesUsed => Statistic::Average,
            _ => Statistic::Sum,
        }
    }

    pub fn kind(&self) -> MetricKind {
        match self.statistic() {
            Statistic::Sum => MetricKind::Activity,
            _ => MetricKind::Snapshot,
        }
    }

    pub fn unit(&self) -> MetricUnit {
        match self {
            MetricName::StorageCapacity
            | MetricName::StorageUsedUser
            | MetricName::StorageUsedSnapshot
            | MetricName::StorageUsedOther
            | MetricName::DataReadBytes
            | MetricName::DataWriteBytes => MetricUnit::Bytes,
            _ => MetricUnit::Count,
        }
    }

    /// Dimensions beyond `FileSystemId` and `VolumeId`
    pub fn extra_dimensions(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            MetricName::StorageUsedUser => &[("StorageTier", "All"), ("DataType", "User")],
            MetricName::StorageUsedSnapshot => &[("StorageTier", "All"), ("DataType", "Snapshot")],
            MetricName::StorageUsedOther => &[("StorageTier", "All"), ("DataType", "Other")],
            _ => &[],
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims = self.extra_dimensions();
        match dims.iter().find(|(k, _)| *k == "DataType") {
            Some((_, data_type)) => write!(f, "{}[{}]", self.cloudwatch_name(), data_type),
            None => f.write_str(self.cloudwatch_name()),
        }
    }
}

/// Bounded query window `[start, end)` with a fixed sample period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub period_secs: i64,
}

/// One sample slot; `None` means the provider returned no datapoint for it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub value: Option<f64>,
}

/// Time series for one metric of one resource, aligned to its period grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    pub metric: MetricName,
    pub unit: MetricUnit,
    pub window: MetricWindow,
    samples: Vec<Sample>,
}

impl MetricSeries {
    /// Align raw datapoints onto the window's period grid.
    ///
    /// Datapoints outside the window are dropped, a later duplicate for the
    /// same slot replaces an earlier one, and slots with no datapoint stay
    /// `None`.
    pub fn from_datapoints(
        metric: MetricName,
        window: MetricWindow,
        datapoints: impl IntoIterator<Item = (DateTime<Utc>, f64)>,
    ) -> Self {
        let period = window.period_secs.max(1);
        let span = (window.end - window.start).num_seconds().max(0);
        let slots = ((span + period - 1) / period) as usize;

        let mut samples: Vec<Sample> = (0..slots)
            .map(|i| Sample {
                timestamp: window.start + Duration::seconds(i as i64 * period),
                value: None,
            })
            .collect();

        for (timestamp, value) in datapoints {
            if timestamp < window.start || timestamp >= window.end || !value.is_finite() {
                continue;
            }
            let idx = ((timestamp - window.start).num_seconds() / period) as usize;
            if let Some(slot) = samples.get_mut(idx) {
                slot.value = Some(value);
            }
        }

        Self {
            metric,
            unit: metric.unit(),
            window,
            samples,
        }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Most recent sample that carries a value
    pub fn latest_valid(&self) -> Option<Sample> {
        self.samples.iter().rev().find(|s| s.value.is_some()).copied()
    }

    /// Sum of valid samples at or after `since`; `None` when no slot in range has a value
    pub fn sum_since(&self, since: DateTime<Utc>) -> Option<f64> {
        self.samples
            .iter()
            .filter(|s| s.timestamp >= since)
            .filter_map(|s| s.value)
            .fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
    }

    pub fn valid_count(&self) -> usize {
        self.samples.iter().filter(|s| s.value.is_some()).count()
    }
}

/// Why a metric could not be returned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnavailableReason {
    NotCollected,
    NoDatapoints,
    RetriesExhausted { attempts: u32, last_error: String },
    ProviderError { message: String },
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnavailableReason::NotCollected => f.write_str("not collected"),
            UnavailableReason::NoDatapoints => f.write_str("no datapoints in window"),
            UnavailableReason::RetriesExhausted { attempts, last_error } => {
                write!(f, "gave up after {} attempts: {}", attempts, last_error)
            }
            UnavailableReason::ProviderError { message } => write!(f, "provider error: {}", message),
        }
    }
}

/// Collection outcome for one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MetricStatus {
    Available { series: MetricSeries },
    Unavailable { reason: UnavailableReason },
}

/// Typed mapping from metric name to its collection outcome.
///
/// Every requested metric has an entry; metrics that were never filled in
/// read as [`UnavailableReason::NotCollected`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSet {
    entries: BTreeMap<MetricName, MetricStatus>,
}

impl MetricSet {
    pub fn new(requested: &[MetricName]) -> Self {
        let entries = requested
            .iter()
            .map(|m| {
                (
                    *m,
                    MetricStatus::Unavailable {
                        reason: UnavailableReason::NotCollected,
                    },
                )
            })
            .collect();
        Self { entries }
    }

    /// Record a collected series; a series without any valid sample is stored as unavailable
    pub fn insert_series(&mut self, series: MetricSeries) {
        let metric = series.metric;
        let status = if series.valid_count() == 0 {
            MetricStatus::Unavailable {
                reason: UnavailableReason::NoDatapoints,
            }
        } else {
            MetricStatus::Available { series }
        };
        self.entries.insert(metric, status);
    }

    pub fn mark_unavailable(&mut self, metric: MetricName, reason: UnavailableReason) {
        self.entries
            .insert(metric, MetricStatus::Unavailable { reason });
    }

    pub fn status(&self, metric: MetricName) -> MetricStatus {
        self.entries
            .get(&metric)
            .cloned()
            .unwrap_or(MetricStatus::Unavailable {
                reason: UnavailableReason::NotCollected,
            })
    }

    pub fn series(&self, metric: MetricName) -> Option<&MetricSeries> {
        match self.entries.get(&metric) {
            Some(MetricStatus::Available { series }) => Some(series),
            _ => None,
        }
    }

    /// Metrics that ended up unavailable, with the reason
    pub fn unavailable(&self) -> Vec<(MetricName, UnavailableReason)> {
        self.entries
            .iter()
            .filter_map(|(name, status)| match status {
                MetricStatus::Unavailable { reason } => Some((*name, reason.clone())),
                MetricStatus::Available { .. } => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Why a derived figure has no value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedReason {
    /// A metric it depends on was unavailable
    MetricUnavailable(MetricName),
    /// The divisor was zero
    ZeroDenominator,
    /// The volume stores no bytes
    EmptyVolume,
    /// The recency windows lacked operation data
    InsufficientActivityData,
}

impl fmt::Display for UndefinedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UndefinedReason::MetricUnavailable(m) => write!(f, "{} unavailable", m),
            UndefinedReason::ZeroDenominator => f.write_str("zero denominator"),
            UndefinedReason::EmptyVolume => f.write_str("volume is empty"),
            UndefinedReason::InsufficientActivityData => {
                f.write_str("insufficient operation data in the 7/14-day windows")
            }
        }
    }
}

/// A derived number, or an explicit statement of why it cannot be computed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Figure<T> {
    Value(T),
    Undefined(UndefinedReason),
}

impl<T: Copy> Figure<T> {
    pub fn value(&self) -> Option<T> {
        match self {
            Figure::Value(v) => Some(*v),
            Figure::Undefined(_) => None,
        }
    }
}

impl<T> Figure<T> {
    pub fn is_defined(&self) -> bool {
        matches!(self, Figure::Value(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Figure<U> {
        match self {
            Figure::Value(v) => Figure::Value(f(v)),
            Figure::Undefined(r) => Figure::Undefined(r),
        }
    }

    pub fn from_option(value: Option<T>, reason: UndefinedReason) -> Self {
        match value {
            Some(v) => Figure::Value(v),
            None => Figure::Undefined(reason),
        }
    }
}

/// Named lookback period used as a recency horizon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowSpan {
    SevenDay,
    FourteenDay,
}

impl WindowSpan {
    pub fn days(&self) -> i64 {
        match self {
            WindowSpan::SevenDay => 7,
            WindowSpan::FourteenDay => 14,
        }
    }
}

/// Aggregate activity observed over one lookback period.
///
/// Each count is `None` when the window holds no valid sample for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessWindow {
    pub span: WindowSpan,
    pub read_ops: Option<f64>,
    pub write_ops: Option<f64>,
    pub metadata_ops: Option<f64>,
    pub read_bytes: Option<f64>,
    pub write_bytes: Option<f64>,
}

impl AccessWindow {
    /// Read plus write operations; uses whichever is present when one is missing
    pub fn activity(&self) -> Option<f64> {
        sum_present(self.read_ops, self.write_ops)
    }

    /// Read plus write bytes averaged per day
    pub fn daily_throughput_bytes(&self) -> Option<f64> {
        sum_present(self.read_bytes, self.write_bytes).map(|b| b / self.span.days() as f64)
    }
}

fn sum_present(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (None, None) => None,
        (a, b) => Some(a.unwrap_or(0.0) + b.unwrap_or(0.0)),
    }
}

/// S3 Intelligent-Tiering access class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessTier {
    FrequentAccess,
    InfrequentAccess,
    ArchiveInstantAccess,
    ArchiveAccess,
    DeepArchiveAccess,
}

impl AccessTier {
    pub fn label(&self) -> &'static str {
        match self {
            AccessTier::FrequentAccess => "Frequent Access",
            AccessTier::InfrequentAccess => "Infrequent Access",
            AccessTier::ArchiveInstantAccess => "Archive Instant Access",
            AccessTier::ArchiveAccess => "Archive Access",
            AccessTier::DeepArchiveAccess => "Deep Archive Access",
        }
    }
}

/// Estimated byte allocation to one access tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierBucket {
    pub tier: AccessTier,
    pub bytes: u64,
    pub fraction: f64,
}

/// Point-in-time capacity figures for the volume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSystemSnapshot {
    pub taken_at: DateTime<Utc>,
    /// User data bytes; the volume of data a migration would move
    pub total_stored_bytes: u64,
    pub capacity_bytes: Figure<u64>,
    pub snapshot_bytes: Figure<u64>,
    pub other_bytes: Figure<u64>,
    pub used_bytes: Figure<u64>,
    pub available_bytes: Figure<u64>,
    pub utilization_percent: Figure<f64>,
    pub file_count: Figure<u64>,
    pub files_capacity: Figure<u64>,
    pub average_object_size_bytes: Figure<f64>,
}

/// Tier split, or why none could be produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TieringOutcome {
    Estimated {
        /// 7-day over 14-day activity; `None` for an idle volume
        access_ratio: Option<f64>,
        buckets: Vec<TierBucket>,
    },
    Unavailable {
        reason: UndefinedReason,
    },
}

impl TieringOutcome {
    pub fn buckets(&self) -> &[TierBucket] {
        match self {
            TieringOutcome::Estimated { buckets, .. } => buckets,
            TieringOutcome::Unavailable { .. } => &[],
        }
    }
}

/// Monthly request counts extrapolated linearly from the last 7 days (x 30/7)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyOperations {
    pub read: Figure<u64>,
    pub write: Figure<u64>,
    pub metadata: Figure<u64>,
}

/// Count-and-byte projection a pricing function can consume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub tiering: TieringOutcome,
    pub monthly_operations: MonthlyOperations,
}

/// Monthly S3 Select volumes projected from 14-day read throughput
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectProjection {
    pub scanned_bytes_per_month: Figure<f64>,
    pub returned_bytes_per_month: Figure<f64>,
    pub returned_ratio: f64,
}

/// A metric the collector could not deliver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectorNote {
    pub metric: MetricName,
    pub reason: UnavailableReason,
}

/// Everything the report renderer needs for one volume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TieringReport {
    pub resource: ResourceId,
    pub region: String,
    pub generated_at: DateTime<Utc>,
    pub snapshot: FileSystemSnapshot,
    pub windows: Vec<AccessWindow>,
    pub cost: CostEstimate,
    pub select: SelectProjection,
    pub notes: Vec<CollectorNote>,
}
