//! Dollar pricing of a tiering projection
//!
//! Prices are never built in; they come from the `[pricing]` table of the
//! configuration so they can track the target region's published rates.

use crate::error::ConfigError;
use crate::models::{AccessTier, Figure, TieringOutcome, TieringReport};
use serde::{Deserialize, Serialize};

const BYTES_PER_GB: f64 = 1_073_741_824.0;

/// Objects below this size are not charged monitoring and never leave Frequent Access
pub const MONITORING_MIN_OBJECT_BYTES: f64 = 128.0 * 1024.0;

/// Regional S3 Intelligent-Tiering prices in USD
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    pub frequent_per_gb_month: f64,
    pub infrequent_per_gb_month: f64,
    pub archive_instant_per_gb_month: f64,
    #[serde(default)]
    pub archive_per_gb_month: f64,
    #[serde(default)]
    pub deep_archive_per_gb_month: f64,
    /// PUT, COPY, POST, LIST requests
    pub write_requests_per_1000: f64,
    /// GET, SELECT and other read requests
    pub read_requests_per_1000: f64,
    /// Monitoring and automation charge
    pub monitoring_per_1000_objects: f64,
    #[serde(default)]
    pub select_scanned_per_gb: f64,
    #[serde(default)]
    pub select_returned_per_gb: f64,
}

impl PriceTable {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let prices = [
            self.frequent_per_gb_month,
            self.infrequent_per_gb_month,
            self.archive_instant_per_gb_month,
            self.archive_per_gb_month,
            self.deep_archive_per_gb_month,
            self.write_requests_per_1000,
            self.read_requests_per_1000,
            self.monitoring_per_1000_objects,
            self.select_scanned_per_gb,
            self.select_returned_per_gb,
        ];
        if prices.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(ConfigError::Invalid(
                "pricing entries must be finite and non-negative".to_string(),
            ));
        }
        Ok(())
    }

    fn storage_price(&self, tier: AccessTier) -> f64 {
        match tier {
            AccessTier::FrequentAccess => self.frequent_per_gb_month,
            AccessTier::InfrequentAccess => self.infrequent_per_gb_month,
            AccessTier::ArchiveInstantAccess => self.archive_instant_per_gb_month,
            AccessTier::ArchiveAccess => self.archive_per_gb_month,
            AccessTier::DeepArchiveAccess => self.deep_archive_per_gb_month,
        }
    }
}

/// Monthly storage charge for one tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierCharge {
    pub tier: AccessTier,
    pub monthly_usd: f64,
}

/// Monthly dollar figures for a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedEstimate {
    pub storage: Vec<TierCharge>,
    pub storage_total_usd: Figure<f64>,
    pub write_requests_usd: Figure<f64>,
    pub read_requests_usd: Figure<f64>,
    pub monitoring_usd: Figure<f64>,
    pub select_usd: Figure<f64>,
    /// Sum of every line; undefined when any line is
    pub total_usd: Figure<f64>,
}

/// Price a report's projection
pub fn price(report: &TieringReport, table: &PriceTable) -> PricedEstimate {
    let storage: Vec<TierCharge> = report
        .cost
        .tiering
        .buckets()
        .iter()
        .map(|b| TierCharge {
            tier: b.tier,
            monthly_usd: b.bytes as f64 / BYTES_PER_GB * table.storage_price(b.tier),
        })
        .collect();

    let storage_total_usd = match &report.cost.tiering {
        TieringOutcome::Unavailable { reason } => Figure::Undefined(reason.clone()),
        TieringOutcome::Estimated { .. } => Figure::Value(storage.iter().map(|c| c.monthly_usd).sum()),
    };

    let ops = &report.cost.monthly_operations;
    let write_requests_usd = ops
        .write
        .clone()
        .map(|n| n as f64 / 1000.0 * table.write_requests_per_1000);
    let read_requests_usd = ops
        .read
        .clone()
        .map(|n| n as f64 / 1000.0 * table.read_requests_per_1000);

    let monitoring_usd = match (
        &report.snapshot.file_count,
        &report.snapshot.average_object_size_bytes,
    ) {
        (Figure::Value(count), Figure::Value(avg)) => {
            let monitored = if *avg >= MONITORING_MIN_OBJECT_BYTES {
                *count as f64
            } else {
                0.0
            };
            Figure::Value(monitored / 1000.0 * table.monitoring_per_1000_objects)
        }
        (Figure::Undefined(reason), _) | (_, Figure::Undefined(reason)) => {
            Figure::Undefined(reason.clone())
        }
    };

    let select_usd = match (
        &report.select.scanned_bytes_per_month,
        &report.select.returned_bytes_per_month,
    ) {
        (Figure::Value(scanned), Figure::Value(returned)) => Figure::Value(
            scanned / BYTES_PER_GB * table.select_scanned_per_gb
                + returned / BYTES_PER_GB * table.select_returned_per_gb,
        ),
        (Figure::Undefined(reason), _) | (_, Figure::Undefined(reason)) => {
            Figure::Undefined(reason.clone())
        }
    };

    let lines = [
        &storage_total_usd,
        &write_requests_usd,
        &read_requests_usd,
        &monitoring_usd,
        &select_usd,
    ];
    let total_usd = match lines.iter().find_map(|l| match l {
        Figure::Undefined(r) => Some(r.clone()),
        Figure::Value(_) => None,
    }) {
        Some(reason) => Figure::Undefined(reason),
        None => Figure::Value(lines.iter().filter_map(|l| l.value()).sum()),
    };

    PricedEstimate {
        storage,
        storage_total_usd,
        write_requests_usd,
        read_requests_usd,
        monitoring_usd,
        select_usd,
        total_usd,
    }
}
