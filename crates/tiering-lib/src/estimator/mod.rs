//! Tiering Estimator
//!
//! Turns a collected [`MetricSet`] into a [`TieringReport`]: capacity
//! figures, the access-recency tier split, projected monthly operations and
//! an S3 Select projection. Missing inputs degrade individual figures to
//! [`crate::models::Figure::Undefined`]; only a missing capacity-used value fails the run.

mod policy;
mod projection;

pub use policy::TierPolicy;
pub use projection::{
    access_window, average_object_size, monthly_operations, project_monthly, select_projection,
    snapshot, DAYS_PER_MONTH,
};

use crate::config::EstimatorConfig;
use crate::error::EstimateError;
use crate::models::{
    AccessWindow, CollectorNote, CostEstimate, MetricName, MetricSet, MetricStatus, ResourceId,
    TieringOutcome, TieringReport, UndefinedReason, WindowSpan,
};
use crate::observability::StructuredLogger;
use chrono::{DateTime, Utc};
use tracing::debug;

/// Builds reports from collected metrics
pub struct Estimator {
    policy: TierPolicy,
    returned_ratio: f64,
}

impl Estimator {
    pub fn new(config: &EstimatorConfig) -> Self {
        Self {
            policy: TierPolicy::new(&config.tiering),
            returned_ratio: config.select.returned_ratio,
        }
    }

    /// Produce the report for `resource` from `set` as of `now`
    pub fn estimate(
        &self,
        resource: &ResourceId,
        region: &str,
        set: &MetricSet,
        now: DateTime<Utc>,
    ) -> Result<TieringReport, EstimateError> {
        let total_stored_bytes = total_stored_bytes(set)?;

        let seven = access_window(set, WindowSpan::SevenDay, now);
        let fourteen = access_window(set, WindowSpan::FourteenDay, now);

        let tiering = self.tier(total_stored_bytes, &seven, &fourteen);
        let monthly_operations = monthly_operations(&seven);
        let select = select_projection(&fourteen, self.returned_ratio);
        let snapshot = snapshot(set, total_stored_bytes, now);

        let access_ratio = match &tiering {
            TieringOutcome::Estimated { access_ratio, .. } => *access_ratio,
            TieringOutcome::Unavailable { .. } => None,
        };
        StructuredLogger::new(resource).log_estimate(
            total_stored_bytes,
            access_ratio,
            matches!(tiering, TieringOutcome::Estimated { .. }),
        );

        let notes = set
            .unavailable()
            .into_iter()
            .map(|(metric, reason)| CollectorNote { metric, reason })
            .collect();

        Ok(TieringReport {
            resource: resource.clone(),
            region: region.to_string(),
            generated_at: now,
            snapshot,
            windows: vec![seven, fourteen],
            cost: CostEstimate {
                tiering,
                monthly_operations,
            },
            select,
            notes,
        })
    }

    /// Tier split from the two recency windows
    pub fn tier(
        &self,
        total_stored_bytes: u64,
        seven: &AccessWindow,
        fourteen: &AccessWindow,
    ) -> TieringOutcome {
        if total_stored_bytes == 0 {
            return TieringOutcome::Unavailable {
                reason: UndefinedReason::EmptyVolume,
            };
        }

        let (recent, total) = match (seven.activity(), fourteen.activity()) {
            (Some(recent), Some(total)) => (recent, total),
            _ => {
                return TieringOutcome::Unavailable {
                    reason: UndefinedReason::InsufficientActivityData,
                }
            }
        };

        // An idle volume has no ratio; its bytes are split as fully cold
        let access_ratio = if total > 0.0 { Some(recent / total) } else { None };
        debug!(recent, total, ?access_ratio, "Computed access ratio");

        TieringOutcome::Estimated {
            access_ratio,
            buckets: self.policy.allocate(total_stored_bytes, access_ratio.unwrap_or(0.0)),
        }
    }
}

/// Latest valid user-data sample, the bytes a migration would move
fn total_stored_bytes(set: &MetricSet) -> Result<u64, EstimateError> {
    let metric = MetricName::StorageUsedUser;
    let latest = set
        .series(metric)
        .and_then(|s| s.latest_valid())
        .and_then(|s| s.value);

    match (latest, set.status(metric)) {
        (Some(bytes), _) => Ok(bytes.max(0.0).round() as u64),
        (None, MetricStatus::Unavailable { reason }) => Err(EstimateError::MissingCapacity(
            format!("{} unavailable: {}", metric, reason),
        )),
        (None, MetricStatus::Available { .. }) => Err(EstimateError::MissingCapacity(format!(
            "{} has no valid sample",
            metric
        ))),
    }
}
