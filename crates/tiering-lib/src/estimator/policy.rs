//! Access-ratio to tier-fraction policy
//!
//! Maps the 7-day over 14-day activity ratio onto a split of stored bytes
//! across Intelligent-Tiering access tiers. The mapping is deterministic and
//! monotonic: a higher ratio never yields a smaller Frequent share.

use crate::config::TieringConfig;
use crate::models::{AccessTier, TierBucket};

/// Tier split driven by [`TieringConfig`] thresholds
#[derive(Debug, Clone)]
pub struct TierPolicy {
    frequent_threshold: f64,
    infrequent_threshold: f64,
    max_frequent_fraction: f64,
    archive_enabled: bool,
}

impl TierPolicy {
    pub fn new(config: &TieringConfig) -> Self {
        Self {
            frequent_threshold: config.access_ratio_frequent_threshold,
            infrequent_threshold: config.access_ratio_infrequent_threshold,
            max_frequent_fraction: config.max_frequent_fraction.clamp(0.0, 1.0),
            archive_enabled: config.archive_enabled,
        }
    }

    /// Tiers listed in every split, warmest first
    pub fn tiers(&self) -> &'static [AccessTier] {
        if self.archive_enabled {
            &[
                AccessTier::FrequentAccess,
                AccessTier::InfrequentAccess,
                AccessTier::ArchiveInstantAccess,
                AccessTier::ArchiveAccess,
                AccessTier::DeepArchiveAccess,
            ]
        } else {
            &[
                AccessTier::FrequentAccess,
                AccessTier::InfrequentAccess,
                AccessTier::ArchiveInstantAccess,
            ]
        }
    }

    /// Tier that receives bytes with no recent access
    pub fn coldest_tier(&self) -> AccessTier {
        if self.archive_enabled {
            AccessTier::DeepArchiveAccess
        } else {
            AccessTier::ArchiveInstantAccess
        }
    }

    /// Fractions per tier for an access ratio; they sum to 1.0
    pub fn fractions(&self, ratio: f64) -> Vec<(AccessTier, f64)> {
        let r = if ratio.is_finite() { ratio.clamp(0.0, 1.0) } else { 0.0 };

        let span = self.frequent_threshold - self.infrequent_threshold;
        let warmth = if span > 0.0 {
            ((r - self.infrequent_threshold) / span).clamp(0.0, 1.0)
        } else if r >= self.frequent_threshold {
            1.0
        } else {
            0.0
        };
        let frequent = self.max_frequent_fraction * warmth;
        let cold = 1.0 - frequent;

        let coldest_share = if self.infrequent_threshold > 0.0 {
            ((self.infrequent_threshold - r) / self.infrequent_threshold).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let coldest = cold * coldest_share;
        let infrequent = cold - coldest;

        let coldest_tier = self.coldest_tier();
        let raw: Vec<(AccessTier, f64)> = self
            .tiers()
            .iter()
            .map(|&tier| {
                let fraction = match tier {
                    AccessTier::FrequentAccess => frequent,
                    AccessTier::InfrequentAccess => infrequent,
                    t if t == coldest_tier => coldest,
                    _ => 0.0,
                };
                (tier, fraction)
            })
            .collect();

        normalize(raw)
    }

    /// Split `total_bytes` by the fractions for `ratio`
    pub fn allocate(&self, total_bytes: u64, ratio: f64) -> Vec<TierBucket> {
        allocate_bytes(total_bytes, self.fractions(ratio))
    }
}

/// Clamp each fraction to [0, 1] and rescale so they sum to exactly 1.0
fn normalize(mut fractions: Vec<(AccessTier, f64)>) -> Vec<(AccessTier, f64)> {
    for (_, f) in fractions.iter_mut() {
        *f = if f.is_finite() { f.clamp(0.0, 1.0) } else { 0.0 };
    }

    let sum: f64 = fractions.iter().map(|(_, f)| *f).sum();
    if sum <= 0.0 {
        // Nothing assignable: everything stays in Frequent Access
        for (tier, f) in fractions.iter_mut() {
            *f = if *tier == AccessTier::FrequentAccess { 1.0 } else { 0.0 };
        }
        return fractions;
    }

    for (_, f) in fractions.iter_mut() {
        *f /= sum;
    }

    let residual = 1.0 - fractions.iter().map(|(_, f)| *f).sum::<f64>();
    if let Some(largest) = largest_index(fractions.iter().map(|(_, f)| *f)) {
        fractions[largest].1 = (fractions[largest].1 + residual).clamp(0.0, 1.0);
    }
    fractions
}

/// Whole-byte buckets; the largest bucket absorbs rounding so bytes sum to the total
fn allocate_bytes(total_bytes: u64, fractions: Vec<(AccessTier, f64)>) -> Vec<TierBucket> {
    let mut buckets: Vec<TierBucket> = fractions
        .into_iter()
        .map(|(tier, fraction)| TierBucket {
            tier,
            bytes: (total_bytes as f64 * fraction).round() as u64,
            fraction,
        })
        .collect();

    if let Some(largest) = largest_index(buckets.iter().map(|b| b.fraction)) {
        let others: u64 = buckets
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != largest)
            .map(|(_, b)| b.bytes)
            .sum();
        buckets[largest].bytes = total_bytes.saturating_sub(others);
    }
    buckets
}

fn largest_index(values: impl Iterator<Item = f64>) -> Option<usize> {
    values
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(i, _)| i)
}
