//! Query window clamping and period selection

use crate::config::MAX_LOOKBACK_DAYS;
use crate::models::MetricWindow;
use chrono::{DateTime, Duration, TimeZone, Utc};

/// CloudWatch returns at most 1440 datapoints per request; stay under it
const MAX_DATAPOINTS: i64 = 1400;

/// Finest period requested
pub const MIN_PERIOD_SECS: i64 = 300;

/// Smallest period that keeps a window of `span_secs` under the datapoint limit,
/// rounded up to a whole minute and never below five minutes
pub fn select_period(span_secs: i64) -> i64 {
    let min_period = (span_secs.max(0) + MAX_DATAPOINTS - 1) / MAX_DATAPOINTS;
    let rounded = ((min_period + 59) / 60) * 60;
    rounded.max(MIN_PERIOD_SECS)
}

/// Clamp a requested range to `[now - 14d, now]`
pub fn clamp_range(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let earliest = now - Duration::days(MAX_LOOKBACK_DAYS);
    let end = end.min(now);
    let start = start.max(earliest).min(end);
    (start, end)
}

/// Build the query window for a requested range.
///
/// The start is rounded up to a period boundary so the grid never reaches
/// before the clamped range.
pub fn metric_window(start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> MetricWindow {
    let (start, end) = clamp_range(start, end, now);
    let period_secs = select_period((end - start).num_seconds());

    let ts = start.timestamp();
    let rem = ts.rem_euclid(period_secs);
    let aligned = if rem == 0 { ts } else { ts + (period_secs - rem) };
    let start = Utc
        .timestamp_opt(aligned, 0)
        .single()
        .unwrap_or(start)
        .min(end);

    MetricWindow {
        start,
        end,
        period_secs,
    }
}

/// Window covering the `lookback` before `now`
pub fn lookback_window(now: DateTime<Utc>, lookback: Duration) -> MetricWindow {
    metric_window(now - lookback, now, now)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 34, 56).unwrap()
    }

    #[test]
    fn test_period_floor_is_five_minutes() {
        assert_eq!(select_period(3600), 300);
        assert_eq!(select_period(86_400), 300);
    }

    #[test]
    fn test_period_for_fourteen_days() {
        // 1_209_600 / 1400 = 864 -> rounded up to 900
        assert_eq!(select_period(14 * 86_400), 900);
        // 604_800 / 1400 = 432 -> rounded up to 480
        assert_eq!(select_period(7 * 86_400), 480);
    }

    #[test]
    fn test_window_never_exceeds_retention() {
        let w = lookback_window(now(), Duration::days(30));
        assert!(w.start >= now() - Duration::days(MAX_LOOKBACK_DAYS));
        assert_eq!(w.end, now());
    }

    #[test]
    fn test_future_end_clamped_to_now() {
        let (start, end) = clamp_range(now() - Duration::hours(1), now() + Duration::days(1), now());
        assert_eq!(end, now());
        assert_eq!(start, now() - Duration::hours(1));
    }

    #[test]
    fn test_inverted_range_collapses() {
        let (start, end) = clamp_range(now() + Duration::hours(2), now() + Duration::hours(3), now());
        assert_eq!(start, end);
    }

    #[test]
    fn test_start_aligned_to_period() {
        let w = lookback_window(now(), Duration::days(14));
        assert_eq!(w.start.timestamp() % w.period_secs, 0);
        assert!(w.start >= now() - Duration::days(14));
        // 1400 datapoints at most
        assert!((w.end - w.start).num_seconds() / w.period_secs <= MAX_DATAPOINTS);
    }
}
