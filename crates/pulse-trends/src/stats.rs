//! Pure statistical primitives for trend reporting
//!
//! Every function here is deterministic and total: identical inputs give
//! identical outputs, and every division carries a defined fallback instead
//! of panicking or returning NaN.

/// Elapsed-time floor for benchmark rates, in days.
///
/// A single day of history would otherwise inflate per-week and per-month
/// averages.
const MIN_ELAPSED_DAYS: f64 = 7.0;

/// Nearest-rank percentile.
///
/// Sorts ascending and picks index `ceil(p/100 * n) - 1`, clamped to the
/// valid range. This is not linear interpolation: the result is always one
/// of the input values. `percentile(values, 100)` is the max and
/// `percentile(values, 0)` the min. Empty input yields `None`.
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let rank = (p / 100.0 * n as f64).ceil() as i64 - 1;
    let index = rank.clamp(0, n as i64 - 1) as usize;
    Some(sorted[index])
}

/// Percentage change from `previous` to `current`.
///
/// A zero baseline is special-cased: going from nothing to something reads
/// as a full positive swing (100), staying at nothing reads as no change
/// (0).
pub fn growth_rate(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        if current > 0.0 {
            100.0
        } else {
            0.0
        }
    } else {
        (current - previous) / previous * 100.0
    }
}

/// Long-run average per `unit_days` (7 for weekly, 30 for monthly rates).
///
/// `total / max(elapsed_days / unit_days, 1)`, with `elapsed_days` floored
/// at [`MIN_ELAPSED_DAYS`].
pub fn benchmark_average(total: f64, elapsed_days: f64, unit_days: f64) -> f64 {
    let elapsed = elapsed_days.max(MIN_ELAPSED_DAYS);
    let units = (elapsed / unit_days).max(1.0);
    total / units
}
