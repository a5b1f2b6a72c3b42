/// `part` as a percentage of `whole`. Returns `0.0` when `whole` is not
/// positive; that zero means "no data yet", not a measured zero.
pub fn percentage(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    let pct = part as f64 / whole as f64 * 100.0;
    if pct.is_finite() { pct } else { 0.0 }
}

/// Share of the all-time `total` that was produced inside the window.
///
/// This is not period-over-period growth and must not be displayed as a
/// rate of change.
pub fn period_share(total: i64, period: i64) -> f64 {
    percentage(period, total)
}
