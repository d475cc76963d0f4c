//! Centralized detection thresholds for the inventory anomaly rules.
//!
//! Changing a value here affects every detector in `anomaly.rs` and the
//! confidence scoring in `insights.rs`. Quantities are in the item's base
//! unit; ratios are expressed as whole percents.

/// Absolute stock-count variance (base units) below which an occurrence
/// is ignored by every detector.
pub const MIN_VARIANCE_QTY: i64 = 1;

/// Qualifying occurrences within the lookback that trigger the
/// repeated-high-variance alert.
pub const REPEATED_OCCURRENCES: usize = 2;

/// Qualifying occurrences that escalate a repeated-variance alert to
/// critical.
pub const CRITICAL_OCCURRENCES: usize = 3;

/// Percentage increase between the two most recent counts that triggers
/// a spike alert.
pub const SPIKE_THRESHOLD_PERCENT: i64 = 50;

/// Percentage increase at which a spike or trend alert becomes critical.
pub const CRITICAL_INCREASE_PERCENT: i64 = 100;

/// A variance with no prior history is alertable once it reaches this
/// multiple of `MIN_VARIANCE_QTY`.
pub const NEW_VARIANCE_MULTIPLIER: i64 = 3;

/// A spiking variance must also reach this multiple of
/// `MIN_VARIANCE_QTY` in absolute terms.
pub const SPIKE_MIN_MULTIPLIER: i64 = 2;

/// ISO weeks kept by the worsening-trend detector.
pub const TREND_WEEKS: usize = 4;

/// Weekly buckets required before a trend is evaluated at all.
pub const MIN_TREND_WEEKS: usize = 3;

/// Week-over-week average increase that counts as a worsening
/// transition.
pub const WORSENING_THRESHOLD_PERCENT: i64 = 25;

/// Worsening transitions within the window that trigger a trend alert.
pub const MIN_WORSENING_TRANSITIONS: usize = 2;

/// Confidence scoring starts here and never drops below the floor.
pub const CONFIDENCE_START: i64 = 100;
pub const CONFIDENCE_FLOOR: i64 = 40;

/// Shift durations beyond this many hours are capped when averaging, so
/// a shift left open overnight cannot dominate the baseline.
pub const SHIFT_CAP_HOURS: i64 = 24;
