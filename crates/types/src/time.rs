//! Microsecond time primitives.
//!
//! All time inside the core is absolute microseconds since the Unix epoch
//! (`Instant`) or a non-negative microsecond count (`DurationMicros`).
//! Sub-microsecond sources are truncated at the edges.

use serde::{Deserialize, Serialize};

// =============================================================================
// Time Types
// =============================================================================

/// Absolute time: signed microseconds since the Unix epoch.
pub type Instant = i64;

/// A time step or span, in microseconds. Always non-negative.
pub type DurationMicros = i64;

pub const MICROS_PER_SECOND: DurationMicros = 1_000_000;
pub const MICROS_PER_MINUTE: DurationMicros = 60 * MICROS_PER_SECOND;
pub const MICROS_PER_HOUR: DurationMicros = 60 * MICROS_PER_MINUTE;
pub const MICROS_PER_DAY: DurationMicros = 24 * MICROS_PER_HOUR;

/// Align an instant down to a multiple of `step`.
///
/// Uses euclidean division so pre-epoch instants align downward as well.
#[inline]
pub fn floor_to(t: Instant, step: DurationMicros) -> Instant {
    debug_assert!(step > 0, "alignment step must be positive");
    t.div_euclid(step) * step
}

// =============================================================================
// TimeRange
// =============================================================================

/// Half-open interval `[start, end)` of instants with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Instant,
    pub end: Instant,
}

impl TimeRange {
    /// Create a new range. `start` must not exceed `end`.
    pub fn new(start: Instant, end: Instant) -> Self {
        debug_assert!(start <= end, "time range start must not exceed end");
        Self { start, end }
    }

    /// Empty when `start == end`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether the instant falls inside the half-open interval.
    #[inline]
    pub fn contains(&self, t: Instant) -> bool {
        self.start <= t && t < self.end
    }

    /// Total span in microseconds.
    #[inline]
    pub fn duration(&self) -> DurationMicros {
        self.end - self.start
    }
}

// =============================================================================
// Duration Formatting
// =============================================================================

/// Render a duration as a compact suffix form (`30s`, `5m`, `1h`, `2d`),
/// falling back to raw microseconds when no unit divides it evenly.
pub fn format_duration(d: DurationMicros) -> String {
    for (unit, suffix) in [
        (MICROS_PER_DAY, "d"),
        (MICROS_PER_HOUR, "h"),
        (MICROS_PER_MINUTE, "m"),
        (MICROS_PER_SECOND, "s"),
    ] {
        if d >= unit && d % unit == 0 {
            return format!("{}{}", d / unit, suffix);
        }
    }
    format!("{}us", d)
}

/// Parse a compact duration form (`30s`, `5m`, `1h`, `2d`, `250us`).
///
/// Returns `None` for malformed input or a non-positive count.
pub fn parse_duration(s: &str) -> Option<DurationMicros> {
    let (digits, unit) = match s {
        _ if s.ends_with("us") => (&s[..s.len() - 2], 1),
        _ if s.ends_with('s') => (&s[..s.len() - 1], MICROS_PER_SECOND),
        _ if s.ends_with('m') => (&s[..s.len() - 1], MICROS_PER_MINUTE),
        _ if s.ends_with('h') => (&s[..s.len() - 1], MICROS_PER_HOUR),
        _ if s.ends_with('d') => (&s[..s.len() - 1], MICROS_PER_DAY),
        _ => return None,
    };
    let count: i64 = digits.parse().ok()?;
    if count <= 0 {
        return None;
    }
    Some(count * unit)
}
