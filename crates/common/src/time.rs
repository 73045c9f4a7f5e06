//! Time arithmetic helpers for schedule computations.
//!
//! All Splicer times are `f64` seconds. Schedules are built from sums
//! and differences of those values, so comparisons that decide
//! containment or overlap go through a small absolute tolerance instead
//! of raw `<`/`==`.

use serde::{Deserialize, Serialize};

/// Absolute tolerance (seconds) for comparing schedule times.
pub const TIME_EPSILON: f64 = 1e-6;

/// `a == b` within [`TIME_EPSILON`].
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= TIME_EPSILON
}

/// `a <= b` within [`TIME_EPSILON`].
pub fn approx_le(a: f64, b: f64) -> bool {
    a <= b + TIME_EPSILON
}

/// `a < b` by more than [`TIME_EPSILON`].
pub fn definitely_lt(a: f64, b: f64) -> bool {
    a < b - TIME_EPSILON
}

/// A half-open time interval `[start, end)` in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSpan {
    pub start: f64,
    pub end: f64,
}

impl TimeSpan {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Span starting at `start` lasting `duration` seconds.
    pub fn starting_at(start: f64, duration: f64) -> Self {
        Self {
            start,
            end: start + duration,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether `t` falls in `[start, end)`.
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t < self.end
    }

    /// Whether `other` lies entirely inside this span (tolerant).
    pub fn encloses(&self, other: &TimeSpan) -> bool {
        approx_le(self.start, other.start) && approx_le(other.end, self.end)
    }

    /// Whether the two half-open spans share any time (tolerant).
    ///
    /// Spans that only touch at an endpoint do not overlap.
    pub fn overlaps(&self, other: &TimeSpan) -> bool {
        definitely_lt(self.start, other.end) && definitely_lt(other.start, self.end)
    }

    /// Intersection of two spans, if non-empty.
    pub fn intersection(&self, other: &TimeSpan) -> Option<TimeSpan> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (end > start).then_some(TimeSpan { start, end })
    }

    /// Shift both endpoints by `offset` seconds.
    pub fn shifted(&self, offset: f64) -> TimeSpan {
        TimeSpan {
            start: self.start + offset,
            end: self.end + offset,
        }
    }
}

/// Split seconds into (hours, minutes, seconds, millis), rounding to the
/// nearest millisecond.
pub fn split_millis(secs: f64) -> (u64, u64, u64, u64) {
    let total_ms = (secs.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let seconds = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    (hours, minutes, seconds, millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tolerant_comparisons() {
        assert!(approx_eq(27.5, 20.0 + 15.0 - 7.5));
        assert!(approx_le(35.0000001, 35.0));
        assert!(!definitely_lt(35.0, 35.0000001));
        assert!(definitely_lt(34.9, 35.0));
    }

    #[test]
    fn test_touching_spans_do_not_overlap() {
        let a = TimeSpan::new(0.0, 20.0);
        let b = TimeSpan::new(20.0, 35.0);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&TimeSpan::new(19.0, 21.0)));
    }

    #[test]
    fn test_encloses_and_intersection() {
        let outer = TimeSpan::starting_at(20.0, 15.0);
        assert!(outer.encloses(&TimeSpan::new(27.5, 35.0)));
        assert!(!outer.encloses(&TimeSpan::new(27.5, 36.0)));

        let inter = outer.intersection(&TimeSpan::new(30.0, 40.0)).unwrap();
        assert_eq!(inter, TimeSpan::new(30.0, 35.0));
        assert!(outer.intersection(&TimeSpan::new(35.0, 40.0)).is_none());
    }

    #[test]
    fn test_split_millis() {
        assert_eq!(split_millis(0.0), (0, 0, 0, 0));
        assert_eq!(split_millis(3661.5), (1, 1, 1, 500));
        // 27.4999999 rounds instead of truncating to 499ms
        assert_eq!(split_millis(27.4999999), (0, 0, 27, 500));
    }
}
