//! Nearest-sample lookup for sparse telemetry series.

use chrono::{DateTime, Utc};
use std::fmt;

/// One parsed telemetry point. Values are validated non-negative at parse time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimestampedSample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl TimestampedSample {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Which end of the report window a value is being resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    RangeStart,
    RangeEnd,
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::RangeStart => f.write_str("start"),
            Edge::RangeEnd => f.write_str("end"),
        }
    }
}

/// Outcome of a lookup, distinguishing an in-range hit from a fallback so the
/// caller can report which one was used.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// A sample on the requested side of the target.
    Direct(TimestampedSample),
    /// No sample on the requested side; nearest the series had.
    Fallback(TimestampedSample),
}

impl Resolution {
    pub fn sample(&self) -> TimestampedSample {
        match *self {
            Resolution::Direct(s) | Resolution::Fallback(s) => s,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Resolution::Fallback(_))
    }
}

/// Picks the sample that best represents `target` for the given edge.
///
/// `samples` must be sorted ascending by timestamp.
///
/// - [`Edge::RangeStart`]: earliest sample at or after `target`, else the first sample.
/// - [`Edge::RangeEnd`]: latest sample at or before `target`, else the last sample.
///
/// Returns `None` only for an empty series.
pub fn resolve_sample(
    samples: &[TimestampedSample],
    target: DateTime<Utc>,
    edge: Edge,
) -> Option<Resolution> {
    let first = *samples.first()?;
    let last = *samples.last()?;

    match edge {
        Edge::RangeStart => {
            let idx = samples.partition_point(|s| s.timestamp < target);
            Some(match samples.get(idx) {
                Some(s) => Resolution::Direct(*s),
                None => Resolution::Fallback(first),
            })
        }
        Edge::RangeEnd => {
            let idx = samples.partition_point(|s| s.timestamp <= target);
            Some(match idx.checked_sub(1) {
                Some(i) => Resolution::Direct(samples[i]),
                None => Resolution::Fallback(last),
            })
        }
    }
}

/// Value-only form of [`resolve_sample`].
pub fn resolve(samples: &[TimestampedSample], target: DateTime<Utc>, edge: Edge) -> Option<f64> {
    resolve_sample(samples, target, edge).map(|r| r.sample().value)
}
