use std::{fmt, time::Duration};

use tokio::time::Instant;

use super::RandomSource;

/// Window used whenever a configured [`LatencyRange`] is invalid.
pub const DEFAULT_LATENCY_WINDOW: LatencyRange = LatencyRange::new(50, 150);

/// Configured processing time for an endpoint, in milliseconds.
///
/// Sampled as a half-open interval: `max_ms` itself is never drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyRange {
    pub min_ms: i64,
    pub max_ms: i64,
}

impl LatencyRange {
    pub const fn new(min_ms: i64, max_ms: i64) -> Self {
        Self { min_ms, max_ms }
    }

    /// A range is invalid if either bound is not strictly positive
    /// or if the bounds are inverted.
    pub const fn is_valid(&self) -> bool {
        self.min_ms > 0 && self.max_ms > 0 && self.min_ms <= self.max_ms
    }

    /// The range that will actually be sampled.
    pub const fn effective(&self) -> Self {
        if self.is_valid() {
            *self
        } else {
            DEFAULT_LATENCY_WINDOW
        }
    }
}

impl fmt::Display for LatencyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}) ms", self.min_ms, self.max_ms)
    }
}

/// Pick the processing delay for one request.
pub fn sample_delay(range: LatencyRange, random: &impl RandomSource) -> Duration {
    let LatencyRange { min_ms, max_ms } = range.effective();
    // both bounds are strictly positive past `effective`
    let (min_ms, max_ms) = (min_ms as u64, max_ms as u64);

    let millis = if min_ms == max_ms {
        min_ms
    } else {
        random.random_range(min_ms..max_ms)
    };
    Duration::from_millis(millis)
}

/// Returned by [`suspend`] when the wait was cut short.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupted {
    pub requested: Duration,
    pub elapsed: Duration,
}

impl fmt::Display for Interrupted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("sleep interrupted")
    }
}

impl std::error::Error for Interrupted {}

/// Wait for `delay`, unless `interrupt` resolves first.
///
/// Completing the full delay takes precedence when both are ready.
pub async fn suspend<F>(delay: Duration, interrupt: F) -> Result<(), Interrupted>
where
    F: Future,
{
    if delay.is_zero() {
        return Ok(());
    }

    let start = Instant::now();
    tokio::select! {
        biased;

        _ = tokio::time::sleep(delay) => Ok(()),
        _ = interrupt => Err(Interrupted {
            requested: delay,
            elapsed: start.elapsed(),
        }),
    }
}
