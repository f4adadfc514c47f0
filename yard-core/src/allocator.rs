//! Smallest-available assignation numbers.
//!
//! Partitions hold tens of slots, so the next number is recomputed from a
//! fresh ascending scan on every allocation instead of keeping a free list.

use std::time::Duration;

/// Returns the smallest positive integer missing from `sorted`.
///
/// `sorted` must be ascending. Duplicates and non-positive values are
/// tolerated and never shift the result.
pub fn first_available_number(sorted: &[i64]) -> i64 {
    let mut expected = 1;
    for &number in sorted {
        if number < expected {
            continue;
        }
        if number != expected {
            break;
        }
        expected += 1;
    }
    expected
}

/// Bounds the retry loop around a contended allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationPolicy {
    pub max_attempts: u32,
    pub retry_backoff: Duration,
}

impl AllocationPolicy {
    pub fn new(max_attempts: u32, retry_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_backoff,
        }
    }

    /// Linear backoff before the given (1-based) retry.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.retry_backoff.saturating_mul(attempt)
    }
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_backoff: Duration::from_millis(20),
        }
    }
}
