//! Explicit deadline propagation.
//!
//! Deadlines are values passed down the call graph; each adapter call
//! derives its own timeout from `min(per_call_budget, parent.remaining())`
//! instead of holding a global abort handle.

use std::time::{Duration, Instant};

/// A point in time after which work should stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Instant);

impl Deadline {
    /// Deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self(Instant::now() + budget)
    }

    /// Time left, zero once expired.
    pub fn remaining(&self) -> Duration {
        self.0.saturating_duration_since(Instant::now())
    }

    pub fn expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Per-call timeout: the smaller of `budget` and the time left.
    pub fn cap(&self, budget: Duration) -> Duration {
        budget.min(self.remaining())
    }

    /// A child deadline no later than this one.
    pub fn child(&self, budget: Duration) -> Deadline {
        Deadline(Instant::now() + self.cap(budget))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_and_expired() {
        let d = Deadline::after(Duration::from_secs(60));
        assert!(!d.expired());
        assert!(d.remaining() <= Duration::from_secs(60));

        let past = Deadline::after(Duration::ZERO);
        assert!(past.expired());
        assert_eq!(past.remaining(), Duration::ZERO);
    }

    #[test]
    fn test_cap_takes_minimum() {
        let d = Deadline::after(Duration::from_secs(10));
        assert!(d.cap(Duration::from_secs(60)) <= Duration::from_secs(10));
        assert_eq!(d.cap(Duration::from_secs(1)), Duration::from_secs(1));
    }

    #[test]
    fn test_child_never_outlives_parent() {
        let parent = Deadline::after(Duration::from_millis(50));
        let child = parent.child(Duration::from_secs(10));
        assert!(child.remaining() <= parent.remaining() + Duration::from_millis(1));
    }
}
