use std::sync::Mutex;

use crate::timestamp::Timestamp;

/// Source of commit timestamps.
///
/// Wraps the wall clock so that successive calls to [`MonotonicClock::next`]
/// are strictly increasing even when the wall clock stalls or steps backwards.
/// Safe for concurrent use across threads.
///
/// # Rules
///
/// - **Local event**: `ts = max(wall_clock, last + 1)`.
/// - **Observe**: `last = max(last, observed)`, so the next local event lands
///   strictly after anything already recorded (e.g. restored history).
pub struct MonotonicClock {
    last: Mutex<u64>,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { last: Mutex::new(0) }
    }

    /// Generate a new timestamp strictly greater than any previously
    /// returned or observed value.
    pub fn next(&self) -> Timestamp {
        let wall = Timestamp::now().as_millis();
        // The guarded value is a plain integer; a poisoned lock still holds a valid one.
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let ts = wall.max(last.saturating_add(1));
        *last = ts;
        Timestamp::from_millis(ts)
    }

    /// Advance the clock past an externally recorded timestamp.
    pub fn observe(&self, ts: Timestamp) {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        *last = (*last).max(ts.as_millis());
    }

    /// The last timestamp issued or observed.
    pub fn last(&self) -> Timestamp {
        Timestamp::from_millis(*self.last.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_across_rapid_calls() {
        let clock = MonotonicClock::new();
        let mut prev = clock.next();
        for _ in 0..1000 {
            let next = clock.next();
            assert!(next > prev, "clock must be strictly monotonic: {prev:?} >= {next:?}");
            prev = next;
        }
    }

    #[test]
    fn observe_pushes_past_future_timestamp() {
        let clock = MonotonicClock::new();
        let far = Timestamp::from_millis(u64::MAX - 10);
        clock.observe(far);
        let next = clock.next();
        assert_eq!(next.as_millis(), u64::MAX - 9);
    }

    #[test]
    fn observe_older_timestamp_is_ignored() {
        let clock = MonotonicClock::new();
        let issued = clock.next();
        clock.observe(Timestamp::from_millis(1));
        assert_eq!(clock.last(), issued);
        assert!(clock.next() > issued);
    }

    #[test]
    fn concurrent_calls_never_collide() {
        use std::collections::BTreeSet;
        use std::sync::Arc;

        let clock = Arc::new(MonotonicClock::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let clock = Arc::clone(&clock);
                std::thread::spawn(move || (0..250).map(|_| clock.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = BTreeSet::new();
        for handle in handles {
            for ts in handle.join().unwrap() {
                assert!(seen.insert(ts), "duplicate timestamp {ts}");
            }
        }
        assert_eq!(seen.len(), 1000);
    }
}
