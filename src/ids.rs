//! Unique identifier generation
//!
//! Ids are `timestamp_ms * 1000 + counter`, where the counter disambiguates
//! calls that share a millisecond. The timestamp can be recovered from an id,
//! including legacy ids that are bare millisecond timestamps.

/// Ids per millisecond before the counter would spill into the next slot
const COUNTER_SPAN: i64 = 1000;

/// Smallest value a new-format id can take. Bare-millisecond legacy ids stay
/// below this until the year 2286, while any `timestamp_ms * 1000` id for a
/// timestamp after 2001 is three orders of magnitude above it.
const NEW_FORMAT_MIN: i64 = 10_000_000_000_000;

/// Generator owning the per-millisecond counter state
#[derive(Debug, Default)]
pub struct IdGenerator {
    last_ms: i64,
    counter: i64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce a unique, time-ordered id for the given instant.
    ///
    /// Calls sharing a millisecond get strictly increasing ids; the counter
    /// resets when the millisecond advances.
    pub fn generate(&mut self, now_ms: i64) -> i64 {
        if now_ms == self.last_ms {
            self.counter += 1;
        } else {
            self.last_ms = now_ms;
            self.counter = 0;
        }
        now_ms * COUNTER_SPAN + self.counter
    }

    /// Clear counter state for deterministic tests
    pub fn reset(&mut self) {
        self.last_ms = 0;
        self.counter = 0;
    }
}

/// Recover the millisecond timestamp an id was generated at.
///
/// Supports both id formats: new-format ids encode `timestamp_ms * 1000`,
/// legacy ids are the timestamp itself. The two ranges do not overlap for
/// realistic timestamps, so magnitude distinguishes them.
pub fn extract_timestamp_from_id(id: i64) -> i64 {
    if id >= NEW_FORMAT_MIN {
        id / COUNTER_SPAN
    } else {
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_unique_within_same_millisecond() {
        let mut gen = IdGenerator::new();
        let now_ms = 1_700_000_000_000;

        let ids: Vec<i64> = (0..50).map(|_| gen.generate(now_ms)).collect();

        for pair in ids.windows(2) {
            assert!(pair[1] > pair[0], "ids must be strictly increasing");
        }
    }

    #[test]
    fn test_counter_resets_when_millisecond_advances() {
        let mut gen = IdGenerator::new();
        let a = gen.generate(1_700_000_000_000);
        let b = gen.generate(1_700_000_000_000);
        let c = gen.generate(1_700_000_000_001);

        assert_eq!(a + 1, b);
        assert_eq!(c, 1_700_000_000_001 * COUNTER_SPAN);
        assert!(c > b);
    }

    #[test]
    fn test_extract_timestamp_new_format() {
        let mut gen = IdGenerator::new();
        let now_ms = 1_700_000_000_123;

        let id = gen.generate(now_ms);
        assert_eq!(extract_timestamp_from_id(id), now_ms);

        // Same millisecond, higher counter still maps back
        let id = gen.generate(now_ms);
        assert_eq!(extract_timestamp_from_id(id), now_ms);
    }

    #[test]
    fn test_extract_timestamp_legacy_format() {
        // Legacy ids are bare millisecond timestamps
        let legacy = 1_585_000_000_000;
        assert_eq!(extract_timestamp_from_id(legacy), legacy);
    }

    #[test]
    fn test_reset_clears_counter() {
        let mut gen = IdGenerator::new();
        let now_ms = 1_700_000_000_000;
        gen.generate(now_ms);
        gen.generate(now_ms);

        gen.reset();

        assert_eq!(gen.generate(now_ms), now_ms * COUNTER_SPAN);
    }
}
