//! Record Id Generation

use crate::RecordId;

/// Id regenerations tolerated before an append is given up on
pub const MAX_ID_ATTEMPTS: usize = 8;

/// Generates `"{epoch_millis}-{random_fraction}"` record ids
///
/// The random fraction keeps ids distinct for records created within the
/// same millisecond. The store still rejects an id it already holds.
#[derive(Debug, Clone, Copy)]
pub struct IdGenerator {
    clock: fn() -> i64,
    entropy: fn() -> f64,
}

impl IdGenerator {
    /// Generator driven by the wall clock
    pub fn new() -> Self {
        Self::with_clock(sensor_model::epoch_millis)
    }

    /// Generator driven by a custom millisecond clock
    pub fn with_clock(clock: fn() -> i64) -> Self {
        Self::with_sources(clock, rand::random)
    }

    /// Generator with both the clock and the fraction source replaced
    pub fn with_sources(clock: fn() -> i64, entropy: fn() -> f64) -> Self {
        Self { clock, entropy }
    }

    /// Produce the next id
    pub fn next_id(&self) -> RecordId {
        let millis = (self.clock)();
        let fraction = (self.entropy)();
        RecordId::new(format!("{}-{}", millis, fraction))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn frozen_clock() -> i64 {
        1_700_000_000_000
    }

    #[test]
    fn test_id_format() {
        let id = IdGenerator::with_clock(frozen_clock).next_id();
        let (millis, fraction) = id.as_str().split_once('-').unwrap();
        assert_eq!(millis, "1700000000000");
        let fraction: f64 = fraction.parse().unwrap();
        assert!((0.0..1.0).contains(&fraction));
    }

    #[test]
    fn test_same_millisecond_ids_are_distinct() {
        let ids = IdGenerator::with_clock(frozen_clock);
        let generated: HashSet<_> = (0..10_000).map(|_| ids.next_id()).collect();
        assert_eq!(generated.len(), 10_000);
    }

    #[test]
    fn test_fixed_sources_repeat() {
        let ids = IdGenerator::with_sources(frozen_clock, || 0.5);
        assert_eq!(ids.next_id(), RecordId::from("1700000000000-0.5"));
        assert_eq!(ids.next_id(), ids.next_id());
    }
}
