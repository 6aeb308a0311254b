//! Lamport logical clock

use crate::common::LamportTime;

/// A Lamport clock owned by one node.
///
/// The value never decreases. `tick` marks a local event, `merge` folds in a
/// timestamp received from another node.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LamportClock {
    time: LamportTime,
}

impl LamportClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value, without advancing.
    pub fn now(&self) -> LamportTime {
        self.time
    }

    /// Advance for a local event and return the new value.
    pub fn tick(&mut self) -> LamportTime {
        self.time = self.time.saturating_add(1);
        self.time
    }

    /// Set to `max(local, remote) + 1` and return the new value.
    pub fn merge(&mut self, remote: LamportTime) -> LamportTime {
        self.time = self.time.max(remote).saturating_add(1);
        self.time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_increments() {
        let mut clock = LamportClock::new();
        assert_eq!(clock.now(), 0);
        assert_eq!(clock.tick(), 1);
        assert_eq!(clock.tick(), 2);
        assert_eq!(clock.now(), 2);
    }

    #[test]
    fn test_merge_exceeds_both_sides() {
        let mut clock = LamportClock::new();
        clock.tick();
        clock.tick();

        // remote ahead
        assert_eq!(clock.merge(10), 11);
        // remote behind
        assert_eq!(clock.merge(3), 12);
        // remote equal
        assert_eq!(clock.merge(12), 13);
    }

    #[test]
    fn test_mixed_sequence_never_decreases() {
        let mut clock = LamportClock::new();
        let remotes = [5, 0, 2, 40, 1, 39, 41, 7];

        let mut previous = clock.now();
        for (i, &remote) in remotes.iter().enumerate() {
            let value = if i % 3 == 0 {
                clock.tick()
            } else {
                let merged = clock.merge(remote);
                assert!(merged > remote);
                merged
            };
            assert!(value > previous);
            previous = value;
        }
    }
}
