//! Signal emission throttling

use chrono::{DateTime, Duration, Utc};

/// Minimum spacing between emitted signals.
///
/// Tracks when a signal was last *actually* emitted. Evaluating never
/// advances the timestamp, only `record_emission` does, so a caller can
/// evaluate freely and commit the emission once delivery is confirmed.
#[derive(Debug, Clone)]
pub struct ThrottleState {
    last_signal_time: Option<DateTime<Utc>>,
    min_interval: Duration,
}

impl ThrottleState {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_signal_time: None,
            min_interval,
        }
    }

    /// True when an eligible signal may be emitted at `now`
    pub fn allows(&self, now: DateTime<Utc>) -> bool {
        match self.last_signal_time {
            None => true,
            Some(last) => now - last >= self.min_interval,
        }
    }

    /// Time left until the next emission window opens (zero when open)
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        match self.last_signal_time {
            None => Duration::zero(),
            Some(last) => (self.min_interval - (now - last)).max(Duration::zero()),
        }
    }

    pub fn record_emission(&mut self, at: DateTime<Utc>) {
        self.last_signal_time = Some(at);
    }

    pub fn last_signal_time(&self) -> Option<DateTime<Utc>> {
        self.last_signal_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn test_first_emission_is_always_allowed() {
        let throttle = ThrottleState::new(Duration::seconds(1800));
        assert!(throttle.allows(at(0)));
        assert_eq!(throttle.remaining(at(0)), Duration::zero());
    }

    #[test]
    fn test_blocks_inside_interval_and_reopens_at_boundary() {
        let mut throttle = ThrottleState::new(Duration::seconds(600));
        throttle.record_emission(at(1000));

        assert!(!throttle.allows(at(1001)));
        assert!(!throttle.allows(at(1599)));
        assert_eq!(throttle.remaining(at(1599)), Duration::seconds(1));
        assert!(throttle.allows(at(1600)));
        assert!(throttle.allows(at(9999)));
    }

    #[test]
    fn test_evaluation_without_record_does_not_advance() {
        let mut throttle = ThrottleState::new(Duration::seconds(600));
        assert!(throttle.allows(at(0)));
        assert!(throttle.allows(at(1)));
        assert!(throttle.last_signal_time().is_none());

        throttle.record_emission(at(1));
        assert_eq!(throttle.last_signal_time(), Some(at(1)));
    }
}
