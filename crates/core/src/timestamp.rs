//! Expiry timestamps
//!
//! Record expiration is tracked as microseconds since the Unix epoch. A record
//! whose expiry is `t` is considered expired at any instant strictly after `t`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Microsecond-precision point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Unix epoch
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Largest representable timestamp
    pub const MAX: Timestamp = Timestamp(u64::MAX);

    /// Current wall-clock time
    ///
    /// A clock set before the epoch reads as [`Timestamp::EPOCH`].
    pub fn now() -> Self {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp(elapsed.as_micros() as u64)
    }

    /// `now() + ttl`, saturating
    pub fn after(ttl: Duration) -> Self {
        Self::now().saturating_add(ttl)
    }

    /// From microseconds since epoch
    #[inline]
    pub const fn from_micros(micros: u64) -> Self {
        Timestamp(micros)
    }

    /// From milliseconds since epoch
    #[inline]
    pub const fn from_millis(millis: u64) -> Self {
        Timestamp(millis.saturating_mul(1_000))
    }

    /// From seconds since epoch
    #[inline]
    pub const fn from_secs(secs: u64) -> Self {
        Timestamp(secs.saturating_mul(1_000_000))
    }

    /// Microseconds since epoch
    #[inline]
    pub const fn as_micros(&self) -> u64 {
        self.0
    }

    /// Whole seconds since epoch
    #[inline]
    pub const fn as_secs(&self) -> u64 {
        self.0 / 1_000_000
    }

    /// Add a duration, saturating at [`Timestamp::MAX`]
    pub fn saturating_add(&self, duration: Duration) -> Self {
        Timestamp(self.0.saturating_add(duration.as_micros() as u64))
    }

    /// Subtract a duration, saturating at [`Timestamp::EPOCH`]
    pub fn saturating_sub(&self, duration: Duration) -> Self {
        Timestamp(self.0.saturating_sub(duration.as_micros() as u64))
    }

    /// True when an expiry of `self` has passed as of `now`
    #[inline]
    pub fn has_passed(&self, now: Timestamp) -> bool {
        now.0 > self.0
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::EPOCH
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}", self.0 / 1_000_000, self.0 % 1_000_000)
    }
}

impl From<Duration> for Timestamp {
    fn from(since_epoch: Duration) -> Self {
        Timestamp(since_epoch.as_micros() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_agree() {
        assert_eq!(Timestamp::from_secs(2), Timestamp::from_millis(2_000));
        assert_eq!(Timestamp::from_millis(2_000), Timestamp::from_micros(2_000_000));
        assert_eq!(Timestamp::from_secs(2).as_secs(), 2);
    }

    #[test]
    fn test_has_passed_is_strict() {
        let expiry = Timestamp::from_secs(100);
        assert!(!expiry.has_passed(Timestamp::from_secs(99)));
        assert!(!expiry.has_passed(expiry));
        assert!(expiry.has_passed(Timestamp::from_micros(100_000_001)));
    }

    #[test]
    fn test_after_is_in_future() {
        let before = Timestamp::now();
        let later = Timestamp::after(Duration::from_secs(60));
        assert!(later > before);
    }

    #[test]
    fn test_saturation() {
        assert_eq!(Timestamp::MAX.saturating_add(Duration::from_secs(1)), Timestamp::MAX);
        assert_eq!(Timestamp::EPOCH.saturating_sub(Duration::from_secs(1)), Timestamp::EPOCH);
    }

    #[test]
    fn test_display() {
        assert_eq!(Timestamp::from_micros(1_234_567_890).to_string(), "1234.567890");
    }

    #[test]
    fn test_serde() {
        let ts = Timestamp::from_micros(42);
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, "42");
        let restored: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, ts);
    }
}
