//! Cache Policy Module
//!
//! Expiration options supplied with every write.

use std::time::Duration;

use chrono::{DateTime, Utc};

// == Cache Policy ==
/// Expiration options for a single cache entry.
///
/// When both absolute fields are set, `absolute_expiration_after` wins.
/// When an absolute expiration and a sliding expiration are both set, the
/// entry dies at whichever comes first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CachePolicy {
    /// Fixed instant after which the entry is gone
    pub absolute_expiration_at: Option<DateTime<Utc>>,
    /// Lifetime measured from the write, resolved to an instant at write time
    pub absolute_expiration_after: Option<Duration>,
    /// Idle window, reset by every successful read
    pub sliding_expiration: Option<Duration>,
}

impl CachePolicy {
    /// Policy with no expiration: the entry lives until removed.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_absolute_expiration_at(mut self, at: DateTime<Utc>) -> Self {
        self.absolute_expiration_at = Some(at);
        self
    }

    pub fn with_absolute_expiration_after(mut self, after: Duration) -> Self {
        self.absolute_expiration_after = Some(after);
        self
    }

    pub fn with_sliding_expiration(mut self, sliding: Duration) -> Self {
        self.sliding_expiration = Some(sliding);
        self
    }

    /// Returns true if no expiration of any kind is configured.
    pub fn is_unbounded(&self) -> bool {
        self.absolute_expiration_at.is_none()
            && self.absolute_expiration_after.is_none()
            && self.sliding_expiration.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_unbounded() {
        assert!(CachePolicy::new().is_unbounded());
    }

    #[test]
    fn test_builder_sets_fields() {
        let at = Utc::now();
        let policy = CachePolicy::new()
            .with_absolute_expiration_at(at)
            .with_absolute_expiration_after(Duration::from_secs(30))
            .with_sliding_expiration(Duration::from_secs(10));

        assert_eq!(policy.absolute_expiration_at, Some(at));
        assert_eq!(policy.absolute_expiration_after, Some(Duration::from_secs(30)));
        assert_eq!(policy.sliding_expiration, Some(Duration::from_secs(10)));
        assert!(!policy.is_unbounded());
    }
}
