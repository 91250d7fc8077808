//! Expiration Calculator
//!
//! Pure functions turning a [`CachePolicy`] into the physical TTL applied to a
//! backend key, at write time and on every refresh.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::cache::CachePolicy;
use crate::error::{CacheError, Result};

// == Resolve Absolute ==
/// Resolves the policy's absolute expiration against the creation time.
///
/// `absolute_expiration_after` takes precedence over `absolute_expiration_at`.
/// Fails with `InvalidExpiration` when the explicit instant, or the resolved
/// one, is not strictly after `creation_time`.
pub fn resolve_absolute(
    creation_time: DateTime<Utc>,
    policy: &CachePolicy,
) -> Result<Option<DateTime<Utc>>> {
    if let Some(at) = policy.absolute_expiration_at {
        if at <= creation_time {
            return Err(CacheError::InvalidExpiration(format!(
                "absolute expiration {} must be in the future",
                at.to_rfc3339()
            )));
        }
    }

    let resolved = match policy.absolute_expiration_after {
        Some(after) => {
            let after = chrono::Duration::from_std(after).map_err(|_| {
                CacheError::InvalidExpiration(format!("relative expiration {:?} is out of range", after))
            })?;
            let at = creation_time.checked_add_signed(after).ok_or_else(|| {
                CacheError::InvalidExpiration("relative expiration overflows".to_string())
            })?;
            Some(at)
        }
        None => policy.absolute_expiration_at,
    };

    match resolved {
        Some(at) if at <= creation_time => Err(CacheError::InvalidExpiration(
            "relative expiration must be positive".to_string(),
        )),
        other => Ok(other),
    }
}

// == Validate Sliding ==
/// Rejects a zero sliding window, which would expire the entry on write.
pub fn validate_sliding(policy: &CachePolicy) -> Result<()> {
    match policy.sliding_expiration {
        Some(sliding) if sliding.is_zero() => Err(CacheError::InvalidExpiration(
            "sliding expiration must be positive".to_string(),
        )),
        _ => Ok(()),
    }
}

// == Physical TTL ==
/// TTL to put on the backend key at write time.
///
/// The smaller of the remaining absolute lifetime and the sliding window when
/// both exist, whichever exists otherwise, `None` when neither does.
pub fn physical_ttl(
    creation_time: DateTime<Utc>,
    absolute: Option<DateTime<Utc>>,
    sliding: Option<Duration>,
) -> Option<Duration> {
    let remaining = absolute.map(|at| remaining_until(creation_time, at));
    match (remaining, sliding) {
        (Some(remaining), Some(sliding)) => Some(remaining.min(sliding)),
        (Some(remaining), None) => Some(remaining),
        (None, Some(sliding)) => Some(sliding),
        (None, None) => None,
    }
}

// == Is Expired ==
/// True iff an absolute expiration exists and lies strictly before `now`.
pub fn is_expired(now: DateTime<Utc>, absolute: Option<DateTime<Utc>>) -> bool {
    matches!(absolute, Some(at) if at < now)
}

// == Refresh TTL ==
/// TTL to reapply to the backend key when an entry is read or refreshed.
///
/// Only sliding entries move: the window restarts at `now`, capped by what is
/// left of the absolute expiration. Absolute-only and unbounded entries
/// return `None` and keep their physical TTL untouched.
pub fn refresh_ttl(
    now: DateTime<Utc>,
    absolute: Option<DateTime<Utc>>,
    sliding: Option<Duration>,
) -> Option<Duration> {
    let sliding = sliding?;
    match absolute {
        Some(at) => Some(remaining_until(now, at).min(sliding)),
        None => Some(sliding),
    }
}

/// Time from `from` until `at`, zero if `at` has already passed.
fn remaining_until(from: DateTime<Utc>, at: DateTime<Utc>) -> Duration {
    (at - from).to_std().unwrap_or(Duration::ZERO)
}
