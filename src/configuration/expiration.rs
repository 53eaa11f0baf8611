//! # Expiration Policy
//!
//! Decides when a cached response is too old to be handed to a new observer.

use std::time::{Duration, Instant, SystemTime};

/// How long a successful response stays fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expiration {
    /// Never expires.
    #[default]
    Never,
    /// Expires `Duration` after the last successful result.
    Interval(Duration),
    /// Expires at a fixed wall-clock instant, regardless of when data arrived.
    FixedDate(SystemTime),
}

impl Expiration {
    /// True if data stamped at `last_success` must be refetched.
    ///
    /// For `Interval`, a missing stamp counts as expired.
    pub fn is_expired(&self, last_success: Option<Instant>) -> bool {
        match self {
            Expiration::Never => false,
            Expiration::Interval(interval) => match last_success {
                Some(stamp) => stamp.elapsed() >= *interval,
                None => true,
            },
            Expiration::FixedDate(date) => SystemTime::now() >= *date,
        }
    }
}
