//! Single-value cache with a freshness window.
//!
//! Owned by one session, so refresh throttling never leaks between
//! sessions. Ages are measured on Tokio's clock, which tests can pause.

use std::time::Duration;

use tokio::time::Instant;

/// Holds one value together with the instant it was fetched.
#[derive(Debug, Clone)]
pub struct TimedCache<T> {
    ttl: Duration,
    entry: Option<(T, Instant)>,
}

impl<T> TimedCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entry: None }
    }

    /// Store `value` as fetched now.
    pub fn put(&mut self, value: T) {
        self.entry = Some((value, Instant::now()));
    }

    /// The cached value while it is younger than the TTL.
    pub fn fresh(&self) -> Option<&T> {
        self.entry
            .as_ref()
            .filter(|(_, fetched_at)| fetched_at.elapsed() < self.ttl)
            .map(|(value, _)| value)
    }

    /// The cached value regardless of age.
    pub fn last(&self) -> Option<&T> {
        self.entry.as_ref().map(|(value, _)| value)
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}
