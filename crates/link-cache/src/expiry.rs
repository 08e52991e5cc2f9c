//! Read-side expiry filtering.
//!
//! Signed stream URLs carry a [`Flag::Expires`](crate::Flag::Expires). Stored
//! entries are never pruned; callers filter at read time instead.

use chrono::{DateTime, Utc};

use crate::model::CachedLinks;

/// Copy of `links` without streams whose expiry lies before `now`.
pub fn filter_out_expired_links(links: &CachedLinks, now: DateTime<Utc>) -> CachedLinks {
    let mut filtered = links.clone();
    filtered.streams.retain(|stream| !stream.is_expired(now));
    filtered
}

impl CachedLinks {
    pub fn without_expired(&self) -> CachedLinks {
        filter_out_expired_links(self, Utc::now())
    }
}
