//! External service ports - provider contact lists, caching, avatars

use std::time::Duration;

use crate::domain::result::Result;
use crate::domain::{ContactSummary, Credentials, Provider};

/// Client for one provider's social graph
pub trait ContactProvider: Send + Sync {
    fn provider(&self) -> Provider;

    /// List the contacts visible to the given credentials
    ///
    /// Failures are reported as `Error::ExternalService`.
    fn list_contacts(&self, credentials: &Credentials) -> Result<Vec<ContactSummary>>;
}

/// Read-through cache for string lists
pub trait Cache: Send + Sync {
    /// Return the cached value for `key`, or run `producer` and cache its result
    ///
    /// The producer runs at most once per key within `ttl`. A failing producer
    /// caches nothing and its error is returned unchanged.
    fn fetch(
        &self,
        key: &str,
        ttl: Duration,
        producer: &mut dyn FnMut() -> Result<Vec<String>>,
    ) -> Result<Vec<String>>;

    /// Drop a cached value
    fn invalidate(&self, key: &str) -> Result<()>;
}

/// Deterministic avatar URL generation
pub trait AvatarService: Send + Sync {
    /// Hash-based avatar for an email address
    fn url_for_email(&self, email: &str) -> String;

    /// Generated avatar for arbitrary text
    fn url_for_text(&self, text: &str) -> String;
}
