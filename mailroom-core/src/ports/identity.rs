//! Identity parsing ports

use crate::domain::result::Result;
use crate::domain::{Address, IdentityReference};

/// Decides whether a raw address belongs to the application's own domain
pub trait AddressClassifier: Send + Sync {
    /// Fails with `InvalidIdentity` when `raw` is not an address at all
    fn classify(&self, raw: &str) -> Result<Address>;
}

/// Splits mixed target lists (handles, addresses, free text) into references
pub trait FreeformExtractor: Send + Sync {
    /// References come back in input order; nothing is deduplicated
    fn extract(&self, targets: &[String]) -> Vec<IdentityReference>;
}
