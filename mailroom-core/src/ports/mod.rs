//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external collaborators. The identity core
//! depends only on these traits, never on a concrete store or HTTP client.

mod external;
mod identity;
mod store;

pub use external::{AvatarService, Cache, ContactProvider};
pub use identity::{AddressClassifier, FreeformExtractor};
pub use store::{AccountField, AccountStore, ConversationStore};
