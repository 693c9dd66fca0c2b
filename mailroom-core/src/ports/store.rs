//! Store ports - account and conversation persistence

use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::{Account, Conversation, Provider};

/// Column an account can be looked up by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountField {
    Id,
    Handle,
    /// Normalized (lower-case) email
    Email,
    /// The provider's external id stored in the account's binding
    ExternalId(Provider),
}

/// Account persistence
///
/// Implementations enforce uniqueness of handles and of external ids per
/// provider, and report collisions as `PersistenceError::UniquenessViolation`.
pub trait AccountStore: Send + Sync {
    /// Find a single account by one field
    fn find_by(&self, field: AccountField, value: &str) -> Result<Option<Account>>;

    /// Insert a new account together with its bindings
    fn create(&self, account: &Account) -> Result<Account>;

    /// Update an existing account and replace its bindings
    ///
    /// Fails with `NotFound` when the account was never created.
    fn save(&self, account: &Account) -> Result<()>;

    /// Accounts this account has addressed conversations to, in first-contact order
    fn friends_of(&self, account_id: Uuid) -> Result<Vec<Account>>;
}

/// Conversation membership persistence
pub trait ConversationStore: Send + Sync {
    fn record_conversation(&self, conversation: &Conversation) -> Result<()>;

    /// Conversations owned by an account, oldest first
    fn conversations_for(&self, owner_id: Uuid) -> Result<Vec<Conversation>>;
}
