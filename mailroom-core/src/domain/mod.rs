//! Core domain entities
//!
//! Accounts, their provider bindings and the views derived from them. These
//! are plain data structures with validation; the only outside dependency is
//! the avatar port used by the presentation functions.

mod account;
mod address;
mod callback;
mod contact;
mod conversation;
pub mod presentation;
pub mod result;

pub use account::{AccessToken, Account, Credentials, Provider, ProviderBinding};
pub use address::{Address, IdentityReference};
pub use callback::{GoogleCallback, OAuthCallback, TwitterCallback};
pub use contact::ContactSummary;
pub use conversation::Conversation;
pub use presentation::PublicAccount;
