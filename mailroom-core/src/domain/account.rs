//! Account domain model

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::{Error, Result};

/// Number of random bytes in a freshly generated access token
const ACCESS_TOKEN_BYTES: usize = 16;

/// Third-party identity providers an account can be linked to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Twitter,
    Google,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Twitter, Provider::Google];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Twitter => "twitter",
            Provider::Google => "google",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "twitter" => Ok(Provider::Twitter),
            "google" => Ok(Provider::Google),
            other => Err(Error::invalid_callback(format!(
                "unknown provider '{}' (expected twitter or google)",
                other
            ))),
        }
    }
}

/// Secret used by external API clients to act as this account
///
/// Generated once when the account is constructed. There is no way to
/// replace it on an existing account, and it never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Generate a new random token (hex encoded)
    pub fn generate() -> Self {
        let mut bytes = [0u8; ACCESS_TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Rebuild a token previously issued and read back from storage
    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// OAuth credential pair. Google only issues a token, so `secret` is optional.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub secret: Option<String>,
}

impl Credentials {
    pub fn new(token: impl Into<String>, secret: Option<String>) -> Self {
        Self {
            token: token.into(),
            secret: secret.filter(|s| !s.trim().is_empty()),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"***")
            .field("secret", &self.secret.as_ref().map(|_| "***"))
            .finish()
    }
}

/// A stored link between an account and one provider identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderBinding {
    /// The provider's stable user id (Twitter uid, Google subject)
    pub external_id: Option<String>,
    pub credentials: Credentials,
    pub linked_at: DateTime<Utc>,
}

/// An account that can be addressed by handle, by email, or through a linked
/// provider identity.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub handle: Option<String>,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    /// Explicit avatar; when unset the avatar is derived on read
    pub avatar_url: Option<String>,
    access_token: AccessToken,
    pub bindings: BTreeMap<Provider, ProviderBinding>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a blank account with a fresh id and access token
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            handle: None,
            email: None,
            display_name: None,
            description: None,
            avatar_url: None,
            access_token: AccessToken::generate(),
            bindings: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Create an account identified only by a handle
    pub fn with_handle(handle: impl Into<String>) -> Self {
        let mut account = Self::new();
        account.handle = non_blank(Some(handle.into()));
        account
    }

    /// Create an account identified only by an email address
    pub fn with_email(email: &str) -> Self {
        let mut account = Self::new();
        account.set_email(Some(email));
        account
    }

    /// Rebuild an account read back from a store. Identity fields are filled
    /// in by the caller afterwards.
    pub fn restore(
        id: Uuid,
        access_token: AccessToken,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            handle: None,
            email: None,
            display_name: None,
            description: None,
            avatar_url: None,
            access_token,
            bindings: BTreeMap::new(),
            created_at,
            updated_at,
        }
    }

    pub fn access_token(&self) -> &AccessToken {
        &self.access_token
    }

    /// Normalize an email address for storage and comparison
    pub fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }

    /// Set (or clear) the email, normalizing it
    pub fn set_email(&mut self, email: Option<&str>) {
        self.email = non_blank(email.map(Self::normalize_email));
    }

    pub fn handle(&self) -> Option<&str> {
        present(&self.handle)
    }

    pub fn email(&self) -> Option<&str> {
        present(&self.email)
    }

    pub fn display_name(&self) -> Option<&str> {
        present(&self.display_name)
    }

    pub fn binding(&self, provider: Provider) -> Option<&ProviderBinding> {
        self.bindings.get(&provider)
    }

    /// Replace the binding for a provider
    pub fn bind(&mut self, provider: Provider, external_id: Option<String>, credentials: Credentials) {
        self.bindings.insert(
            provider,
            ProviderBinding {
                external_id: non_blank(external_id),
                credentials,
                linked_at: Utc::now(),
            },
        );
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Validate account data
    ///
    /// An account must be reachable by a handle or an email.
    pub fn validate(&self) -> Result<()> {
        if self.handle().is_none() && self.email().is_none() {
            return Err(Error::invalid_identity(
                "account needs a handle or an email address",
            ));
        }
        if let Some(handle) = self.handle() {
            if handle.chars().any(char::is_whitespace) {
                return Err(Error::invalid_identity(format!(
                    "handle '{}' contains whitespace",
                    handle
                )));
            }
        }
        Ok(())
    }
}

impl Default for Account {
    fn default() -> Self {
        Self::new()
    }
}

/// Treat blank strings as absent
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}
