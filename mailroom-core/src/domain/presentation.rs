//! Derived views of an account
//!
//! Everything here is total: missing fields fall back through a fixed chain
//! instead of failing. Avatar resolution is the only function that consults a
//! collaborator, and that collaborator is deterministic.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::account::{present, Account, Provider};
use crate::ports::AvatarService;

/// Quote a display name the way it appears in an address header
pub fn quote_name(name: &str) -> String {
    let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

/// `@handle` when a handle exists, otherwise the email
pub fn display_handle(account: &Account) -> String {
    match (account.handle(), account.email()) {
        (Some(handle), _) => format!("@{}", handle),
        (None, Some(email)) => email.to_string(),
        (None, None) => String::new(),
    }
}

/// The display name, falling back to the display handle
pub fn display_name(account: &Account) -> String {
    account
        .display_name()
        .map(str::to_string)
        .unwrap_or_else(|| display_handle(account))
}

/// `"Name" <@handle>` when named, otherwise just the display handle
pub fn formal_display(account: &Account) -> String {
    match account.display_name() {
        Some(name) => format!("{} <{}>", quote_name(name), display_handle(account)),
        None => display_handle(account),
    }
}

/// Explicit avatar, else a hash-based avatar for the email, else a generated
/// avatar for the display handle
pub fn resolved_avatar_url(account: &Account, avatars: &dyn AvatarService) -> String {
    if let Some(url) = present(&account.avatar_url) {
        return url.to_string();
    }
    match account.email() {
        Some(email) => avatars.url_for_email(email),
        None => avatars.url_for_text(&display_handle(account)),
    }
}

/// True when the provider is bound with a usable token
pub fn is_linked(account: &Account, provider: Provider) -> bool {
    account
        .binding(provider)
        .map(|b| !b.credentials.token.trim().is_empty())
        .unwrap_or(false)
}

/// The account's own address inside the application domain
pub fn app_email(account: &Account, domain: &str) -> Option<String> {
    account.handle().map(|h| format!("{}@{}", h, domain))
}

/// Account projection that is safe to serialize
///
/// Built field by field from an [`Account`]; secrets and provider ids are
/// never copied, so a field added to `Account` stays private until it is
/// added here on purpose.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicAccount {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub display_handle: String,
    pub formal_display: String,
    pub linked_providers: Vec<Provider>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PublicAccount {
    /// Replace the avatar with the resolved one
    pub fn with_avatar_url(mut self, url: String) -> Self {
        self.avatar_url = Some(url);
        self
    }
}

/// Redacted projection of an account for external consumption
pub fn redacted_view(account: &Account) -> PublicAccount {
    PublicAccount {
        id: account.id,
        handle: account.handle().map(str::to_string),
        email: account.email().map(str::to_string),
        display_name: account.display_name().map(str::to_string),
        description: present(&account.description).map(str::to_string),
        avatar_url: present(&account.avatar_url).map(str::to_string),
        display_handle: display_handle(account),
        formal_display: formal_display(account),
        linked_providers: Provider::ALL
            .into_iter()
            .filter(|p| is_linked(account, *p))
            .collect(),
        created_at: account.created_at,
        updated_at: account.updated_at,
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&display_handle(self))
    }
}
