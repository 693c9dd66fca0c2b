//! Identity service - resolves references to accounts and links providers
//!
//! Every entry point returns a persisted account. Lookups come first; an
//! account is only created when nothing matches, and existing identity fields
//! are only filled in when blank (provider linking excepted).

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::presentation::{self, PublicAccount};
use crate::domain::result::{Error, Result};
use crate::domain::{Account, Address, IdentityReference, OAuthCallback, Provider};
use crate::ports::{AccountField, AccountStore, AddressClassifier, AvatarService, Cache, FreeformExtractor};
use crate::services::autocomplete::autocomplete_cache_key;
use crate::services::{LogEvent, LoggingService};

/// Settings the resolver needs, passed in explicitly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityConfig {
    /// The application's own mail domain; addresses in it are handles
    pub domain: String,
}

pub struct IdentityService {
    config: IdentityConfig,
    store: Arc<dyn AccountStore>,
    classifier: Arc<dyn AddressClassifier>,
    extractor: Arc<dyn FreeformExtractor>,
    avatars: Arc<dyn AvatarService>,
    cache: Option<Arc<dyn Cache>>,
    logger: Option<Arc<LoggingService>>,
}

impl IdentityService {
    pub fn new(
        config: IdentityConfig,
        store: Arc<dyn AccountStore>,
        classifier: Arc<dyn AddressClassifier>,
        extractor: Arc<dyn FreeformExtractor>,
        avatars: Arc<dyn AvatarService>,
    ) -> Self {
        Self {
            config,
            store,
            classifier,
            extractor,
            avatars,
            cache: None,
            logger: None,
        }
    }

    /// Cache holding autocomplete lists; entries are dropped on relink
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_logger(mut self, logger: Option<Arc<LoggingService>>) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &IdentityConfig {
        &self.config
    }

    // === Resolution ===

    /// Find the account bound to the callback's external id, or start a new
    /// one, then link the provider onto it
    pub fn resolve_by_oauth_callback(&self, callback: &OAuthCallback) -> Result<Account> {
        let provider = callback.provider();
        let external_id = callback.external_id();
        if external_id.is_empty() {
            return Err(Error::invalid_callback(format!(
                "{} callback carries no external id",
                provider
            )));
        }

        let account = self
            .store
            .find_by(AccountField::ExternalId(provider), external_id)?
            .unwrap_or_default();

        self.link_provider(account, callback)
    }

    /// Find or create the account with exactly this handle
    pub fn resolve_by_handle(&self, handle: &str) -> Result<Account> {
        if handle.trim().is_empty() {
            return Err(Error::invalid_identity("handle is blank"));
        }

        if let Some(account) = self.store.find_by(AccountField::Handle, handle)? {
            return Ok(account);
        }

        let account = Account::with_handle(handle);
        account.validate()?;
        let created = self.store.create(&account)?;
        self.log(LogEvent::new("account_created"));
        Ok(created)
    }

    /// Resolve a raw address: local addresses become handles, foreign ones
    /// are found or created by (lower-cased) email
    pub fn resolve_by_email_or_handle(&self, raw_address: &str) -> Result<Account> {
        match self.classifier.classify(raw_address)? {
            Address::Local { handle } => self.resolve_by_handle(&handle),
            Address::Foreign { email, display_name } => {
                let email = Account::normalize_email(&email);
                let existing = self.store.find_by(AccountField::Email, &email)?;
                let is_new = existing.is_none();
                let mut account = existing.unwrap_or_else(|| Account::with_email(&email));

                let mut modified = false;
                if account.display_name().is_none() {
                    if let Some(name) = display_name.filter(|n| !n.trim().is_empty()) {
                        account.display_name = Some(name);
                        modified = true;
                    }
                }

                if is_new {
                    account.validate()?;
                    let created = self.store.create(&account)?;
                    self.log(LogEvent::new("account_created"));
                    Ok(created)
                } else {
                    if modified {
                        account.touch();
                        self.store.save(&account)?;
                    }
                    Ok(account)
                }
            }
        }
    }

    /// Resolve every reference found in a free-form target list
    ///
    /// Output follows input order. The same account may appear more than once.
    pub fn resolve_freeform(&self, targets: &[String]) -> Result<Vec<Account>> {
        self.extractor
            .extract(targets)
            .iter()
            .map(|reference| match reference {
                IdentityReference::Handle(handle) => self.resolve_by_handle(handle),
                IdentityReference::Address(address) => self.resolve_by_email_or_handle(address),
            })
            .collect()
    }

    /// Look an account up without ever creating one
    ///
    /// Accepts an account id, `@handle`, an address (local or foreign) or a
    /// bare handle.
    pub fn find_account(&self, reference: &str) -> Result<Option<Account>> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Ok(None);
        }

        if let Ok(id) = Uuid::parse_str(reference) {
            return self.store.find_by(AccountField::Id, &id.to_string());
        }
        if let Some(handle) = reference.strip_prefix('@') {
            return self.store.find_by(AccountField::Handle, handle);
        }
        if reference.contains('@') {
            return match self.classifier.classify(reference)? {
                Address::Local { handle } => self.store.find_by(AccountField::Handle, &handle),
                Address::Foreign { email, .. } => self.store.find_by(AccountField::Email, &email),
            };
        }
        self.store.find_by(AccountField::Handle, reference)
    }

    // === Linking ===

    /// Copy the callback's identity and credentials onto the account and persist it
    ///
    /// Any previous binding for the provider is replaced. Accounts the store
    /// has never seen are created; known ones are saved. Store errors (such
    /// as a handle taken by another account) come back unchanged.
    pub fn link_provider(&self, mut account: Account, callback: &OAuthCallback) -> Result<Account> {
        let provider = callback.provider();

        match callback {
            OAuthCallback::Twitter(cb) => {
                account.handle = Some(cb.nickname.clone());
                account.display_name = cb.name.clone();
                account.description = cb.description.clone();
                account.avatar_url = cb.image_url.clone();
            }
            OAuthCallback::Google(cb) => {
                account.set_email(Some(&cb.email));
            }
        }
        let external_id = Some(callback.external_id().to_string());
        account.bind(provider, external_id, callback.credentials());
        account.touch();
        account.validate()?;

        let is_new = self
            .store
            .find_by(AccountField::Id, &account.id.to_string())?
            .is_none();

        if is_new {
            self.store.create(&account)?;
            self.log(LogEvent::new("account_created").with_provider(provider.as_str()));
        } else {
            self.store.save(&account)?;
            self.invalidate_autocomplete(&account, provider);
        }
        self.log(LogEvent::new("provider_linked").with_provider(provider.as_str()));

        Ok(account)
    }

    // === Presentation ===

    /// Redacted view with the avatar resolved
    pub fn present(&self, account: &Account) -> PublicAccount {
        let avatar = presentation::resolved_avatar_url(account, self.avatars.as_ref());
        presentation::redacted_view(account).with_avatar_url(avatar)
    }

    pub fn app_email(&self, account: &Account) -> Option<String> {
        presentation::app_email(account, &self.config.domain)
    }

    pub fn avatars(&self) -> &dyn AvatarService {
        self.avatars.as_ref()
    }

    fn invalidate_autocomplete(&self, account: &Account, provider: Provider) {
        let Some(cache) = &self.cache else { return };
        if let Err(e) = cache.invalidate(&autocomplete_cache_key(account.id, provider)) {
            // The stale list expires with its TTL
            self.log(
                LogEvent::new("cache_invalidate_failed")
                    .with_provider(provider.as_str())
                    .with_error(e.to_string()),
            );
        }
    }

    fn log(&self, event: LogEvent) {
        if let Some(logger) = &self.logger {
            let _ = logger.log(event);
        }
    }
}
