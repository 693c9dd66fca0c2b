//! Autocomplete service - addressing suggestions for an account
//!
//! Suggestions come from three places, in this order: accounts the user has
//! written to, then Twitter followings, then Google contacts. Provider lists
//! are cached per account and provider.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::domain::presentation::{formal_display, is_linked};
use crate::domain::result::{Error, Result};
use crate::domain::{Account, Provider};
use crate::ports::{AccountStore, Cache, ContactProvider};
use crate::services::{LogEvent, LoggingService};

/// Cache key for one account's suggestions from one provider
pub fn autocomplete_cache_key(account_id: Uuid, provider: Provider) -> String {
    format!("accounts/{}/autocomplete/{}", account_id, provider)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutocompleteSettings {
    pub cache_ttl: Duration,
    /// When set, a failing provider contributes nothing instead of failing
    /// the whole request
    pub isolate_provider_failures: bool,
}

impl Default for AutocompleteSettings {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(3600),
            isolate_provider_failures: false,
        }
    }
}

pub struct AutocompleteService {
    store: Arc<dyn AccountStore>,
    cache: Arc<dyn Cache>,
    providers: HashMap<Provider, Arc<dyn ContactProvider>>,
    settings: AutocompleteSettings,
    logger: Option<Arc<LoggingService>>,
}

impl AutocompleteService {
    pub fn new(store: Arc<dyn AccountStore>, cache: Arc<dyn Cache>, settings: AutocompleteSettings) -> Self {
        Self {
            store,
            cache,
            providers: HashMap::new(),
            settings,
            logger: None,
        }
    }

    /// Register the contact client for its provider, replacing any previous one
    pub fn with_provider(mut self, client: Arc<dyn ContactProvider>) -> Self {
        self.providers.insert(client.provider(), client);
        self
    }

    pub fn with_logger(mut self, logger: Option<Arc<LoggingService>>) -> Self {
        self.logger = logger;
        self
    }

    /// Ordered, de-duplicated suggestions for addressing a message
    pub fn suggestions(&self, account: &Account) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        let mut suggestions = Vec::new();

        let friends = self
            .store
            .friends_of(account.id)?
            .iter()
            .map(formal_display)
            .collect::<Vec<_>>();

        for provider_list in std::iter::once(Ok(friends))
            .chain(Provider::ALL.iter().map(|p| self.provider_suggestions(account, *p)))
        {
            for suggestion in provider_list? {
                if seen.insert(suggestion.clone()) {
                    suggestions.push(suggestion);
                }
            }
        }

        Ok(suggestions)
    }

    /// Suggestions from one provider, served from the cache when fresh
    ///
    /// Empty when the provider isn't linked.
    pub fn provider_suggestions(&self, account: &Account, provider: Provider) -> Result<Vec<String>> {
        if !is_linked(account, provider) {
            return Ok(Vec::new());
        }
        let credentials = match account.binding(provider) {
            Some(binding) => binding.credentials.clone(),
            None => return Ok(Vec::new()),
        };
        let client = self.providers.get(&provider).ok_or_else(|| {
            Error::Config(format!("no contact client configured for {}", provider))
        })?;

        let key = autocomplete_cache_key(account.id, provider);
        let mut producer = || -> Result<Vec<String>> {
            let contacts = client.list_contacts(&credentials)?;
            Ok(contacts
                .iter()
                .filter_map(|c| c.suggestion(provider))
                .collect())
        };

        match self.cache.fetch(&key, self.settings.cache_ttl, &mut producer) {
            Ok(list) => Ok(list),
            Err(e @ Error::ExternalService { .. }) if self.settings.isolate_provider_failures => {
                self.log(
                    LogEvent::new("autocomplete_provider_failed")
                        .with_provider(provider.as_str())
                        .with_error(e.to_string()),
                );
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    fn log(&self, event: LogEvent) {
        if let Some(logger) = &self.logger {
            let _ = logger.log(event);
        }
    }
}
