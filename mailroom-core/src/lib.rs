//! Mailroom Core - identity resolution and account records
//!
//! This crate implements the identity core following hexagonal architecture:
//!
//! - **domain**: Account record, OAuth callbacks, presentation views
//! - **ports**: Trait definitions for collaborators (AccountStore, Cache, ContactProvider)
//! - **services**: Resolution, linking, autocomplete, conversations
//! - **adapters**: Concrete implementations (DuckDB, Gravatar, Twitter, Google)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use adapters::address::{DomainAddressClassifier, PatternExtractor};
use adapters::duckdb::DuckDbRepository;
use adapters::google::GoogleContactsClient;
use adapters::gravatar::GravatarService;
use adapters::twitter::TwitterClient;
use config::Config;
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, PersistenceError};
pub use domain::{Account, Conversation, OAuthCallback, Provider, PublicAccount};

/// Main context for Mailroom operations
///
/// Opens mailroom.duckdb in the data directory and wires every service to
/// the adapters the configuration asks for.
pub struct MailroomContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub identity_service: Arc<IdentityService>,
    pub autocomplete_service: AutocompleteService,
    pub conversation_service: ConversationService,
    pub status_service: StatusService,
}

impl MailroomContext {
    pub fn new(mailroom_dir: &Path, logger: Option<Arc<LoggingService>>) -> Result<Self> {
        let config = Config::load(mailroom_dir)?;

        let repository = Arc::new(DuckDbRepository::new(&mailroom_dir.join("mailroom.duckdb"))?);
        repository.ensure_schema()?;
        repository.purge_expired_cache()?;

        let avatars = Arc::new(GravatarService::new(
            &config.avatar.gravatar_base,
            &config.avatar.robohash_base,
            config.avatar.size,
            &config.avatar.default_image,
        )?);

        let identity_service = Arc::new(
            IdentityService::new(
                config.identity(),
                repository.clone(),
                Arc::new(DomainAddressClassifier::new(config.domain.clone())),
                Arc::new(PatternExtractor::new()?),
                avatars,
            )
            .with_cache(repository.clone())
            .with_logger(logger.clone()),
        );

        let timeout = config.providers.timeout();
        let autocomplete_service = AutocompleteService::new(
            repository.clone(),
            repository.clone(),
            config.autocomplete_settings(),
        )
        .with_provider(Arc::new(TwitterClient::new(
            &config.providers.twitter_api_base,
            timeout,
            config.autocomplete.twitter_limit,
        )?))
        .with_provider(Arc::new(GoogleContactsClient::new(
            &config.providers.google_api_base,
            timeout,
        )?))
        .with_logger(logger.clone());

        let conversation_service =
            ConversationService::new(identity_service.clone(), repository.clone()).with_logger(logger);
        let status_service = StatusService::new(repository.clone());

        Ok(Self {
            config,
            repository,
            identity_service,
            autocomplete_service,
            conversation_service,
            status_service,
        })
    }
}
