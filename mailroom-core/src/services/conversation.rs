//! Conversation service - records who an account writes to

use std::sync::Arc;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, Conversation};
use crate::ports::ConversationStore;
use crate::services::{IdentityService, LogEvent, LoggingService};

pub struct ConversationService {
    identity: Arc<IdentityService>,
    store: Arc<dyn ConversationStore>,
    logger: Option<Arc<LoggingService>>,
}

impl ConversationService {
    pub fn new(identity: Arc<IdentityService>, store: Arc<dyn ConversationStore>) -> Self {
        Self {
            identity,
            store,
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: Option<Arc<LoggingService>>) -> Self {
        self.logger = logger;
        self
    }

    /// Start a conversation from `owner` to everyone named in `targets`
    ///
    /// Recipients are resolved (and created when unknown) through the
    /// identity service. Fails with `InvalidIdentity` when nobody but the
    /// owner is addressed.
    pub fn start(&self, owner: &Account, subject: Option<&str>, targets: &[String]) -> Result<Conversation> {
        let recipients = self.identity.resolve_freeform(targets)?;
        let conversation = Conversation::new(
            owner.id,
            subject.map(str::to_string),
            recipients.iter().map(|a| a.id),
        );

        if conversation.recipient_ids.is_empty() {
            return Err(Error::invalid_identity(
                "conversation needs at least one recipient other than its owner",
            ));
        }

        self.store.record_conversation(&conversation)?;
        if let Some(logger) = &self.logger {
            let _ = logger.log_event("conversation_started");
        }
        Ok(conversation)
    }

    /// Conversations owned by the account, oldest first
    pub fn list(&self, owner: &Account) -> Result<Vec<Conversation>> {
        self.store.conversations_for(owner.id)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::adapters::address::{DomainAddressClassifier, PatternExtractor};
    use crate::adapters::duckdb::DuckDbRepository;
    use crate::adapters::gravatar::{GravatarService, GRAVATAR_BASE, ROBOHASH_BASE};
    use crate::ports::AccountStore;
    use crate::services::IdentityConfig;

    fn setup(dir: &TempDir) -> (ConversationService, Arc<IdentityService>, Arc<DuckDbRepository>) {
        let repo = Arc::new(DuckDbRepository::new(&dir.path().join("mailroom.duckdb")).unwrap());
        repo.ensure_schema().unwrap();
        let identity = Arc::new(IdentityService::new(
            IdentityConfig {
                domain: "mailroom.local".to_string(),
            },
            repo.clone(),
            Arc::new(DomainAddressClassifier::new("mailroom.local")),
            Arc::new(PatternExtractor::new().unwrap()),
            Arc::new(GravatarService::new(GRAVATAR_BASE, ROBOHASH_BASE, 80, "identicon").unwrap()),
        ));
        (
            ConversationService::new(identity.clone(), repo.clone()),
            identity,
            repo,
        )
    }

    #[test]
    fn test_start_resolves_and_deduplicates_recipients() {
        let dir = TempDir::new().unwrap();
        let (service, identity, repo) = setup(&dir);
        let owner = identity.resolve_by_handle("owner").unwrap();

        let targets = vec!["@bob, grace@navy.mil, @owner".to_string(), "bob@mailroom.local".to_string()];
        let conversation = service.start(&owner, Some("Lunch"), &targets).unwrap();

        assert_eq!(conversation.recipient_ids.len(), 2);
        assert_eq!(conversation.subject.as_deref(), Some("Lunch"));

        let friends = repo.friends_of(owner.id).unwrap();
        assert_eq!(friends[0].handle(), Some("bob"));
        assert_eq!(friends[1].email(), Some("grace@navy.mil"));

        let listed = service.list(&owner).unwrap();
        assert_eq!(listed, vec![conversation]);
    }

    #[test]
    fn test_start_without_recipients_fails() {
        let dir = TempDir::new().unwrap();
        let (service, identity, repo) = setup(&dir);
        let owner = identity.resolve_by_handle("owner").unwrap();

        for targets in [vec![], vec!["@owner".to_string()], vec!["just words".to_string()]] {
            let err = service.start(&owner, None, &targets).unwrap_err();
            assert!(matches!(err, Error::InvalidIdentity(_)));
        }
        assert_eq!(repo.count_conversations().unwrap(), 0);
    }
}
