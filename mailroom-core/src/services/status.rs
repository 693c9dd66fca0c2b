//! Status service - store-wide counts

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::Provider;

pub struct StatusService {
    repository: Arc<DuckDbRepository>,
}

impl StatusService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    pub fn get_status(&self) -> Result<StatusSummary> {
        let linked = Provider::ALL
            .iter()
            .map(|p| {
                Ok(LinkedCount {
                    provider: *p,
                    accounts: self.repository.count_linked(*p)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(StatusSummary {
            total_accounts: self.repository.count_accounts()?,
            accounts_with_handle: self.repository.count_accounts_with_handle()?,
            accounts_with_email: self.repository.count_accounts_with_email()?,
            linked,
            total_conversations: self.repository.count_conversations()?,
            cached_autocomplete_lists: self.repository.count_live_cache_entries()?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub total_accounts: i64,
    pub accounts_with_handle: i64,
    pub accounts_with_email: i64,
    pub linked: Vec<LinkedCount>,
    pub total_conversations: i64,
    pub cached_autocomplete_lists: i64,
}

#[derive(Debug, Serialize)]
pub struct LinkedCount {
    pub provider: Provider,
    pub accounts: i64,
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::domain::{Account, Credentials};
    use crate::ports::AccountStore;

    #[test]
    fn test_status_counts() {
        let dir = TempDir::new().unwrap();
        let repo = Arc::new(DuckDbRepository::new(&dir.path().join("mailroom.duckdb")).unwrap());
        repo.ensure_schema().unwrap();

        let mut ada = Account::with_handle("ada");
        ada.set_email(Some("ada@example.com"));
        ada.bind(Provider::Twitter, Some("1".into()), Credentials::new("t", Some("s".into())));
        repo.create(&ada).unwrap();
        repo.create(&Account::with_email("grace@navy.mil")).unwrap();

        let status = StatusService::new(repo).get_status().unwrap();
        assert_eq!(status.total_accounts, 2);
        assert_eq!(status.accounts_with_handle, 1);
        assert_eq!(status.accounts_with_email, 2);
        assert_eq!(status.linked[0].provider, Provider::Twitter);
        assert_eq!(status.linked[0].accounts, 1);
        assert_eq!(status.linked[1].accounts, 0);
        assert_eq!(status.total_conversations, 0);
    }
}
