//! DuckDB repository implementation
//!
//! One database file backs the account store, the conversation relation and
//! the autocomplete cache. All access goes through a single connection behind
//! a mutex; multi-row writes run inside one transaction.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use duckdb::{params, params_from_iter, Connection};
use uuid::Uuid;

use crate::domain::result::{Error, PersistenceError, Result};
use crate::domain::{AccessToken, Account, Conversation, Credentials, Provider, ProviderBinding};
use crate::migrations::MIGRATIONS;
use crate::ports::{AccountField, AccountStore, Cache, ConversationStore};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const ACCOUNT_COLUMNS: &str = "a.account_id, a.handle, a.email, a.display_name, a.description,
     a.avatar_url, a.access_token, a.created_at, a.updated_at";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// Pull the offending column and value out of a DuckDB constraint message
///
/// `Duplicate key "handle: ada" violates unique constraint` yields
/// `("handle", "ada")`. Composite keys report the last column and the values
/// joined with `:` (`provider: twitter, external_id: 42` -> `external_id`, `twitter:42`).
fn parse_duplicate_key(msg: &str) -> Option<(String, String)> {
    let lower = msg.to_lowercase();
    let is_duplicate = lower.contains("duplicate key")
        || lower.contains("violates unique constraint")
        || lower.contains("violates primary key constraint")
        || lower.contains("constraint violated: duplicate");
    if !is_duplicate {
        return None;
    }

    let quoted = match msg.split('"').nth(1) {
        Some(q) => q,
        None => return Some(("unknown".to_string(), String::new())),
    };
    let pairs: Vec<(&str, &str)> = quoted
        .split(", ")
        .filter_map(|p| p.split_once(": "))
        .collect();

    Some(match pairs.as_slice() {
        [] => ("unknown".to_string(), quoted.to_string()),
        [(column, value)] => (column.to_string(), value.to_string()),
        many => {
            let column = many.last().map(|(c, _)| c.to_string()).unwrap_or_default();
            let value = many.iter().map(|(_, v)| *v).collect::<Vec<_>>().join(":");
            (column, value)
        }
    })
}

/// Map a DuckDB error onto the store's error kinds
fn db_error(err: duckdb::Error) -> Error {
    let msg = err.to_string();
    if let Some((field, value)) = parse_duplicate_key(&msg) {
        return Error::uniqueness(field, value);
    }
    if is_retryable_error(&msg) {
        return PersistenceError::Unavailable(msg).into();
    }
    PersistenceError::Database(msg).into()
}

fn lock_poisoned<T>(err: PoisonError<T>) -> Error {
    PersistenceError::Unavailable(format!("cache lock poisoned: {}", err)).into()
}

fn corrupt(what: &str, value: &str) -> Error {
    PersistenceError::Database(format!("corrupt {} in store: {}", what, value)).into()
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| corrupt("timestamp", s))
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Raw account columns, converted to an [`Account`] outside the row closure
struct AccountRow {
    id: String,
    handle: Option<String>,
    email: Option<String>,
    display_name: Option<String>,
    description: Option<String>,
    avatar_url: Option<String>,
    access_token: String,
    created_at: String,
    updated_at: String,
}

fn read_account_row(row: &duckdb::Row<'_>) -> duckdb::Result<AccountRow> {
    Ok(AccountRow {
        id: row.get(0)?,
        handle: row.get(1)?,
        email: row.get(2)?,
        display_name: row.get(3)?,
        description: row.get(4)?,
        avatar_url: row.get(5)?,
        access_token: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

impl AccountRow {
    fn into_account(self) -> Result<Account> {
        let id = Uuid::parse_str(&self.id).map_err(|_| corrupt("account id", &self.id))?;
        let mut account = Account::restore(
            id,
            AccessToken::from_stored(self.access_token),
            parse_timestamp(&self.created_at)?,
            parse_timestamp(&self.updated_at)?,
        );
        account.handle = self.handle;
        account.email = self.email;
        account.display_name = self.display_name;
        account.description = self.description;
        account.avatar_url = self.avatar_url;
        Ok(account)
    }
}

/// DuckDB repository implementation
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    /// One fill lock per cache key so a producer runs once per key
    fill_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl DuckDbRepository {
    /// Open (or create) the database file
    ///
    /// Retries with exponential backoff when the file is locked by another
    /// process.
    pub fn new(db_path: &Path) -> anyhow::Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: db_path.to_path_buf(),
                        fill_locks: Mutex::new(HashMap::new()),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[mailroom] Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow!("Failed to open database after {} retries", MAX_RETRIES)))
    }

    fn try_open_connection(db_path: &Path) -> anyhow::Result<Connection> {
        // Extension autoloading stays off; nothing here needs extensions
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    /// Run pending schema migrations
    pub fn run_migrations(&self) -> anyhow::Result<MigrationResult> {
        let conn = self.lock()?;
        MigrationService::new(&conn, MIGRATIONS).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> anyhow::Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| PersistenceError::Unavailable(format!("connection lock poisoned: {}", e)).into())
    }

    fn load_bindings(conn: &Connection, account: &mut Account) -> Result<()> {
        let mut stmt = conn
            .prepare(
                "SELECT provider, external_id, token, secret, linked_at
                 FROM sys_provider_bindings WHERE account_id = ? ORDER BY provider",
            )
            .map_err(db_error)?;

        let rows = stmt
            .query_map([account.id.to_string()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })
            .map_err(db_error)?;

        for row in rows {
            let (provider, external_id, token, secret, linked_at) = row.map_err(db_error)?;
            let provider: Provider = provider
                .parse()
                .map_err(|_| corrupt("provider", &provider))?;
            account.bindings.insert(
                provider,
                ProviderBinding {
                    external_id,
                    credentials: Credentials::new(token, secret),
                    linked_at: parse_timestamp(&linked_at)?,
                },
            );
        }
        Ok(())
    }

    fn insert_bindings(conn: &Connection, account: &Account) -> Result<()> {
        for (provider, binding) in &account.bindings {
            conn.execute(
                "INSERT INTO sys_provider_bindings
                    (account_id, provider, external_id, token, secret, linked_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    account.id.to_string(),
                    provider.as_str(),
                    binding.external_id,
                    binding.credentials.token,
                    binding.credentials.secret,
                    binding.linked_at.to_rfc3339(),
                ],
            )
            .map_err(db_error)?;
        }
        Ok(())
    }

    fn query_accounts(conn: &Connection, sql: &str, params: &[String]) -> Result<Vec<Account>> {
        let rows: Vec<AccountRow> = {
            let mut stmt = conn.prepare(sql).map_err(db_error)?;
            let mapped = stmt
                .query_map(params_from_iter(params.iter()), read_account_row)
                .map_err(db_error)?;
            let collected: duckdb::Result<Vec<AccountRow>> = mapped.collect();
            collected.map_err(db_error)?
        };

        let mut accounts = Vec::with_capacity(rows.len());
        for row in rows {
            let mut account = row.into_account()?;
            Self::load_bindings(conn, &mut account)?;
            accounts.push(account);
        }
        Ok(accounts)
    }

    // === Statistics ===

    pub fn count_accounts(&self) -> anyhow::Result<i64> {
        self.count("SELECT COUNT(*) FROM sys_accounts", &[])
    }

    pub fn count_accounts_with_handle(&self) -> anyhow::Result<i64> {
        self.count(
            "SELECT COUNT(*) FROM sys_accounts WHERE trim(coalesce(handle, '')) <> ''",
            &[],
        )
    }

    pub fn count_accounts_with_email(&self) -> anyhow::Result<i64> {
        self.count(
            "SELECT COUNT(*) FROM sys_accounts WHERE trim(coalesce(email, '')) <> ''",
            &[],
        )
    }

    /// Accounts linked to a provider with a usable token
    pub fn count_linked(&self, provider: Provider) -> anyhow::Result<i64> {
        self.count(
            "SELECT COUNT(*) FROM sys_provider_bindings WHERE provider = ? AND trim(token) <> ''",
            &[provider.as_str().to_string()],
        )
    }

    pub fn count_conversations(&self) -> anyhow::Result<i64> {
        self.count("SELECT COUNT(*) FROM sys_conversations", &[])
    }

    pub fn count_live_cache_entries(&self) -> anyhow::Result<i64> {
        self.count(
            "SELECT COUNT(*) FROM sys_cache WHERE expires_at > ?",
            &[now_ms().to_string()],
        )
    }

    /// Delete expired cache rows, returning how many were removed
    pub fn purge_expired_cache(&self) -> anyhow::Result<usize> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM sys_cache WHERE expires_at <= ?", [now_ms()])?;
        Ok(deleted)
    }

    fn count(&self, sql: &str, params: &[String]) -> anyhow::Result<i64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(sql, params_from_iter(params.iter()), |row| row.get(0))?;
        Ok(count)
    }

    // === Cache rows ===

    fn fill_lock(&self, key: &str) -> Result<Arc<Mutex<()>>> {
        let mut locks = self.fill_locks.lock().map_err(lock_poisoned)?;
        Ok(locks.entry(key.to_string()).or_default().clone())
    }

    fn fill_locked(
        &self,
        key_lock: &Mutex<()>,
        key: &str,
        ttl: Duration,
        producer: &mut dyn FnMut() -> Result<Vec<String>>,
    ) -> Result<Vec<String>> {
        let _fill = key_lock.lock().map_err(lock_poisoned)?;
        // Another thread may have filled the key while we waited
        if let Some(hit) = self.cache_get(key)? {
            return Ok(hit);
        }
        let value = producer()?;
        self.cache_put(key, &value, ttl)?;
        Ok(value)
    }

    /// Drop the key's lock from the map once no other thread holds it
    fn release_fill_lock(&self, key: &str, key_lock: Arc<Mutex<()>>) -> Result<()> {
        let mut locks = self.fill_locks.lock().map_err(lock_poisoned)?;
        // One reference in the map, one held here
        if Arc::strong_count(&key_lock) == 2 {
            locks.remove(key);
        }
        Ok(())
    }

    fn cache_get(&self, key: &str) -> Result<Option<Vec<String>>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT value FROM sys_cache WHERE cache_key = ? AND expires_at > ?")
            .map_err(db_error)?;
        let mut rows = stmt
            .query_map(params![key, now_ms()], |row| row.get::<_, String>(0))
            .map_err(db_error)?;

        match rows.next() {
            Some(value) => {
                let value = value.map_err(db_error)?;
                Ok(Some(serde_json::from_str(&value)?))
            }
            None => Ok(None),
        }
    }

    fn cache_put(&self, key: &str, value: &[String], ttl: Duration) -> Result<()> {
        let json = serde_json::to_string(value)?;
        let expires_at = now_ms().saturating_add(ttl.as_millis().min(i64::MAX as u128) as i64);

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sys_cache (cache_key, value, expires_at) VALUES (?, ?, ?)
             ON CONFLICT (cache_key) DO UPDATE SET
                value = EXCLUDED.value,
                expires_at = EXCLUDED.expires_at",
            params![key, json, expires_at],
        )
        .map_err(db_error)?;
        Ok(())
    }
}

impl AccountStore for DuckDbRepository {
    fn find_by(&self, field: AccountField, value: &str) -> Result<Option<Account>> {
        let (clause, params) = match field {
            AccountField::Id => ("a.account_id = ?", vec![value.to_string()]),
            AccountField::Handle => ("a.handle = ?", vec![value.to_string()]),
            AccountField::Email => ("a.email = ?", vec![Account::normalize_email(value)]),
            AccountField::ExternalId(provider) => (
                "a.account_id IN (SELECT account_id FROM sys_provider_bindings
                                  WHERE provider = ? AND external_id = ?)",
                vec![provider.as_str().to_string(), value.to_string()],
            ),
        };
        let sql = format!(
            "SELECT {} FROM sys_accounts a WHERE {} ORDER BY a.created_at, a.account_id LIMIT 1",
            ACCOUNT_COLUMNS, clause
        );

        let conn = self.lock()?;
        let mut accounts = Self::query_accounts(&conn, &sql, &params)?;
        Ok(accounts.pop())
    }

    fn create(&self, account: &Account) -> Result<Account> {
        account.validate()?;

        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(db_error)?;
        tx.execute(
            "INSERT INTO sys_accounts (account_id, handle, email, display_name, description,
                                       avatar_url, access_token, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                account.id.to_string(),
                account.handle(),
                account.email(),
                account.display_name,
                account.description,
                account.avatar_url,
                account.access_token().expose(),
                account.created_at.to_rfc3339(),
                account.updated_at.to_rfc3339(),
            ],
        )
        .map_err(db_error)?;
        Self::insert_bindings(&tx, account)?;
        tx.commit().map_err(db_error)?;

        Ok(account.clone())
    }

    fn save(&self, account: &Account) -> Result<()> {
        account.validate()?;

        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(db_error)?;
        let updated = tx
            .execute(
                "UPDATE sys_accounts SET handle = ?, email = ?, display_name = ?,
                        description = ?, avatar_url = ?, updated_at = ?
                 WHERE account_id = ?",
                params![
                    account.handle(),
                    account.email(),
                    account.display_name,
                    account.description,
                    account.avatar_url,
                    account.updated_at.to_rfc3339(),
                    account.id.to_string(),
                ],
            )
            .map_err(db_error)?;
        if updated == 0 {
            return Err(Error::not_found(format!("account {}", account.id)));
        }

        tx.execute(
            "DELETE FROM sys_provider_bindings WHERE account_id = ?",
            [account.id.to_string()],
        )
        .map_err(db_error)?;
        Self::insert_bindings(&tx, account)?;
        tx.commit().map_err(db_error)?;
        Ok(())
    }

    fn friends_of(&self, account_id: Uuid) -> Result<Vec<Account>> {
        let sql = format!(
            "SELECT {} FROM sys_conversation_recipients r
             JOIN sys_conversations c ON c.conversation_id = r.conversation_id
             JOIN sys_accounts a ON a.account_id = r.account_id
             WHERE c.owner_id = ? AND r.account_id <> ?
             ORDER BY c.created_at, c.conversation_id, r.position",
            ACCOUNT_COLUMNS
        );
        let id = account_id.to_string();

        let conn = self.lock()?;
        let mut friends: Vec<Account> = Vec::new();
        for account in Self::query_accounts(&conn, &sql, &[id.clone(), id])? {
            if !friends.iter().any(|f| f.id == account.id) {
                friends.push(account);
            }
        }
        Ok(friends)
    }
}

impl ConversationStore for DuckDbRepository {
    fn record_conversation(&self, conversation: &Conversation) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(db_error)?;
        tx.execute(
            "INSERT INTO sys_conversations (conversation_id, owner_id, subject, created_at)
             VALUES (?, ?, ?, ?)",
            params![
                conversation.id.to_string(),
                conversation.owner_id.to_string(),
                conversation.subject,
                conversation.created_at.to_rfc3339(),
            ],
        )
        .map_err(db_error)?;

        for (position, recipient) in conversation.recipient_ids.iter().enumerate() {
            tx.execute(
                "INSERT INTO sys_conversation_recipients (conversation_id, account_id, position)
                 VALUES (?, ?, ?)",
                params![
                    conversation.id.to_string(),
                    recipient.to_string(),
                    position as i32,
                ],
            )
            .map_err(db_error)?;
        }
        tx.commit().map_err(db_error)?;
        Ok(())
    }

    fn conversations_for(&self, owner_id: Uuid) -> Result<Vec<Conversation>> {
        let conn = self.lock()?;
        let headers: Vec<(String, Option<String>, String)> = {
            let mut stmt = conn
                .prepare(
                    "SELECT conversation_id, subject, created_at FROM sys_conversations
                     WHERE owner_id = ? ORDER BY created_at, conversation_id",
                )
                .map_err(db_error)?;
            let rows = stmt
                .query_map([owner_id.to_string()], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                })
                .map_err(db_error)?;
            let collected: duckdb::Result<Vec<_>> = rows.collect();
            collected.map_err(db_error)?
        };

        let mut conversations = Vec::with_capacity(headers.len());
        for (id, subject, created_at) in headers {
            let recipients: Vec<String> = {
                let mut stmt = conn
                    .prepare(
                        "SELECT account_id FROM sys_conversation_recipients
                         WHERE conversation_id = ? ORDER BY position",
                    )
                    .map_err(db_error)?;
                let rows = stmt
                    .query_map([&id], |row| row.get::<_, String>(0))
                    .map_err(db_error)?;
                let collected: duckdb::Result<Vec<String>> = rows.collect();
                collected.map_err(db_error)?
            };

            let recipient_ids = recipients
                .iter()
                .map(|r| Uuid::parse_str(r).map_err(|_| corrupt("recipient id", r)))
                .collect::<Result<Vec<_>>>()?;

            conversations.push(Conversation {
                id: Uuid::parse_str(&id).map_err(|_| corrupt("conversation id", &id))?,
                owner_id,
                subject,
                recipient_ids,
                created_at: parse_timestamp(&created_at)?,
            });
        }
        Ok(conversations)
    }
}

impl Cache for DuckDbRepository {
    fn fetch(
        &self,
        key: &str,
        ttl: Duration,
        producer: &mut dyn FnMut() -> Result<Vec<String>>,
    ) -> Result<Vec<String>> {
        if let Some(hit) = self.cache_get(key)? {
            return Ok(hit);
        }

        let key_lock = self.fill_lock(key)?;
        let result = self.fill_locked(&key_lock, key, ttl, producer);
        self.release_fill_lock(key, key_lock)?;
        result
    }

    fn invalidate(&self, key: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM sys_cache WHERE cache_key = ?", [key])
            .map_err(db_error)?;
        Ok(())
    }
}
