//! Event log in logs.duckdb
//!
//! Entries record what happened, never who it happened to: an event name,
//! the provider or CLI command involved, and error text. Handles, emails,
//! display names and credentials stay out of this database.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use chrono::Utc;
use duckdb::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::log_migrations::LOG_MIGRATIONS;
use crate::services::MigrationService;

/// Error text longer than this is cut before it is stored
const MAX_ERROR_CHARS: usize = 500;

static SEQUENCE: AtomicU16 = AtomicU16::new(0);

/// Millisecond timestamp in the high bits, a wrapping sequence in the low 16
fn entry_id(timestamp_ms: i64) -> u64 {
    ((timestamp_ms.max(0) as u64) << 16) | u64::from(SEQUENCE.fetch_add(1, Ordering::Relaxed))
}

fn truncate(text: String) -> String {
    if text.chars().count() <= MAX_ERROR_CHARS {
        return text;
    }
    let mut cut: String = text.chars().take(MAX_ERROR_CHARS).collect();
    cut.push_str("...");
    cut
}

/// Where an event originated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPoint {
    Cli,
    /// Embedded in another application through the library API
    Library,
}

impl EntryPoint {
    fn as_str(&self) -> &'static str {
        match self {
            EntryPoint::Cli => "cli",
            EntryPoint::Library => "library",
        }
    }
}

/// An event about to be written
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogEvent {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
}

impl LogEvent {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            ..Self::default()
        }
    }

    /// twitter or google
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(truncate(message.into()));
        self
    }

    pub fn with_error_details(mut self, details: impl Into<String>) -> Self {
        self.error_details = Some(truncate(details.into()));
        self
    }
}

/// A stored entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    /// Unix milliseconds
    pub timestamp: i64,
    pub entry_point: String,
    pub app_version: String,
    pub platform: String,
    pub event: String,
    pub provider: Option<String>,
    pub command: Option<String>,
    pub error_message: Option<String>,
    pub error_details: Option<String>,
}

impl LogEntry {
    fn from_row(row: &duckdb::Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            timestamp: row.get("timestamp")?,
            entry_point: row.get("entry_point")?,
            app_version: row.get("app_version")?,
            platform: row.get("platform")?,
            event: row.get("event")?,
            provider: row.get("provider")?,
            command: row.get("command")?,
            error_message: row.get("error_message")?,
            error_details: row.get("error_details")?,
        })
    }
}

/// Which entries a listing returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFilter {
    All,
    ErrorsOnly,
}

impl LogFilter {
    fn where_clause(&self) -> &'static str {
        match self {
            LogFilter::All => "",
            LogFilter::ErrorsOnly => "WHERE error_message IS NOT NULL",
        }
    }
}

/// Summary of the log database
#[derive(Debug, Clone, Serialize)]
pub struct LogStats {
    pub total_entries: u64,
    pub error_count: u64,
    pub database_path: PathBuf,
    pub database_size_bytes: u64,
}

/// Writer and reader for logs.duckdb
///
/// Services hold it as an optional collaborator and discard its errors.
pub struct LoggingService {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    entry_point: EntryPoint,
    app_version: String,
}

impl LoggingService {
    /// Open (or create) logs.duckdb in the data directory
    pub fn new(mailroom_dir: &Path, entry_point: EntryPoint, app_version: impl Into<String>) -> Result<Self> {
        let db_path = mailroom_dir.join("logs.duckdb");
        let conn = Connection::open(&db_path)?;
        MigrationService::new(&conn, LOG_MIGRATIONS).run_pending()?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
            entry_point,
            app_version: app_version.into(),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow!("log connection lock poisoned: {}", e))
    }

    pub fn log(&self, event: LogEvent) -> Result<()> {
        let timestamp = Utc::now().timestamp_millis();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sys_logs (id, timestamp, entry_point, app_version, platform,
                                   event, provider, command, error_message, error_details)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                entry_id(timestamp),
                timestamp,
                self.entry_point.as_str(),
                self.app_version,
                std::env::consts::OS,
                event.event,
                event.provider,
                event.command,
                event.error_message,
                event.error_details,
            ],
        )?;
        Ok(())
    }

    pub fn log_event(&self, event: &str) -> Result<()> {
        self.log(LogEvent::new(event))
    }

    /// `command_executed` for a CLI command name
    pub fn log_command(&self, command: &str) -> Result<()> {
        self.log(LogEvent::new("command_executed").with_command(command))
    }

    /// Newest first
    pub fn entries(&self, filter: LogFilter, limit: usize) -> Result<Vec<LogEntry>> {
        let sql = format!(
            "SELECT * FROM sys_logs {} ORDER BY timestamp DESC, id DESC LIMIT ?",
            filter.where_clause()
        );
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map([limit as i64], LogEntry::from_row)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(entries)
    }

    pub fn count(&self, filter: LogFilter) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM sys_logs {}", filter.where_clause());
        let conn = self.lock()?;
        let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    pub fn stats(&self) -> Result<LogStats> {
        Ok(LogStats {
            total_entries: self.count(LogFilter::All)?,
            error_count: self.count(LogFilter::ErrorsOnly)?,
            database_path: self.db_path.clone(),
            database_size_bytes: std::fs::metadata(&self.db_path).map(|m| m.len()).unwrap_or(0),
        })
    }

    /// Delete entries older than `timestamp_ms`, returning how many went
    pub fn delete_before(&self, timestamp_ms: i64) -> Result<u64> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM sys_logs WHERE timestamp < ?", [timestamp_ms])?;
        Ok(deleted as u64)
    }

    /// Copy the database file to `output_path`
    pub fn export(&self, output_path: &Path) -> Result<PathBuf> {
        let conn = self.lock()?;
        // Flush the WAL first or the copy misses recent entries
        conn.execute_batch("CHECKPOINT")?;
        std::fs::copy(&self.db_path, output_path)?;
        Ok(output_path.to_path_buf())
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}
