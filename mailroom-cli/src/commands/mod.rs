//! CLI command implementations

pub mod autocomplete;
pub mod config;
pub mod conversation;
pub mod link;
pub mod logs;
pub mod resolve;
pub mod show;
pub mod status;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use mailroom_core::services::{EntryPoint, LogEvent, LoggingService};
use mailroom_core::{Account, MailroomContext};

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<Arc<LoggingService>> {
    let mailroom_dir = get_mailroom_dir().ok()?;
    std::fs::create_dir_all(&mailroom_dir).ok()?;
    LoggingService::new(&mailroom_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
        .ok()
        .map(Arc::new)
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<Arc<LoggingService>>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Get the mailroom directory from environment or default
pub fn get_mailroom_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("MAILROOM_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".mailroom"))
        .context("Could not find home directory")
}

/// Get or create mailroom context
pub fn get_context() -> Result<MailroomContext> {
    let mailroom_dir = get_mailroom_dir()?;

    std::fs::create_dir_all(&mailroom_dir)
        .with_context(|| format!("Failed to create mailroom directory: {:?}", mailroom_dir))?;

    MailroomContext::new(&mailroom_dir, get_logger()).context("Failed to initialize mailroom context")
}

/// Look up an existing account by id, @handle or address
pub fn find_account(ctx: &MailroomContext, reference: &str) -> Result<Account> {
    ctx.identity_service
        .find_account(reference)?
        .with_context(|| format!("No account matches '{}'", reference))
}
