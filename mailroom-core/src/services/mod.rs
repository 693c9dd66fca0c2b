//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

pub mod autocomplete;
mod conversation;
mod identity;
pub mod logging;
pub mod migration;
mod status;

pub use autocomplete::{autocomplete_cache_key, AutocompleteService, AutocompleteSettings};
pub use conversation::ConversationService;
pub use identity::{IdentityConfig, IdentityService};
pub use logging::{EntryPoint, LogEntry, LogEvent, LogFilter, LogStats, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use status::{LinkedCount, StatusService, StatusSummary};
