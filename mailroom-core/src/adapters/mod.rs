//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for AccountStore, ConversationStore and Cache
//! - Regex and domain matching for address parsing
//! - Gravatar / Robohash for avatars
//! - Twitter v2 and Google People HTTP clients for ContactProvider

pub mod address;
pub mod duckdb;
pub mod google;
pub mod gravatar;
pub mod twitter;

#[cfg(test)]
pub mod contacts_mock;
