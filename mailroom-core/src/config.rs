//! Configuration management
//!
//! settings.json in the data directory:
//! ```json
//! {
//!   "app": { "domain": "mailroom.local" },
//!   "avatar": { "gravatarBase": "...", "robohashBase": "...", "size": 80, "defaultImage": "identicon" },
//!   "autocomplete": { "cacheTtlSecs": 3600, "isolateProviderFailures": false, "twitterLimit": 100 },
//!   "providers": { "twitterApiBase": "...", "googleApiBase": "...", "timeoutSecs": 30 }
//! }
//! ```
//! Keys this crate doesn't know are kept when the file is saved.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::adapters::google::GOOGLE_API_BASE;
use crate::adapters::gravatar::{GRAVATAR_BASE, ROBOHASH_BASE};
use crate::adapters::twitter::TWITTER_API_BASE;
use crate::services::{AutocompleteSettings, IdentityConfig};

/// Environment variable overriding `app.domain`
pub const DOMAIN_ENV: &str = "MAILROOM_DOMAIN";

pub const DEFAULT_DOMAIN: &str = "mailroom.local";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: AppSettings,
    #[serde(default)]
    avatar: AvatarConfig,
    #[serde(default)]
    autocomplete: AutocompleteConfig,
    #[serde(default)]
    providers: ProvidersConfig,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default = "default_domain")]
    domain: String,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            other: HashMap::new(),
        }
    }
}

fn default_domain() -> String {
    DEFAULT_DOMAIN.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AvatarConfig {
    pub gravatar_base: String,
    pub robohash_base: String,
    pub size: u32,
    pub default_image: String,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            gravatar_base: GRAVATAR_BASE.to_string(),
            robohash_base: ROBOHASH_BASE.to_string(),
            size: 80,
            default_image: "identicon".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutocompleteConfig {
    pub cache_ttl_secs: u64,
    pub isolate_provider_failures: bool,
    /// Followings sampled from Twitter per fetch
    pub twitter_limit: usize,
}

impl Default for AutocompleteConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 3600,
            isolate_provider_failures: false,
            twitter_limit: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProvidersConfig {
    pub twitter_api_base: String,
    pub google_api_base: String,
    pub timeout_secs: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            twitter_api_base: TWITTER_API_BASE.to_string(),
            google_api_base: GOOGLE_API_BASE.to_string(),
            timeout_secs: 30,
        }
    }
}

impl ProvidersConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Mailroom configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub domain: String,
    pub avatar: AvatarConfig,
    pub autocomplete: AutocompleteConfig,
    pub providers: ProvidersConfig,
    /// Domain as written in settings.json, before any env override
    stored_domain: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            avatar: AvatarConfig::default(),
            autocomplete: AutocompleteConfig::default(),
            providers: ProvidersConfig::default(),
            stored_domain: default_domain(),
        }
    }
}

impl Config {
    /// Load config from the data directory
    ///
    /// `MAILROOM_DOMAIN` overrides the configured domain for this process.
    pub fn load(mailroom_dir: &Path) -> Result<Self> {
        Self::load_with_domain_override(mailroom_dir, std::env::var(DOMAIN_ENV).ok())
    }

    fn load_with_domain_override(mailroom_dir: &Path, domain_override: Option<String>) -> Result<Self> {
        let raw = Self::read_settings(mailroom_dir)?;

        let stored_domain = raw.app.domain.trim().to_string();
        let domain = domain_override
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| stored_domain.clone());

        Ok(Self {
            domain,
            avatar: raw.avatar,
            autocomplete: raw.autocomplete,
            providers: raw.providers,
            stored_domain,
        })
    }

    fn read_settings(mailroom_dir: &Path) -> Result<SettingsFile> {
        let settings_path = mailroom_dir.join("settings.json");
        if !settings_path.exists() {
            return Ok(SettingsFile::default());
        }
        let content = std::fs::read_to_string(&settings_path)?;
        Ok(serde_json::from_str(&content).unwrap_or_default())
    }

    /// Save config to the data directory, preserving settings this crate
    /// doesn't manage
    ///
    /// An env-overridden domain is not written back.
    pub fn save(&self, mailroom_dir: &Path) -> Result<()> {
        let mut settings = Self::read_settings(mailroom_dir)?;

        settings.app.domain = self.stored_domain.clone();
        settings.avatar = self.avatar.clone();
        settings.autocomplete = self.autocomplete.clone();
        settings.providers = self.providers.clone();

        std::fs::create_dir_all(mailroom_dir)?;
        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(mailroom_dir.join("settings.json"), content)?;
        Ok(())
    }

    /// Change the application domain (persisted on the next save)
    pub fn set_domain(&mut self, domain: &str) -> Result<()> {
        let domain = domain.trim().trim_start_matches('@');
        if domain.is_empty() || domain.contains(char::is_whitespace) || domain.contains('@') {
            anyhow::bail!("'{}' is not a valid mail domain", domain);
        }
        self.domain = domain.to_lowercase();
        self.stored_domain = self.domain.clone();
        Ok(())
    }

    pub fn identity(&self) -> IdentityConfig {
        IdentityConfig {
            domain: self.domain.clone(),
        }
    }

    pub fn autocomplete_settings(&self) -> AutocompleteSettings {
        AutocompleteSettings {
            cache_ttl: Duration::from_secs(self.autocomplete.cache_ttl_secs),
            isolate_provider_failures: self.autocomplete.isolate_provider_failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_without_settings_file() {
        let dir = tempdir().unwrap();
        let config = Config::load_with_domain_override(dir.path(), None).unwrap();

        assert_eq!(config.domain, DEFAULT_DOMAIN);
        assert_eq!(config.autocomplete.twitter_limit, 100);
        assert_eq!(config.autocomplete_settings().cache_ttl, Duration::from_secs(3600));
        assert!(!config.autocomplete.isolate_provider_failures);
        assert_eq!(config.providers.timeout(), Duration::from_secs(30));
        assert_eq!(config.avatar.size, 80);
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"app": {"domain": "example.org"}, "autocomplete": {"isolateProviderFailures": true}}"#,
        )
        .unwrap();

        let config = Config::load_with_domain_override(dir.path(), None).unwrap();
        assert_eq!(config.identity().domain, "example.org");
        assert!(config.autocomplete.isolate_provider_failures);
        assert_eq!(config.autocomplete.cache_ttl_secs, 3600);
    }

    #[test]
    fn test_domain_override() {
        let dir = tempdir().unwrap();
        let config =
            Config::load_with_domain_override(dir.path(), Some(" staging.example ".to_string())).unwrap();
        assert_eq!(config.domain, "staging.example");

        // The override is not persisted
        config.save(dir.path()).unwrap();
        let reloaded = Config::load_with_domain_override(dir.path(), None).unwrap();
        assert_eq!(reloaded.domain, DEFAULT_DOMAIN);
    }

    #[test]
    fn test_save_preserves_unknown_settings() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"app": {"domain": "a.org", "theme": "dark"}, "experimental": {"x": 1}}"#,
        )
        .unwrap();

        let mut config = Config::load_with_domain_override(dir.path(), None).unwrap();
        config.set_domain("B.org").unwrap();
        config.save(dir.path()).unwrap();

        let content = std::fs::read_to_string(dir.path().join("settings.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(json["app"]["domain"], "b.org");
        assert_eq!(json["app"]["theme"], "dark");
        assert_eq!(json["experimental"]["x"], 1);
        assert_eq!(json["providers"]["timeoutSecs"], 30);
    }

    #[test]
    fn test_set_domain_rejects_garbage() {
        let mut config = Config::default();
        assert!(config.set_domain("").is_err());
        assert!(config.set_domain("two words").is_err());
        assert!(config.set_domain("a@b").is_err());
        assert!(config.set_domain("@example.org").is_ok());
        assert_eq!(config.domain, "example.org");
    }
}
