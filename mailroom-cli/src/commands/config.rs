//! Config command - view or change settings.json

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use mailroom_core::config::{Config, DOMAIN_ENV};

use super::get_mailroom_dir;
use crate::output;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change the application mail domain
    SetDomain { domain: String },
}

pub fn run(command: ConfigCommands) -> Result<()> {
    let mailroom_dir = get_mailroom_dir()?;
    let mut config = Config::load(&mailroom_dir)?;

    match command {
        ConfigCommands::Show { json } => {
            if json {
                let value = serde_json::json!({
                    "domain": config.domain,
                    "avatar": config.avatar,
                    "autocomplete": config.autocomplete,
                    "providers": config.providers,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
                return Ok(());
            }

            let mut table = output::create_table();
            table.add_row(vec!["Domain".to_string(), config.domain.clone()]);
            table.add_row(vec!["Gravatar".to_string(), config.avatar.gravatar_base.clone()]);
            table.add_row(vec!["Robohash".to_string(), config.avatar.robohash_base.clone()]);
            table.add_row(vec!["Avatar size".to_string(), config.avatar.size.to_string()]);
            table.add_row(vec![
                "Cache TTL".to_string(),
                format!("{}s", config.autocomplete.cache_ttl_secs),
            ]);
            table.add_row(vec![
                "Isolate provider failures".to_string(),
                config.autocomplete.isolate_provider_failures.to_string(),
            ]);
            table.add_row(vec!["Twitter API".to_string(), config.providers.twitter_api_base.clone()]);
            table.add_row(vec!["Google API".to_string(), config.providers.google_api_base.clone()]);
            println!("{}", table);

            if std::env::var(DOMAIN_ENV).is_ok() {
                println!("{}", format!("Domain overridden by {}", DOMAIN_ENV).dimmed());
            }
        }
        ConfigCommands::SetDomain { domain } => {
            config.set_domain(&domain)?;
            config.save(&mailroom_dir)?;
            output::success(&format!("✓ Domain set to {}", config.domain));
            if std::env::var(DOMAIN_ENV).is_ok() {
                output::warning(&format!("{} is set and still takes precedence", DOMAIN_ENV));
            }
        }
    }

    Ok(())
}
