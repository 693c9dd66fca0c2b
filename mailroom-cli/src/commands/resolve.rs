//! Resolve command - find or create accounts

use anyhow::Result;
use clap::Subcommand;
use mailroom_core::PublicAccount;

use super::get_context;
use crate::output;

#[derive(Subcommand)]
pub enum ResolveCommands {
    /// Find or create the account with this handle
    Handle {
        handle: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Resolve one address, e.g. '"Ada" <ada@example.com>' or 'ada@mailroom.local'
    Address {
        address: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Resolve every handle and address found in free-form text
    Targets {
        #[arg(required = true)]
        targets: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: ResolveCommands) -> Result<()> {
    let ctx = get_context()?;
    let identity = &ctx.identity_service;

    let (accounts, json) = match command {
        ResolveCommands::Handle { handle, json } => {
            let handle = handle.trim_start_matches('@');
            (vec![identity.resolve_by_handle(handle)?], json)
        }
        ResolveCommands::Address { address, json } => {
            (vec![identity.resolve_by_email_or_handle(&address)?], json)
        }
        ResolveCommands::Targets { targets, json } => (identity.resolve_freeform(&targets)?, json),
    };

    let views: Vec<PublicAccount> = accounts.iter().map(|a| identity.present(a)).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    if views.is_empty() {
        output::warning("No handles or addresses found.");
        return Ok(());
    }

    println!("{}", output::accounts_table(&views));
    Ok(())
}
