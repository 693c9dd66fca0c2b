//! Mailroom CLI - identity resolution from the terminal

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mailroom_core::services::LogEvent;

mod commands;
mod output;

use commands::{autocomplete, config, conversation, link, logs, resolve, show, status};

/// Mailroom - resolve, link and inspect accounts
#[derive(Parser)]
#[command(name = "mr", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find or create accounts from handles, addresses or free-form targets
    Resolve {
        #[command(subcommand)]
        command: resolve::ResolveCommands,
    },

    /// Apply a verified OAuth callback
    Link {
        /// Provider the callback came from (twitter, google)
        provider: String,
        /// Read the callback payload from a file instead of stdin
        #[arg(long)]
        payload: Option<PathBuf>,
        /// Link onto this account instead of resolving by external id
        #[arg(long)]
        account: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show an account
    Show {
        /// Account id, @handle or email
        reference: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Address suggestions for an account
    Autocomplete {
        /// Account id, @handle or email
        reference: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start and list conversations
    Conversation {
        #[command(subcommand)]
        command: conversation::ConversationCommands,
    },

    /// Show store-wide counts
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View or change configuration
    Config {
        #[command(subcommand)]
        command: config::ConfigCommands,
    },

    /// View and manage application logs
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Resolve { .. } => "resolve",
            Commands::Link { .. } => "link",
            Commands::Show { .. } => "show",
            Commands::Autocomplete { .. } => "autocomplete",
            Commands::Conversation { .. } => "conversation",
            Commands::Status { .. } => "status",
            Commands::Config { .. } => "config",
            Commands::Logs { .. } => "logs",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let command = cli.command.name();
    let logger = commands::get_logger();
    if let Some(l) = &logger {
        let _ = l.log_command(command);
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // The message may name an account, so only the command is logged
            commands::log_event(&logger, LogEvent::new("command_failed").with_command(command));
            output::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Resolve { command } => resolve::run(command),
        Commands::Link { provider, payload, account, json } => {
            link::run(&provider, payload.as_deref(), account.as_deref(), json)
        }
        Commands::Show { reference, json } => show::run(&reference, json),
        Commands::Autocomplete { reference, json } => autocomplete::run(&reference, json),
        Commands::Conversation { command } => conversation::run(command),
        Commands::Status { json } => status::run(json),
        Commands::Config { command } => config::run(command),
        Commands::Logs { command } => logs::run(command),
    }
}
