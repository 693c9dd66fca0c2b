//! Conversation command - start and list conversations

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use super::{find_account, get_context};
use crate::output;

#[derive(Subcommand)]
pub enum ConversationCommands {
    /// Start a conversation, creating recipient accounts as needed
    New {
        /// Owner (account id, @handle or email)
        #[arg(long)]
        from: String,
        /// Recipients as free-form text (handles and addresses)
        #[arg(long, required = true, num_args = 1..)]
        to: Vec<String>,
        #[arg(long)]
        subject: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List an account's conversations
    List {
        /// Owner (account id, @handle or email)
        reference: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: ConversationCommands) -> Result<()> {
    let ctx = get_context()?;

    match command {
        ConversationCommands::New { from, to, subject, json } => {
            let owner = find_account(&ctx, &from)?;
            let conversation = ctx
                .conversation_service
                .start(&owner, subject.as_deref(), &to)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&conversation)?);
                return Ok(());
            }

            output::success(&format!(
                "✓ Started conversation {} with {} recipient(s)",
                conversation.id,
                conversation.recipient_ids.len()
            ));
        }
        ConversationCommands::List { reference, json } => {
            let owner = find_account(&ctx, &reference)?;
            let conversations = ctx.conversation_service.list(&owner)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&conversations)?);
                return Ok(());
            }

            if conversations.is_empty() {
                println!("{}", "No conversations.".dimmed());
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["Id", "Subject", "Recipients", "Started"]);
            for conversation in conversations {
                table.add_row(vec![
                    conversation.id.to_string(),
                    conversation.subject.unwrap_or_default(),
                    conversation.recipient_ids.len().to_string(),
                    conversation.created_at.format("%Y-%m-%d %H:%M").to_string(),
                ]);
            }
            println!("{}", table);
        }
    }

    Ok(())
}
