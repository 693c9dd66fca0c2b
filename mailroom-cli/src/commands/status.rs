//! Status command - store-wide counts

use anyhow::Result;
use colored::Colorize;

use super::get_context;
use crate::output;

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let status = ctx.status_service.get_status()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", "Mailroom Status".bold());
    println!();

    let mut table = output::create_table();
    table.add_row(vec!["Accounts".to_string(), status.total_accounts.to_string()]);
    table.add_row(vec!["With handle".to_string(), status.accounts_with_handle.to_string()]);
    table.add_row(vec!["With email".to_string(), status.accounts_with_email.to_string()]);
    for linked in &status.linked {
        table.add_row(vec![format!("Linked to {}", linked.provider), linked.accounts.to_string()]);
    }
    table.add_row(vec!["Conversations".to_string(), status.total_conversations.to_string()]);
    table.add_row(vec![
        "Cached autocomplete lists".to_string(),
        status.cached_autocomplete_lists.to_string(),
    ]);
    println!("{}", table);
    println!();
    println!("Domain: {}", ctx.config.domain);

    Ok(())
}
