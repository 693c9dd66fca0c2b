//! Autocomplete command - suggestions for addressing a message

use anyhow::Result;

use super::{find_account, get_context};
use crate::output;

pub fn run(reference: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let account = find_account(&ctx, reference)?;
    let suggestions = ctx.autocomplete_service.suggestions(&account)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&suggestions)?);
        return Ok(());
    }

    if suggestions.is_empty() {
        output::warning("No suggestions yet. Start a conversation or link a provider.");
        return Ok(());
    }

    for suggestion in suggestions {
        println!("{}", suggestion);
    }
    Ok(())
}
