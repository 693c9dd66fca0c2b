//! Show command - redacted view of one account

use anyhow::Result;
use colored::Colorize;

use super::{find_account, get_context};
use crate::output;

pub fn run(reference: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let account = find_account(&ctx, reference)?;
    let view = ctx.identity_service.present(&account);

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!("{}", view.formal_display.bold());
    println!("{}", output::account_details(&view));
    if let Some(address) = ctx.identity_service.app_email(&account) {
        println!("Mailroom address: {}", address);
    }
    Ok(())
}
