//! Link command - apply a verified OAuth callback

use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use mailroom_core::{OAuthCallback, Provider};

use super::{find_account, get_context};
use crate::output;

pub fn run(provider: &str, payload: Option<&Path>, account: Option<&str>, json: bool) -> Result<()> {
    let provider: Provider = provider.parse()?;

    let raw = match payload {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read payload from {}", path.display()))?,
        None if atty::isnt(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
        None => anyhow::bail!("No callback payload provided. Use --payload or pipe JSON on stdin."),
    };

    let value: serde_json::Value = serde_json::from_str(&raw).context("Callback payload is not valid JSON")?;
    let callback = OAuthCallback::from_payload(provider, &value)?;

    let ctx = get_context()?;
    let linked = match account {
        Some(reference) => {
            let existing = find_account(&ctx, reference)?;
            ctx.identity_service.link_provider(existing, &callback)?
        }
        None => ctx.identity_service.resolve_by_oauth_callback(&callback)?,
    };

    let view = ctx.identity_service.present(&linked);
    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    output::success(&format!("✓ Linked {} to {}", provider, view.formal_display));
    if let Some(email) = ctx.identity_service.app_email(&linked) {
        println!("{}", format!("Mailroom address: {}", email).dimmed());
    }
    Ok(())
}
