//! Output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use mailroom_core::PublicAccount;

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// One row per account: id, formal display, email, linked providers
pub fn accounts_table(accounts: &[PublicAccount]) -> Table {
    let mut table = create_table();
    table.set_header(vec!["Id", "Account", "Email", "Linked"]);
    for account in accounts {
        table.add_row(vec![
            account.id.to_string(),
            account.formal_display.clone(),
            account.email.clone().unwrap_or_default(),
            linked_list(account),
        ]);
    }
    table
}

/// Vertical key-value view of a single account
pub fn account_details(account: &PublicAccount) -> Table {
    let mut table = create_table();
    table.add_row(vec!["Id".to_string(), account.id.to_string()]);
    table.add_row(vec!["Display".to_string(), account.formal_display.clone()]);
    if let Some(handle) = &account.handle {
        table.add_row(vec!["Handle".to_string(), format!("@{}", handle)]);
    }
    if let Some(email) = &account.email {
        table.add_row(vec!["Email".to_string(), email.clone()]);
    }
    if let Some(description) = &account.description {
        table.add_row(vec!["Description".to_string(), description.clone()]);
    }
    if let Some(avatar) = &account.avatar_url {
        table.add_row(vec!["Avatar".to_string(), avatar.clone()]);
    }
    table.add_row(vec!["Linked".to_string(), linked_list(account)]);
    table.add_row(vec![
        "Created".to_string(),
        account.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
    ]);
    table
}

fn linked_list(account: &PublicAccount) -> String {
    account
        .linked_providers
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
