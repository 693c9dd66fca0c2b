//! Inbound identity references

use serde::Serialize;

/// Outcome of classifying a raw address
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    /// Address inside the application's own domain; the local part is a handle
    Local { handle: String },
    /// Any other address, with the display name it was written with, if any
    Foreign {
        email: String,
        display_name: Option<String>,
    },
}

/// One identity reference pulled out of a free-form target list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum IdentityReference {
    /// `@handle`, stored without the leading `@`
    Handle(String),
    /// Raw address, optionally with a display name (`"Ada" <ada@example.com>`)
    Address(String),
}
