//! Address parsing adapters
//!
//! `DomainAddressClassifier` splits a single address into local (a handle in
//! the application's own domain) or foreign. `PatternExtractor` pulls handle
//! and address references out of free-form target text.

use anyhow::Result;
use regex::Regex;

use crate::domain::result::{Error, Result as DomainResult};
use crate::domain::{Address, IdentityReference};
use crate::ports::{AddressClassifier, FreeformExtractor};

/// Strip surrounding quotes from a display name and undo `\"` / `\\` escapes
fn unquote_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    let inner = trimmed
        .strip_prefix('"')
        .and_then(|n| n.strip_suffix('"'))
        .unwrap_or(trimmed);

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }

    let out = out.trim().to_string();
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

/// Split `Name <addr>` or a bare `addr` into (address, display name)
fn split_mailbox(raw: &str) -> Option<(&str, Option<String>)> {
    let raw = raw.trim();
    match (raw.rfind('<'), raw.strip_suffix('>')) {
        (Some(open), Some(without_close)) => {
            let address = without_close[open + 1..].trim();
            Some((address, unquote_name(&raw[..open])))
        }
        (None, None) => Some((raw, None)),
        _ => None,
    }
}

/// Check the `local@domain` shape and return both parts
fn split_address(address: &str) -> Option<(&str, &str)> {
    if address.chars().any(char::is_whitespace) {
        return None;
    }
    let (local, domain) = address.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    Some((local, domain))
}

/// Classifies addresses against the configured application domain
#[derive(Debug, Clone)]
pub struct DomainAddressClassifier {
    domain: String,
}

impl DomainAddressClassifier {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into().trim().to_string(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }
}

impl AddressClassifier for DomainAddressClassifier {
    fn classify(&self, raw: &str) -> DomainResult<Address> {
        let invalid = || Error::invalid_identity(format!("'{}' is not an email address", raw.trim()));

        let (address, display_name) = split_mailbox(raw).ok_or_else(invalid)?;
        let (local, domain) = split_address(address).ok_or_else(invalid)?;

        if domain.eq_ignore_ascii_case(&self.domain) {
            Ok(Address::Local {
                handle: local.to_string(),
            })
        } else {
            Ok(Address::Foreign {
                email: address.to_lowercase(),
                display_name,
            })
        }
    }
}

/// Split a target on `,` / `;` outside quoted names and angle brackets
fn split_tokens(target: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut in_angle = false;
    let mut escaped = false;

    for (i, c) in target.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' if !in_angle => in_quotes = !in_quotes,
            '<' if !in_quotes => in_angle = true,
            '>' if !in_quotes => in_angle = false,
            ',' | ';' if !in_quotes && !in_angle => {
                tokens.push(&target[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    tokens.push(&target[start..]);
    tokens
}

/// Regex-based free-form target extraction
///
/// A token (targets are split on `,` and `;`) that is a single bare word is
/// taken as a handle. Inside any other token the extractor recognizes, in
/// order of precedence: a named address (`"Ada" <ada@example.com>` or
/// `Ada <ada@example.com>`), a bare address, and an `@handle`. Remaining text
/// is ignored.
#[derive(Debug, Clone)]
pub struct PatternExtractor {
    pattern: Regex,
    bare_word: Regex,
}

impl PatternExtractor {
    pub fn new() -> Result<Self> {
        let pattern = Regex::new(concat!(
            r#"(?P<named>(?:"(?:[^"\\]|\\.)*"|[^,;<>"@]*?)\s*<[^<>@\s]+@[^<>\s]+>)"#,
            r"|(?P<bare>[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,})",
            r"|\B@(?P<handle>[A-Za-z0-9_]+)",
        ))?;
        let bare_word = Regex::new(r"^[A-Za-z0-9_]+$")?;
        Ok(Self { pattern, bare_word })
    }

    fn extract_token(&self, token: &str, references: &mut Vec<IdentityReference>) {
        let token = token.trim();
        if self.bare_word.is_match(token) {
            references.push(IdentityReference::Handle(token.to_string()));
            return;
        }
        for caps in self.pattern.captures_iter(token) {
            if let Some(m) = caps.name("named").or_else(|| caps.name("bare")) {
                references.push(IdentityReference::Address(m.as_str().trim().to_string()));
            } else if let Some(m) = caps.name("handle") {
                references.push(IdentityReference::Handle(m.as_str().to_string()));
            }
        }
    }
}

impl FreeformExtractor for PatternExtractor {
    fn extract(&self, targets: &[String]) -> Vec<IdentityReference> {
        let mut references = Vec::new();
        for target in targets {
            for token in split_tokens(target) {
                self.extract_token(token, &mut references);
            }
        }
        references
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> DomainAddressClassifier {
        DomainAddressClassifier::new("mailroom.local")
    }

    fn targets(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_local_address_keeps_case_of_local_part() {
        assert_eq!(
            classifier().classify("Ada@MailRoom.LOCAL").unwrap(),
            Address::Local {
                handle: "Ada".to_string()
            }
        );
    }

    #[test]
    fn test_foreign_address_is_lower_cased() {
        assert_eq!(
            classifier().classify(" Foo@BAR.com ").unwrap(),
            Address::Foreign {
                email: "foo@bar.com".to_string(),
                display_name: None
            }
        );
    }

    #[test]
    fn test_named_foreign_address() {
        let parsed = classifier()
            .classify(r#""Grace \"Amazing\" Hopper" <Grace@Navy.mil>"#)
            .unwrap();
        assert_eq!(
            parsed,
            Address::Foreign {
                email: "grace@navy.mil".to_string(),
                display_name: Some("Grace \"Amazing\" Hopper".to_string())
            }
        );

        let parsed = classifier().classify("Grace Hopper <grace@navy.mil>").unwrap();
        assert!(matches!(
            parsed,
            Address::Foreign { display_name: Some(ref n), .. } if n == "Grace Hopper"
        ));

        // A named local address is still a handle
        let parsed = classifier().classify("Ada <ada@mailroom.local>").unwrap();
        assert_eq!(parsed, Address::Local { handle: "ada".to_string() });
    }

    #[test]
    fn test_unparseable_addresses() {
        for raw in ["", "ada", "@ada", "ada@", "a@b@c", "ada lovelace@x.com", "<ada@x.com", "Ada ada@x.com>"] {
            let err = classifier().classify(raw).unwrap_err();
            assert!(matches!(err, Error::InvalidIdentity(_)), "accepted {:?}", raw);
        }
    }

    #[test]
    fn test_extract_mixed_targets_in_order() {
        let extractor = PatternExtractor::new().unwrap();
        let refs = extractor.extract(&targets(&[
            "@ada, grace@navy.mil",
            r#""Bob" <bob@x.com>; Carol <carol@y.org>"#,
            "please cc @ada too",
        ]));

        assert_eq!(
            refs,
            vec![
                IdentityReference::Handle("ada".to_string()),
                IdentityReference::Address("grace@navy.mil".to_string()),
                IdentityReference::Address(r#""Bob" <bob@x.com>"#.to_string()),
                IdentityReference::Address("Carol <carol@y.org>".to_string()),
                IdentityReference::Handle("ada".to_string()),
            ]
        );
    }

    #[test]
    fn test_extract_ignores_plain_text() {
        let extractor = PatternExtractor::new().unwrap();
        assert!(extractor.extract(&targets(&["hello world", "", "   "])).is_empty());
        assert!(extractor.extract(&[]).is_empty());
    }

    #[test]
    fn test_extract_bare_words_as_handles() {
        let extractor = PatternExtractor::new().unwrap();
        let refs = extractor.extract(&targets(&[
            "ada",
            "Ada Lovelace <ada@x.com>, bob@y.org; carol",
            r#""Doe, John" <john@z.com>"#,
        ]));

        assert_eq!(
            refs,
            vec![
                IdentityReference::Handle("ada".to_string()),
                IdentityReference::Address("Ada Lovelace <ada@x.com>".to_string()),
                IdentityReference::Address("bob@y.org".to_string()),
                IdentityReference::Handle("carol".to_string()),
                IdentityReference::Address(r#""Doe, John" <john@z.com>"#.to_string()),
            ]
        );
    }

    #[test]
    fn test_email_at_is_not_a_handle() {
        let extractor = PatternExtractor::new().unwrap();
        let refs = extractor.extract(&targets(&["ada@mailroom.local"]));
        assert_eq!(
            refs,
            vec![IdentityReference::Address("ada@mailroom.local".to_string())]
        );
    }
}
