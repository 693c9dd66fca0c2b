//! Gravatar / Robohash avatar URLs
//!
//! Both URLs are computed locally; nothing here touches the network.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use url::Url;

use crate::ports::AvatarService;

pub const GRAVATAR_BASE: &str = "https://www.gravatar.com/avatar/";
pub const ROBOHASH_BASE: &str = "https://robohash.org/";

/// Avatar service backed by Gravatar with a Robohash fallback
#[derive(Debug, Clone)]
pub struct GravatarService {
    gravatar_base: Url,
    robohash_base: Url,
    size: u32,
    default_image: String,
}

fn parse_base(base: &str) -> Result<Url> {
    // Exactly one trailing slash, so the pushed segment lands after the base path
    let normalized = format!("{}/", base.trim().trim_end_matches('/'));
    let url = Url::parse(&normalized).with_context(|| format!("Invalid avatar base URL: {}", base))?;
    if url.cannot_be_a_base() {
        anyhow::bail!("Avatar base URL cannot hold a path: {}", base);
    }
    Ok(url)
}

impl GravatarService {
    pub fn new(gravatar_base: &str, robohash_base: &str, size: u32, default_image: &str) -> Result<Self> {
        Ok(Self {
            gravatar_base: parse_base(gravatar_base)?,
            robohash_base: parse_base(robohash_base)?,
            size,
            default_image: default_image.to_string(),
        })
    }

    /// Hex SHA-256 of the trimmed, lower-cased email
    pub fn email_hash(email: &str) -> String {
        let normalized = email.trim().to_lowercase();
        hex::encode(Sha256::digest(normalized.as_bytes()))
    }
}

impl AvatarService for GravatarService {
    fn url_for_email(&self, email: &str) -> String {
        let mut url = self.gravatar_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(&Self::email_hash(email));
        }
        url.query_pairs_mut()
            .append_pair("s", &self.size.to_string())
            .append_pair("d", &self.default_image);
        url.to_string()
    }

    fn url_for_text(&self, text: &str) -> String {
        let mut url = self.robohash_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(text);
        }
        url.query_pairs_mut()
            .append_pair("size", &format!("{0}x{0}", self.size));
        url.to_string()
    }
}
