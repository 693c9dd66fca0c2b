//! Twitter API client
//!
//! Reads the accounts a linked user follows through the v2 API. The stored
//! OAuth token is sent as a bearer token; the secret is kept on the binding
//! but not needed for these read-only calls.

use std::time::Duration;

use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use reqwest::blocking::Client;
use serde::Deserialize;
use url::Url;

use crate::domain::result::{Error, Result as DomainResult};
use crate::domain::{ContactSummary, Credentials, Provider};
use crate::ports::ContactProvider;

/// Production API base URL
pub const TWITTER_API_BASE: &str = "https://api.twitter.com";

/// Largest page the following endpoint serves
const MAX_PAGE_SIZE: usize = 1000;

#[derive(Debug, Deserialize)]
struct MeResponse {
    data: TwitterUser,
}

#[derive(Debug, Deserialize)]
struct FollowingResponse {
    #[serde(default)]
    data: Vec<TwitterUser>,
}

#[derive(Debug, Deserialize)]
pub struct TwitterUser {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub username: String,
}

/// Twitter API client
#[derive(Debug)]
pub struct TwitterClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    /// Number of followings sampled into autocomplete
    limit: usize,
}

impl TwitterClient {
    pub fn new(base_url: &str, timeout: Duration, limit: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            limit,
        })
    }

    /// The authenticated user
    pub fn me(&self, token: &str) -> Result<TwitterUser> {
        let url = self.endpoint("/2/users/me", &[])?;
        let response: MeResponse = self.get_json(url, token)?;
        Ok(response.data)
    }

    /// Everyone the user follows (first page only)
    pub fn following(&self, user_id: &str, token: &str) -> Result<Vec<TwitterUser>> {
        let max_results = MAX_PAGE_SIZE.to_string();
        let url = self.endpoint(
            &format!("/2/users/{}/following", user_id),
            &[("max_results", &max_results), ("user.fields", "name,username")],
        )?;
        let response: FollowingResponse = self.get_json(url, token)?;
        Ok(response.data)
    }

    /// A random sample of at most `limit` followings
    pub fn sample_following(&self, token: &str) -> Result<Vec<TwitterUser>> {
        let me = self.me(token)?;
        let mut users = self.following(&me.id, token)?;
        users.shuffle(&mut rand::thread_rng());
        users.truncate(self.limit);
        Ok(users)
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))
            .with_context(|| format!("Invalid Twitter API URL: {}", self.base_url))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url, token: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .map_err(|e| self.map_request_error(e))?;

        self.check_response_status(&response)?;

        response.json().context("Failed to parse Twitter response")
    }

    fn map_request_error(&self, error: reqwest::Error) -> anyhow::Error {
        if error.is_timeout() {
            anyhow::anyhow!("Connection timed out after {} seconds", self.timeout.as_secs())
        } else if error.is_connect() {
            anyhow::anyhow!("Unable to connect to Twitter servers")
        } else {
            anyhow::anyhow!("Twitter request failed: {}", error.without_url())
        }
    }

    fn check_response_status(&self, response: &reqwest::blocking::Response) -> Result<()> {
        match response.status().as_u16() {
            200 => Ok(()),
            401 => anyhow::bail!(
                "Twitter authentication failed. The linked token may be expired or revoked."
            ),
            403 => anyhow::bail!("Twitter access denied for this token."),
            429 => anyhow::bail!("Twitter rate limit exceeded. Please wait and try again."),
            status => anyhow::bail!("Twitter API error: HTTP {}", status),
        }
    }
}

impl ContactProvider for TwitterClient {
    fn provider(&self) -> Provider {
        Provider::Twitter
    }

    fn list_contacts(&self, credentials: &Credentials) -> DomainResult<Vec<ContactSummary>> {
        let users = self
            .sample_following(&credentials.token)
            .map_err(|e| Error::external("twitter", e.to_string()))?;

        Ok(users
            .into_iter()
            .map(|u| ContactSummary {
                name: u.name,
                screen_name: Some(u.username),
                email: None,
            })
            .collect())
    }
}
