//! Google People API client
//!
//! Lists the linked user's contacts. Only contacts with an email address are
//! useful for addressing, so the rest are dropped here.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use url::Url;

use crate::domain::result::{Error, Result as DomainResult};
use crate::domain::{ContactSummary, Credentials, Provider};
use crate::ports::ContactProvider;

/// Production API base URL
pub const GOOGLE_API_BASE: &str = "https://people.googleapis.com";

const PAGE_SIZE: &str = "1000";

/// Upper bound on pages followed per listing
const MAX_PAGES: usize = 10;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectionsResponse {
    #[serde(default)]
    connections: Vec<Person>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Person {
    #[serde(default)]
    names: Vec<PersonName>,
    #[serde(default)]
    email_addresses: Vec<PersonEmail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersonName {
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PersonEmail {
    #[serde(default)]
    value: Option<String>,
}

impl Person {
    fn into_contact(self) -> Option<ContactSummary> {
        let email = self
            .email_addresses
            .into_iter()
            .filter_map(|e| e.value)
            .map(|e| e.trim().to_string())
            .find(|e| !e.is_empty())?;
        let name = self
            .names
            .into_iter()
            .filter_map(|n| n.display_name)
            .find(|n| !n.trim().is_empty());

        Some(ContactSummary {
            name,
            screen_name: None,
            email: Some(email),
        })
    }
}

/// Google People API client
#[derive(Debug)]
pub struct GoogleContactsClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl GoogleContactsClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Contacts with an email address, following pagination
    pub fn contacts(&self, token: &str) -> Result<Vec<ContactSummary>> {
        let mut contacts = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let page = self.fetch_page(token, page_token.as_deref())?;
            contacts.extend(page.connections.into_iter().filter_map(Person::into_contact));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(contacts)
    }

    fn fetch_page(&self, token: &str, page_token: Option<&str>) -> Result<ConnectionsResponse> {
        let mut url = Url::parse(&format!("{}/v1/people/me/connections", self.base_url))
            .with_context(|| format!("Invalid Google API URL: {}", self.base_url))?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("personFields", "names,emailAddresses")
                .append_pair("pageSize", PAGE_SIZE);
            if let Some(t) = page_token {
                query.append_pair("pageToken", t);
            }
        }

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .map_err(|e| self.map_request_error(e))?;

        self.check_response_status(&response)?;

        response
            .json()
            .context("Failed to parse Google People response")
    }

    fn map_request_error(&self, error: reqwest::Error) -> anyhow::Error {
        if error.is_timeout() {
            anyhow::anyhow!("Connection timed out after {} seconds", self.timeout.as_secs())
        } else if error.is_connect() {
            anyhow::anyhow!("Unable to connect to Google servers")
        } else {
            anyhow::anyhow!("Google request failed: {}", error.without_url())
        }
    }

    fn check_response_status(&self, response: &reqwest::blocking::Response) -> Result<()> {
        match response.status().as_u16() {
            200 => Ok(()),
            401 => anyhow::bail!(
                "Google authentication failed. The linked token may be expired or revoked."
            ),
            403 => anyhow::bail!("Google denied access to contacts for this token."),
            429 => anyhow::bail!("Google rate limit exceeded. Please wait and try again."),
            status => anyhow::bail!("Google API error: HTTP {}", status),
        }
    }
}

impl ContactProvider for GoogleContactsClient {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    fn list_contacts(&self, credentials: &Credentials) -> DomainResult<Vec<ContactSummary>> {
        self.contacts(&credentials.token)
            .map_err(|e| Error::external("google", e.to_string()))
    }
}
