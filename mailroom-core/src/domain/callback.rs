//! OAuth callback payloads
//!
//! The authorization flow itself happens elsewhere. What reaches the core is
//! the already-verified profile and credentials, one variant per provider.

use serde::Deserialize;
use serde_json::Value as JsonValue;

use super::account::{non_blank, Credentials, Provider};
use super::result::{Error, Result};

/// Verified Twitter identity
#[derive(Debug, Clone)]
pub struct TwitterCallback {
    pub external_id: String,
    pub nickname: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub token: String,
    pub secret: String,
}

/// Verified Google identity
#[derive(Debug, Clone)]
pub struct GoogleCallback {
    pub external_id: String,
    pub email: String,
    pub token: String,
}

#[derive(Debug, Clone)]
pub enum OAuthCallback {
    Twitter(TwitterCallback),
    Google(GoogleCallback),
}

/// Omniauth-style payload: `{ uid, info: {..}, credentials: {..} }`
#[derive(Debug, Deserialize)]
struct RawPayload {
    #[serde(default, deserialize_with = "string_or_number")]
    uid: Option<String>,
    #[serde(default)]
    info: RawInfo,
    #[serde(default)]
    credentials: RawCredentials,
}

#[derive(Debug, Default, Deserialize)]
struct RawInfo {
    nickname: Option<String>,
    name: Option<String>,
    description: Option<String>,
    image: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawCredentials {
    token: Option<String>,
    secret: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(match value {
        Some(JsonValue::String(s)) => Some(s),
        Some(JsonValue::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn required(value: Option<String>, what: &str, provider: Provider) -> Result<String> {
    non_blank(value)
        .map(|v| v.trim().to_string())
        .ok_or_else(|| Error::invalid_callback(format!("{} callback is missing {}", provider, what)))
}

impl OAuthCallback {
    /// Validate an untyped callback payload at the boundary
    pub fn from_payload(provider: Provider, payload: &JsonValue) -> Result<Self> {
        let raw: RawPayload = serde_json::from_value(payload.clone())
            .map_err(|e| Error::invalid_callback(format!("malformed payload: {}", e)))?;

        let external_id = required(raw.uid, "uid", provider)?;
        let token = required(raw.credentials.token, "credentials.token", provider)?;

        match provider {
            Provider::Twitter => Ok(OAuthCallback::Twitter(TwitterCallback {
                external_id,
                nickname: required(raw.info.nickname, "info.nickname", provider)?,
                name: non_blank(raw.info.name),
                description: non_blank(raw.info.description),
                image_url: non_blank(raw.info.image),
                token,
                secret: required(raw.credentials.secret, "credentials.secret", provider)?,
            })),
            Provider::Google => Ok(OAuthCallback::Google(GoogleCallback {
                external_id,
                email: required(raw.info.email, "info.email", provider)?,
                token,
            })),
        }
    }

    pub fn provider(&self) -> Provider {
        match self {
            OAuthCallback::Twitter(_) => Provider::Twitter,
            OAuthCallback::Google(_) => Provider::Google,
        }
    }

    /// The provider's unique id for this identity; blank if missing
    pub fn external_id(&self) -> &str {
        match self {
            OAuthCallback::Twitter(cb) => cb.external_id.trim(),
            OAuthCallback::Google(cb) => cb.external_id.trim(),
        }
    }

    pub fn credentials(&self) -> Credentials {
        match self {
            OAuthCallback::Twitter(cb) => Credentials::new(cb.token.clone(), Some(cb.secret.clone())),
            OAuthCallback::Google(cb) => Credentials::new(cb.token.clone(), None),
        }
    }
}
