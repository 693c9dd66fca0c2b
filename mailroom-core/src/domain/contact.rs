//! Contacts fetched from a linked provider

use super::account::Provider;
use super::presentation::quote_name;

/// Minimal view of one contact in a provider's social graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactSummary {
    pub name: Option<String>,
    /// Provider screen name (Twitter)
    pub screen_name: Option<String>,
    pub email: Option<String>,
}

impl ContactSummary {
    /// Render the contact as an autocomplete suggestion
    ///
    /// Twitter contacts render as `"Name" @screen_name`, Google contacts as
    /// `"Name" <email>`. A contact without a name drops the quoted part
    /// (`@screen_name`, bare `email`). Returns `None` when the contact has
    /// nothing to address.
    pub fn suggestion(&self, provider: Provider) -> Option<String> {
        let name = self.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
        let target = match provider {
            Provider::Twitter => {
                let screen_name = self.screen_name.as_deref()?.trim();
                if screen_name.is_empty() {
                    return None;
                }
                format!("@{}", screen_name)
            }
            Provider::Google => {
                let email = self.email.as_deref()?.trim();
                if email.is_empty() {
                    return None;
                }
                match name {
                    Some(_) => format!("<{}>", email),
                    None => return Some(email.to_string()),
                }
            }
        };
        Some(match name {
            Some(n) => format!("{} {}", quote_name(n), target),
            None => target,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(name: Option<&str>, screen_name: Option<&str>, email: Option<&str>) -> ContactSummary {
        ContactSummary {
            name: name.map(String::from),
            screen_name: screen_name.map(String::from),
            email: email.map(String::from),
        }
    }

    #[test]
    fn test_twitter_suggestion() {
        let c = contact(Some("Grace Hopper"), Some("grace"), None);
        assert_eq!(c.suggestion(Provider::Twitter).unwrap(), "\"Grace Hopper\" @grace");

        let c = contact(None, Some("grace"), None);
        assert_eq!(c.suggestion(Provider::Twitter).unwrap(), "@grace");

        let c = contact(Some("Grace"), None, Some("grace@navy.mil"));
        assert_eq!(c.suggestion(Provider::Twitter), None);
    }

    #[test]
    fn test_google_suggestion() {
        let c = contact(Some("Grace"), None, Some("grace@navy.mil"));
        assert_eq!(c.suggestion(Provider::Google).unwrap(), "\"Grace\" <grace@navy.mil>");

        let c = contact(None, None, Some("grace@navy.mil"));
        assert_eq!(c.suggestion(Provider::Google).unwrap(), "grace@navy.mil");

        let c = contact(Some("No Email"), None, None);
        assert_eq!(c.suggestion(Provider::Google), None);
    }
}
