//! Mock provider API server for testing
//!
//! Serves the two endpoints each contact client touches, with the same
//! response shapes as the real APIs:
//! - GET /2/users/me returns { data: { id, name, username } }
//! - GET /2/users/{id}/following returns { data: [...], meta: { result_count } }
//! - GET /v1/people/me/connections returns { connections: [...], nextPageToken? }
//!
//! Requests must carry `Authorization: Bearer valid_...`.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use serde_json::json;

/// Twitter id of the authenticated mock user
pub const MOCK_TWITTER_ID: &str = "1815";

/// Mock provider server for testing
pub struct MockContactsServer {
    port: u16,
    running: Arc<AtomicBool>,
    requests: Arc<AtomicUsize>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Number of followed Twitter users
    pub num_following: usize,
    /// Number of Google contacts per page (every third has no email)
    pub contacts_per_page: usize,
    /// Number of Google contact pages
    pub pages: usize,
    pub fail_auth: bool,
    pub rate_limit: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            num_following: 5,
            contacts_per_page: 3,
            pages: 2,
            fail_auth: false,
            rate_limit: false,
        }
    }
}

impl MockContactsServer {
    /// Start a new mock server on a random available port
    pub fn start(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let requests = Arc::new(AtomicUsize::new(0));
        let running_clone = running.clone();
        let requests_clone = requests.clone();

        // Non-blocking accept so stop() can end the loop
        listener.set_nonblocking(true)?;

        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        requests_clone.fetch_add(1, Ordering::SeqCst);
                        let cfg = config.clone();
                        thread::spawn(move || handle_connection(stream, &cfg));
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(std::time::Duration::from_millis(10));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            requests,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Number of connections accepted so far
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockContactsServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn handle_connection(mut stream: TcpStream, config: &MockConfig) {
    // Accepted sockets may inherit non-blocking mode on some platforms
    let _ = stream.set_nonblocking(false);
    let mut buffer = [0; 4096];

    let n = match stream.read(&mut buffer) {
        Ok(n) => n,
        Err(_) => return,
    };
    let request = String::from_utf8_lossy(&buffer[..n]);

    let first_line = request.lines().next().unwrap_or("");
    let parts: Vec<&str> = first_line.split_whitespace().collect();
    if parts.len() < 2 {
        send_response(&mut stream, 400, "Bad Request", r#"{"error": "Invalid request"}"#);
        return;
    }
    let (method, target) = (parts[0], parts[1]);

    let has_valid_auth = request.to_lowercase().contains("authorization: bearer valid_");
    if config.fail_auth || !has_valid_auth {
        send_response(&mut stream, 401, "Unauthorized", r#"{"error": "Invalid token"}"#);
        return;
    }
    if config.rate_limit {
        send_response(&mut stream, 429, "Too Many Requests", r#"{"error": "Rate limit exceeded"}"#);
        return;
    }
    if method != "GET" {
        send_response(&mut stream, 405, "Method Not Allowed", r#"{"error": "Method not allowed"}"#);
        return;
    }

    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    let following_path = format!("/2/users/{}/following", MOCK_TWITTER_ID);

    let body = if path == "/2/users/me" {
        json!({ "data": { "id": MOCK_TWITTER_ID, "name": "Ada Lovelace", "username": "ada" } })
    } else if path == following_path {
        let users: Vec<_> = (0..config.num_following)
            .map(|i| json!({ "id": format!("{}", 100 + i), "name": format!("Friend {}", i), "username": format!("friend{}", i) }))
            .collect();
        json!({ "data": users, "meta": { "result_count": config.num_following } })
    } else if path == "/v1/people/me/connections" {
        let page = query
            .split('&')
            .find_map(|kv| kv.strip_prefix("pageToken=page"))
            .and_then(|n| n.parse::<usize>().ok())
            .unwrap_or(1);
        google_page(config, page)
    } else {
        send_response(&mut stream, 404, "Not Found", r#"{"error": "Endpoint not found"}"#);
        return;
    };

    send_response(&mut stream, 200, "OK", &body.to_string());
}

fn google_page(config: &MockConfig, page: usize) -> serde_json::Value {
    let connections: Vec<_> = (0..config.contacts_per_page)
        .map(|i| {
            let n = (page - 1) * config.contacts_per_page + i;
            if i % 3 == 2 {
                json!({ "names": [{ "displayName": format!("Phone Only {}", n) }] })
            } else {
                json!({
                    "names": [{ "displayName": format!("Contact {}", n) }],
                    "emailAddresses": [{ "value": format!("contact{}@example.com", n) }]
                })
            }
        })
        .collect();

    if page < config.pages {
        json!({ "connections": connections, "nextPageToken": format!("page{}", page + 1) })
    } else {
        json!({ "connections": connections })
    }
}

fn send_response(stream: &mut TcpStream, status: u16, status_text: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::adapters::google::GoogleContactsClient;
    use crate::adapters::twitter::TwitterClient;
    use crate::domain::result::Error;
    use crate::domain::{Credentials, Provider};
    use crate::ports::ContactProvider;

    fn creds(token: &str) -> Credentials {
        Credentials::new(token, Some("secret".to_string()))
    }

    #[test]
    fn test_twitter_following_sampled_to_limit() {
        let server = MockContactsServer::start(MockConfig {
            num_following: 8,
            ..Default::default()
        })
        .unwrap();
        let client = TwitterClient::new(&server.base_url(), Duration::from_secs(5), 3).unwrap();

        let contacts = client.list_contacts(&creds("valid_tw")).unwrap();
        assert_eq!(contacts.len(), 3);
        for c in &contacts {
            let sn = c.screen_name.as_deref().unwrap();
            assert!(sn.starts_with("friend"));
            assert!(c.suggestion(Provider::Twitter).unwrap().ends_with(&format!("@{}", sn)));
        }
    }

    #[test]
    fn test_twitter_limit_above_following_count() {
        let server = MockContactsServer::start(MockConfig::default()).unwrap();
        let client = TwitterClient::new(&server.base_url(), Duration::from_secs(5), 100).unwrap();

        let me = client.me("valid_tw").unwrap();
        assert_eq!(me.id, MOCK_TWITTER_ID);
        assert_eq!(client.list_contacts(&creds("valid_tw")).unwrap().len(), 5);
    }

    #[test]
    fn test_google_follows_pages_and_drops_emailless() {
        let server = MockContactsServer::start(MockConfig {
            contacts_per_page: 3,
            pages: 3,
            ..Default::default()
        })
        .unwrap();
        let client = GoogleContactsClient::new(&server.base_url(), Duration::from_secs(5)).unwrap();

        let contacts = client.list_contacts(&creds("valid_g")).unwrap();
        // Two of every three contacts carry an email
        assert_eq!(contacts.len(), 6);
        assert_eq!(contacts[0].email.as_deref(), Some("contact0@example.com"));
        assert_eq!(contacts[5].email.as_deref(), Some("contact7@example.com"));
        assert!(contacts.iter().all(|c| c.email.is_some()));
    }

    #[test]
    fn test_auth_failure_is_external_error() {
        let server = MockContactsServer::start(MockConfig {
            fail_auth: true,
            ..Default::default()
        })
        .unwrap();
        let client = GoogleContactsClient::new(&server.base_url(), Duration::from_secs(5)).unwrap();

        let err = client.list_contacts(&creds("valid_g")).unwrap_err();
        match err {
            Error::ExternalService { service, message } => {
                assert_eq!(service, "google");
                assert!(message.contains("authentication failed"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_invalid_token_rejected() {
        let server = MockContactsServer::start(MockConfig::default()).unwrap();
        let client = TwitterClient::new(&server.base_url(), Duration::from_secs(5), 10).unwrap();

        assert!(client.list_contacts(&creds("expired")).is_err());
    }

    #[test]
    fn test_rate_limit_reported() {
        let server = MockContactsServer::start(MockConfig {
            rate_limit: true,
            ..Default::default()
        })
        .unwrap();
        let client = TwitterClient::new(&server.base_url(), Duration::from_secs(5), 10).unwrap();

        let err = client.list_contacts(&creds("valid_tw")).unwrap_err();
        assert!(err.to_string().contains("rate limit"));
    }
}
