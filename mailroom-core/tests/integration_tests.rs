//! Integration tests for mailroom-core
//!
//! These tests drive the fully wired `MailroomContext` against a real DuckDB
//! file. Provider APIs point at a closed local port, so nothing leaves the
//! machine.
//!
//! Run with: cargo test --test integration_tests -- --nocapture

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use mailroom_core::adapters::duckdb::DuckDbRepository;
use mailroom_core::domain::presentation::{formal_display, is_linked};
use mailroom_core::domain::{Account, Credentials};
use mailroom_core::ports::AccountStore;
use mailroom_core::services::{EntryPoint, LogFilter, LoggingService};
use mailroom_core::{Error, MailroomContext, OAuthCallback, Provider};

// ============================================================================
// Test Helpers
// ============================================================================

/// Settings with provider APIs on a closed port and failure isolation on
fn write_settings(dir: &TempDir, isolate: bool) {
    let settings = json!({
        "app": { "domain": "mailroom.test" },
        "autocomplete": { "isolateProviderFailures": isolate, "cacheTtlSecs": 600 },
        "providers": {
            "twitterApiBase": "http://127.0.0.1:9",
            "googleApiBase": "http://127.0.0.1:9",
            "timeoutSecs": 2
        }
    });
    std::fs::write(dir.path().join("settings.json"), settings.to_string()).unwrap();
}

fn create_context(dir: &TempDir) -> MailroomContext {
    MailroomContext::new(dir.path(), None).expect("Failed to create context")
}

fn twitter_payload(uid: &str, nickname: &str) -> serde_json::Value {
    json!({
        "uid": uid,
        "info": { "nickname": nickname, "name": "Ada Lovelace", "image": "" },
        "credentials": { "token": format!("tw-token-{}", uid), "secret": format!("tw-secret-{}", uid) }
    })
}

// ============================================================================
// End-to-end flows
// ============================================================================

#[test]
fn test_sign_in_write_and_autocomplete() {
    let dir = TempDir::new().unwrap();
    write_settings(&dir, true);
    let ctx = create_context(&dir);
    let identity = &ctx.identity_service;

    let callback = OAuthCallback::from_payload(Provider::Twitter, &twitter_payload("1815", "ada")).unwrap();
    let ada = identity.resolve_by_oauth_callback(&callback).unwrap();
    assert!(is_linked(&ada, Provider::Twitter));
    assert_eq!(identity.app_email(&ada).as_deref(), Some("ada@mailroom.test"));

    let targets = vec![
        "\"Grace Hopper\" <Grace@Navy.mil>, @bob".to_string(),
        "carol@mailroom.test".to_string(),
    ];
    ctx.conversation_service
        .start(&ada, Some("Compilers"), &targets)
        .unwrap();

    // Twitter is unreachable; with isolation on it contributes nothing
    let suggestions = ctx.autocomplete_service.suggestions(&ada).unwrap();
    assert_eq!(
        suggestions,
        vec!["\"Grace Hopper\" <grace@navy.mil>", "@bob", "@carol"]
    );

    let status = ctx.status_service.get_status().unwrap();
    assert_eq!(status.total_accounts, 4);
    assert_eq!(status.accounts_with_handle, 3);
    assert_eq!(status.accounts_with_email, 1);
    assert_eq!(status.total_conversations, 1);
}

#[test]
fn test_unreachable_provider_fails_without_isolation() {
    let dir = TempDir::new().unwrap();
    write_settings(&dir, false);
    let ctx = create_context(&dir);

    let callback = OAuthCallback::from_payload(Provider::Twitter, &twitter_payload("1815", "ada")).unwrap();
    let ada = ctx.identity_service.resolve_by_oauth_callback(&callback).unwrap();

    let err = ctx.autocomplete_service.suggestions(&ada).unwrap_err();
    assert!(matches!(err, Error::ExternalService { ref service, .. } if service == "twitter"));
}

#[test]
fn test_accounts_survive_reopen() {
    let dir = TempDir::new().unwrap();
    write_settings(&dir, true);

    let (id, token) = {
        let ctx = create_context(&dir);
        let account = ctx.identity_service.resolve_by_handle("ada").unwrap();
        (account.id, account.access_token().expose().to_string())
    };

    let ctx = create_context(&dir);
    let reopened = ctx.identity_service.resolve_by_handle("ada").unwrap();
    assert_eq!(reopened.id, id);
    assert_eq!(reopened.access_token().expose(), token);
}

#[test]
fn test_presented_accounts_never_leak_secrets() {
    let dir = TempDir::new().unwrap();
    write_settings(&dir, true);
    let ctx = create_context(&dir);
    let identity = &ctx.identity_service;

    let callback = OAuthCallback::from_payload(Provider::Twitter, &twitter_payload("uid-42", "ada")).unwrap();
    let ada = identity.resolve_by_oauth_callback(&callback).unwrap();
    let google = OAuthCallback::from_payload(
        Provider::Google,
        &json!({ "uid": "g-sub-9", "info": { "email": "ada@example.com" }, "credentials": { "token": "g-token-9" } }),
    )
    .unwrap();
    let ada = identity.link_provider(ada, &google).unwrap();

    let json = serde_json::to_string(&identity.present(&ada)).unwrap();
    for secret in [
        ada.access_token().expose(),
        "tw-token-uid-42",
        "tw-secret-uid-42",
        "uid-42",
        "g-token-9",
        "g-sub-9",
    ] {
        assert!(!json.contains(secret), "leaked {}", secret);
    }
    // Gravatar wins over Robohash once an email exists
    assert!(json.contains("https://www.gravatar.com/avatar/"));
    assert_eq!(formal_display(&ada), "\"Ada Lovelace\" <@ada>");
}

#[test]
fn test_external_id_unique_per_provider() {
    let dir = TempDir::new().unwrap();
    let repo = DuckDbRepository::new(&dir.path().join("mailroom.duckdb")).unwrap();
    repo.ensure_schema().unwrap();

    let mut first = Account::with_handle("first");
    first.bind(Provider::Twitter, Some("same".into()), Credentials::new("a", Some("b".into())));
    repo.create(&first).unwrap();

    // The same id under another provider is fine
    let mut other = Account::with_handle("other");
    other.bind(Provider::Google, Some("same".into()), Credentials::new("c", None));
    repo.create(&other).unwrap();

    let mut second = Account::with_handle("second");
    second.bind(Provider::Twitter, Some("same".into()), Credentials::new("d", Some("e".into())));
    let err = repo.create(&second).unwrap_err();
    assert!(err.is_uniqueness_violation());
    assert!(repo.find_by(mailroom_core::ports::AccountField::Handle, "second").unwrap().is_none());
}

#[test]
fn test_context_logs_events() {
    let dir = TempDir::new().unwrap();
    write_settings(&dir, true);
    let logger = Arc::new(LoggingService::new(dir.path(), EntryPoint::Library, "test").unwrap());
    let ctx = MailroomContext::new(dir.path(), Some(logger.clone())).unwrap();

    let owner = ctx.identity_service.resolve_by_handle("owner").unwrap();
    ctx.conversation_service
        .start(&owner, None, &["@friend".to_string()])
        .unwrap();

    let events: Vec<String> = logger.entries(LogFilter::All, 10).unwrap().into_iter().map(|e| e.event).collect();
    assert!(events.contains(&"conversation_started".to_string()));
    assert_eq!(events.iter().filter(|e| *e == "account_created").count(), 2);
}
