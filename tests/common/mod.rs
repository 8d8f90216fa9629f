#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use leptos_pkce_auth::url::Url;
use leptos_pkce_auth::{
    KeyValueStorage, ManualClock, MemoryStorage, RecordingNavigator, SessionController, TokenStore,
    UsePkceAuthOptions,
};
use serde_json::json;
use time::OffsetDateTime;
use wiremock::MockServer;

pub mod tracing {
    use tracing_subscriber::EnvFilter;

    pub fn init_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    }
}

pub const REALM_PATH: &str = "/realms/bodhi";
pub const TOKEN_PATH: &str = "/realms/bodhi/protocol/openid-connect/token";
pub const REVOKE_PATH: &str = "/realms/bodhi/protocol/openid-connect/revoke";

/// A JWT the library will happily decode. The signature is never checked client-side.
pub fn jwt(sub: &str, exp: OffsetDateTime) -> String {
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &json!({
            "sub": sub,
            "exp": exp.unix_timestamp(),
            "iat": exp.unix_timestamp() - 3600,
            "email": format!("{sub}@example.com"),
            "preferred_username": sub,
        }),
        &jsonwebtoken::EncodingKey::from_secret(b"only-the-server-knows"),
    )
    .unwrap()
}

pub fn token_response(access_token: &str, refresh_token: Option<&str>) -> serde_json::Value {
    json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": 3600,
        "refresh_token": refresh_token,
        "refresh_expires_in": 1800,
        "scope": "openid email profile roles",
    })
}

pub fn options(server: &MockServer) -> UsePkceAuthOptions {
    let mut options = UsePkceAuthOptions::new(
        Url::parse(&format!("{}{REALM_PATH}", server.uri())).unwrap(),
        "webchat",
        Url::parse("http://localhost:3000/auth").unwrap(),
    );
    options.advanced.request_timeout = Duration::from_millis(500);
    options
}

/// Decoded `application/x-www-form-urlencoded` request body.
pub fn form(request: &wiremock::Request) -> HashMap<String, String> {
    url::form_urlencoded::parse(&request.body)
        .into_owned()
        .collect()
}

pub async fn requests_to(server: &MockServer, path: &str) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.url.path() == path)
        .collect()
}

/// A controller wired to in-memory storage, a manual clock and a recording navigator.
pub struct Harness {
    pub controller: SessionController,
    pub durable: MemoryStorage,
    pub session: MemoryStorage,
    pub clock: ManualClock,
    pub navigator: RecordingNavigator,
}

impl Harness {
    pub fn new(options: UsePkceAuthOptions) -> Self {
        let durable = MemoryStorage::new();
        let session = MemoryStorage::new();
        let clock = ManualClock::new(OffsetDateTime::now_utc());
        let navigator = RecordingNavigator::new();

        let controller = SessionController::builder(options)
            .token_store(TokenStore::new(
                Arc::new(durable.clone()),
                Arc::new(session.clone()),
                "webchat-",
            ))
            .clock(clock.clone())
            .navigator(navigator.clone())
            .http_client(reqwest::Client::new())
            .build()
            .unwrap();

        Self {
            controller,
            durable,
            session,
            clock,
            navigator,
        }
    }

    pub fn now(&self) -> OffsetDateTime {
        self.controller.now()
    }

    /// Put tokens into storage as if an earlier login had happened.
    pub fn seed_tokens(&self, access_token: &str, refresh_token: Option<&str>) {
        self.durable.set("webchat-access-token", access_token);
        if let Some(refresh_token) = refresh_token {
            self.durable.set("webchat-refresh-token", refresh_token);
        }
    }
}
