//! Shared helpers for the session client tests.

#![allow(dead_code)]

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::json;
use tether_core::{BaseUrl, TokenStore};
use tether_http::{RefreshPolicy, SessionClient};
use tether_store::{MemorySlots, TieredStore};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub type MemoryStore = TieredStore<MemorySlots, MemorySlots>;

/// Build an unsigned token carrying the given claims.
pub fn token(claims: serde_json::Value) -> String {
    format!(
        "eyJhbGciOiJIUzI1NiJ9.{}.c2ln",
        URL_SAFE_NO_PAD.encode(claims.to_string())
    )
}

/// An access token for `username` that expires `ttl` seconds from now.
pub fn access_token(username: &str, is_staff: bool, ttl: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    token(json!({
        "token_type": "access",
        "user_id": 42,
        "username": username,
        "is_staff": is_staff,
        "iat": now,
        "exp": now + ttl,
    }))
}

pub fn base_url(server: &MockServer) -> BaseUrl {
    BaseUrl::new(&format!("{}/api", server.uri())).unwrap()
}

pub fn client_with(
    server: &MockServer,
    store: Arc<MemoryStore>,
    policy: RefreshPolicy,
) -> SessionClient {
    SessionClient::builder(base_url(server))
        .store(store as Arc<dyn TokenStore>)
        .policy(policy)
        .build()
        .unwrap()
}

pub fn client(server: &MockServer) -> (SessionClient, Arc<MemoryStore>) {
    let store = Arc::new(TieredStore::in_memory());
    (
        client_with(server, store.clone(), RefreshPolicy::default()),
        store,
    )
}

/// Mount a token issuance endpoint answering with `access`/`refresh`.
pub async fn mount_obtain(server: &MockServer, access: &str, refresh: &str) {
    Mock::given(method("POST"))
        .and(path("/api/token/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access": access,
            "refresh": refresh,
        })))
        .mount(server)
        .await;
}

/// Mount a refresh endpoint that must be hit `times` times for `refresh`.
pub async fn mount_refresh(server: &MockServer, refresh: &str, access: &str, times: u64) {
    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .and(body_json(json!({ "refresh": refresh })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": access })))
        .expect(times)
        .mount(server)
        .await;
}
