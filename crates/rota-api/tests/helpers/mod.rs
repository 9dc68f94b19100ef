//! Test helpers: build the router over the in-memory store.
//!
//! Run from workspace root: `cargo test -p rota-api`.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum_test::TestServer;
use rota_api::constants;
use rota_api::setup::{routes, services};
use rota_api::state::AppState;
use rota_core::Config;
use rota_db::{MemoryStore, Repositories};
use rota_services::LogNotifier;
use serde_json::{json, Value};

pub const TEST_JWT_SECRET: &str = "test-jwt-secret-that-is-at-least-32-characters";
pub const PASSWORD: &str = "TestPassword123!";

/// API path prefix for tests (e.g. `/api/v0`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

pub struct TestApp {
    pub server: TestServer,
    pub store: MemoryStore,
    pub state: Arc<AppState>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

pub fn test_config() -> Config {
    let vars: HashMap<String, String> = [
        ("ENVIRONMENT", "test"),
        ("STORE_BACKEND", "memory"),
        ("JWT_SECRET", TEST_JWT_SECRET),
        ("APP_BASE_URL", "https://app.rota.test"),
        ("INVITATION_SWEEP_INTERVAL_SECS", "0"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    Config::from_map(&vars).expect("test config")
}

pub async fn setup_test_app() -> TestApp {
    let config = test_config();
    let store = MemoryStore::new();
    let state = services::build_state(
        &config,
        Repositories::memory(store.clone()),
        Arc::new(LogNotifier),
        None,
    );
    let router = routes::setup_routes(&config, state.clone()).expect("routes");
    let server = TestServer::new(router).expect("test server");
    TestApp {
        server,
        store,
        state,
    }
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// A signed-up user: (access token, user id).
pub struct TestUser {
    pub email: String,
    pub token: String,
    pub user_id: String,
}

pub async fn sign_up(client: &TestServer, email: &str) -> TestUser {
    let response = client
        .post(&api_path("/auth/signup"))
        .json(&json!({ "email": email, "password": PASSWORD }))
        .await;
    assert_eq!(response.status_code(), 201, "{}", response.text());
    let body: Value = response.json();
    TestUser {
        email: email.to_string(),
        token: body["access_token"].as_str().unwrap().to_string(),
        user_id: body["user"]["id"].as_str().unwrap().to_string(),
    }
}

/// Create a company owned by `owner`; returns its id.
pub async fn create_company(client: &TestServer, owner: &TestUser, name: &str) -> String {
    let response = client
        .post(&api_path("/companies"))
        .add_header("Authorization", bearer(&owner.token))
        .json(&json!({ "name": name }))
        .await;
    assert_eq!(response.status_code(), 201, "{}", response.text());
    let body: Value = response.json();
    body["company"]["id"].as_str().unwrap().to_string()
}

/// Invite `email` as a member; returns the invitation JSON.
pub async fn invite(client: &TestServer, owner: &TestUser, company_id: &str, email: &str) -> Value {
    let response = client
        .post(&api_path(&format!("/companies/{}/invitations", company_id)))
        .add_header("Authorization", bearer(&owner.token))
        .json(&json!({ "email": email, "message": "Welcome aboard", "expires_in_days": 7 }))
        .await;
    assert_eq!(response.status_code(), 201, "{}", response.text());
    response.json()
}
