#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::Value;

use member_directory::auth::KeyDeriver;
use member_directory::config::AppConfig;
use member_directory::server::{self, AppState};
use member_directory::services::DirectoryService;
use member_directory::store::MemoryStore;

pub const TEST_SECRET: &str = "test-secret";
pub const SEED_GROUPS: [&str; 3] = ["Tax", "IP", "M&A"];
pub const PUBLIC_BASE_URL: &str = "https://members.example.org";

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Boot the app in-process on a free port with a fresh in-memory store.
    pub async fn spawn() -> Result<Self> {
        server::init_tracing();

        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut config = AppConfig::development();
        config.server.port = port;
        config.server.enable_request_logging = false;
        config.links.public_base_url = PUBLIC_BASE_URL.to_string();

        let store = Arc::new(MemoryStore::with_groups(SEED_GROUPS));
        let deriver = KeyDeriver::new(TEST_SECRET)?;
        let state = AppState::new(DirectoryService::new(store, deriver, config.links.clone()));
        let app = server::app(state, &config);

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("failed to bind port {}", port))?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let server = Self {
            port,
            base_url,
            client: reqwest::Client::new(),
        };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline { break; }
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get(&self, path: &str) -> Result<(StatusCode, Value)> {
        let res = self.client.get(self.url(path)).send().await?;
        Ok((res.status(), res.json().await?))
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<(StatusCode, Value)> {
        let res = self.client.post(self.url(path)).json(body).send().await?;
        Ok((res.status(), res.json().await?))
    }

    pub async fn delete(&self, path: &str) -> Result<(StatusCode, Value)> {
        let res = self.client.delete(self.url(path)).send().await?;
        Ok((res.status(), res.json().await?))
    }

    /// Key the server would derive for `email`.
    pub fn key_for(&self, email: &str) -> Result<String> {
        Ok(KeyDeriver::new(TEST_SECRET)?.derive(email))
    }

    pub async fn create_member(&self, email: &str, groups: &[&str]) -> Result<()> {
        let (status, body) = self.post("/api/createUser", &member_body(email, groups)).await?;
        anyhow::ensure!(status == StatusCode::CREATED, "createUser failed: {} {}", status, body);
        Ok(())
    }
}

pub fn member_body(email: &str, groups: &[&str]) -> Value {
    serde_json::json!({
        "name": "Ann Nowak",
        "lawFirm": "Nowak & Co",
        "email": email,
        "country": "Poland",
        "phone": "+48 123 456 789",
        "groups": groups,
    })
}
