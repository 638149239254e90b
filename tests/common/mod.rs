//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use chat_gate::clock::ManualClock;
use chat_gate::config::GateConfig;
use chat_gate::http::{Dependencies, HttpServer};
use chat_gate::lifecycle::Shutdown;
use chat_gate::messaging::InMemoryStore;
use chat_gate::observability::MemorySink;

/// A server running on an ephemeral port with a controllable clock.
#[allow(dead_code)]
pub struct TestServer {
    pub addr: SocketAddr,
    pub clock: ManualClock,
    pub log: Arc<MemorySink>,
    pub config_updates: mpsc::UnboundedSender<GateConfig>,
    pub client: reqwest::Client,
    shutdown: Shutdown,
}

/// 19:00 on a weekday, inside the default 18:00-21:00 window.
pub fn evening() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 9, 9)
        .unwrap()
        .and_hms_opt(19, 0, 0)
        .unwrap()
}

pub async fn start_server(config: GateConfig) -> TestServer {
    let clock = ManualClock::new(evening());
    let log = Arc::new(MemorySink::new());
    let server = HttpServer::new(
        config,
        Dependencies {
            clock: Arc::new(clock.clone()),
            store: Arc::new(InMemoryStore::new()),
            log_sink: Some(log.clone()),
        },
    );

    // Bound before spawning, so connections queue until the server accepts.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let (config_updates, updates_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let _ = server.run(listener, updates_rx, server_shutdown).await;
    });

    TestServer {
        addr,
        clock,
        log,
        config_updates,
        client: reqwest::Client::new(),
        shutdown,
    }
}

#[allow(dead_code)]
impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn send_message(
        &self,
        user: &str,
        role: &str,
        receiver: &str,
        body: &str,
    ) -> reqwest::Response {
        self.client
            .post(self.url("/api/messages"))
            .header("x-user-id", user)
            .header("x-user-role", role)
            .json(&json!({ "receiver": receiver, "body": body }))
            .send()
            .await
            .unwrap()
    }

    pub async fn get_as(&self, user: &str, role: &str, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .header("x-user-id", user)
            .header("x-user-role", role)
            .send()
            .await
            .unwrap()
    }

    pub async fn edit_as(&self, user: &str, role: &str, id: &str, body: &str) -> reqwest::Response {
        self.client
            .put(self.url(&format!("/api/messages/{}", id)))
            .header("x-user-id", user)
            .header("x-user-role", role)
            .json(&json!({ "body": body }))
            .send()
            .await
            .unwrap()
    }

    pub async fn post_as(&self, user: &str, role: &str, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .header("x-user-id", user)
            .header("x-user-role", role)
            .json(&body)
            .send()
            .await
            .unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

#[allow(dead_code)]
pub async fn detail(res: reqwest::Response) -> String {
    let body: Value = res.json().await.unwrap();
    body["detail"].as_str().unwrap_or_default().to_string()
}
