//! # Common Test Utilities
//!
//! `TestApp` spawns the real router on a random port, backed by a JSON store
//! in a temporary directory and a scripted `MockAiProvider` registered as the
//! default provider.

// Not every helper is used by every test file that includes this module.
#![allow(unused)]

use anybot::{config::get_config, store::JsonFileBackend, Store};
use anybot_server::{router, state::AppState};
use anybot_test_utils::MockAiProvider;
use anyhow::Result;
use axum::serve;
use reqwest::Client;
use serde_json::{json, Value};
use std::{collections::HashMap, fs::File, io::Write, net::SocketAddr, path::PathBuf};
use tempfile::{tempdir, TempDir};
use tokio::{net::TcpListener, task::JoinHandle};

pub const CLASSIFIER_KEY: &str = "knowledge-base curator";
pub const TURN_KEY: &str = "Answer the customer's question";
pub const ANALYSIS_KEY: &str = "Analyze the text";

pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub provider: MockAiProvider,
    pub store_path: PathBuf,
    pub app_state: AppState,
    _store_dir: TempDir,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestApp {
    /// Spawns the application server and returns a `TestApp` instance.
    pub async fn spawn() -> Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .compact()
            .with_test_writer()
            .try_init();

        let store_dir = tempdir()?;
        let store_path = store_dir.path().join("state.json");
        let config_path = store_dir.path().join("config.yml");
        let config_content = format!(
            r#"
port: 0
store_path: "{}"
language: tr
ingestion:
  batch_size: 5
  batch_delay_ms: 0
providers:
  gemini_default:
    provider: "local"
    api_url: "http://127.0.0.1:9/v1/chat/completions"
    model_name: "gemini-3-flash"
"#,
            store_path.display()
        );
        let mut file = File::create(&config_path)?;
        file.write_all(config_content.as_bytes())?;
        let config = get_config(Some(config_path.to_str().unwrap()))?;

        let provider = MockAiProvider::new();
        let mut providers = HashMap::new();
        providers.insert(config.default_provider.clone(), provider.boxed());
        let store = Store::open(JsonFileBackend::new(&store_path)).await?;
        let app_state = AppState::new(config, store, providers);
        let app_state_for_harness = app_state.clone();

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        let address = format!("http://{addr}");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let server_handle = tokio::spawn(async move {
            let app = router::create_router(app_state);
            let server = serve(listener, app).with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            });
            if let Err(e) = server.await {
                tracing::error!("[TestApp] Server error: {}", e);
            }
        });

        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Ok(Self {
            address,
            client: Client::new(),
            provider,
            store_path,
            app_state: app_state_for_harness,
            _store_dir: store_dir,
            _server_handle: server_handle,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// POSTs JSON and returns the status code and the parsed body.
    pub async fn post_json(&self, path: &str, body: Value) -> Result<(u16, Value)> {
        let response = self.client.post(self.url(path)).json(&body).send().await?;
        let status = response.status().as_u16();
        Ok((status, response.json().await?))
    }

    pub async fn put_json(&self, path: &str, body: Value) -> Result<(u16, Value)> {
        let response = self.client.put(self.url(path)).json(&body).send().await?;
        let status = response.status().as_u16();
        Ok((status, response.json().await?))
    }

    pub async fn get_json(&self, path: &str) -> Result<(u16, Value)> {
        let response = self.client.get(self.url(path)).send().await?;
        let status = response.status().as_u16();
        Ok((status, response.json().await?))
    }

    pub async fn delete_json(&self, path: &str) -> Result<(u16, Value)> {
        let response = self.client.delete(self.url(path)).send().await?;
        let status = response.status().as_u16();
        Ok((status, response.json().await?))
    }

    /// Creates a knowledge bank through the API and returns its id.
    pub async fn create_bank(&self, name: &str) -> Result<String> {
        let (status, body) = self
            .post_json("/knowledge-banks", json!({ "name": name }))
            .await?;
        assert_eq!(status, 200, "bank creation failed: {body}");
        Ok(body["result"]["id"].as_str().unwrap().to_string())
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
