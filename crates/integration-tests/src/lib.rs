//! Integration tests for the loyalty API.
//!
//! Each test boots the real router on an ephemeral localhost port, backed by
//! the in-memory guest store, and talks to it over HTTP with `reqwest`. No
//! database is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p loyalty-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use loyalty_api::config::{ApiConfig, ConfigError};
use loyalty_api::db::{GuestStore, MemoryGuestStore};
use loyalty_api::state::{AppState, StateError};
use reqwest::Client;
use tokio::task::JoinHandle;

/// SHA-256 of `"secret"`, the password used by default in tests.
pub const SECRET_SHA256: &str = "2bb80d537b1da3e38bd30361aa855686bde0eacd7162fef6a25fe97bf527a25b";

#[derive(Debug, thiserror::Error)]
pub enum TestContextError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// A running server plus a client pointed at it.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
    pub store: Arc<MemoryGuestStore>,
    server: JoinHandle<()>,
}

impl TestContext {
    /// Start a server with the default test environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the listener
    /// cannot bind.
    pub async fn start() -> Result<Self, TestContextError> {
        Self::start_with(&[], MemoryGuestStore::new()).await
    }

    /// Start a server with extra environment variables and a seeded store.
    ///
    /// `DATABASE_URL` and `PASSWORD_HASH` (for `"secret"`) are preset and
    /// can be overridden.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the listener
    /// cannot bind.
    pub async fn start_with(
        vars: &[(&str, &str)],
        store: MemoryGuestStore,
    ) -> Result<Self, TestContextError> {
        let mut env: HashMap<String, String> = HashMap::from([
            (
                "DATABASE_URL".to_string(),
                "postgres://localhost/loyalty_test".to_string(),
            ),
            ("PASSWORD_HASH".to_string(), SECRET_SHA256.to_string()),
        ]);
        for (key, value) in vars {
            env.insert((*key).to_string(), (*value).to_string());
        }
        let config = ApiConfig::from_lookup(|key| env.get(key).cloned())?;

        let store = Arc::new(store);
        let dyn_store: Arc<dyn GuestStore> = store.clone();
        let app = loyalty_api::router(AppState::new(config, dyn_store)?);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let server = tokio::spawn(async move {
            let service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(err) = axum::serve(listener, service).await {
                tracing::error!(error = %err, "Test server stopped");
            }
        });

        Ok(Self {
            client: Client::builder().build()?,
            base_url: format!("http://{addr}"),
            store,
            server,
        })
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        self.server.abort();
    }
}
