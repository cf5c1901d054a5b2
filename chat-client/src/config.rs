//! Client configuration
//!
//! The server URL is resolved from, in order: the `CHAT_SERVER_URL`
//! variable at build time, the same variable at run time (a `.env` file is
//! honoured), and finally `http://localhost:4000`.

use std::time::Duration;

use tracing::info;
use url::Url;

use crate::error::{ClientError, Result};

const DEFAULT_SERVER_URL: &str = "http://localhost:4000";
const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server base URL, always ending in `/`
    base: Url,
    /// Pause between subscription reconnect attempts
    pub reconnect_delay: Duration,
}

impl ClientConfig {
    pub fn new(server_url: &str) -> Result<Self> {
        let mut base = Url::parse(server_url)
            .map_err(|e| ClientError::Config(format!("Invalid server URL {}: {}", server_url, e)))?;

        if !matches!(base.scheme(), "http" | "https") {
            return Err(ClientError::Config(format!(
                "Server URL must be http or https, got {}",
                base.scheme()
            )));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            base,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        })
    }

    /// Resolve the server URL from the environment
    pub fn from_env() -> Result<Self> {
        // A missing .env file is fine
        let _ = dotenvy::dotenv();

        let build_time_url = option_env!("CHAT_SERVER_URL");
        let runtime_url = std::env::var("CHAT_SERVER_URL").ok();

        info!(
            build_time = ?build_time_url,
            runtime = ?runtime_url,
            "Server URL sources"
        );

        let server_url = build_time_url
            .map(String::from)
            .or(runtime_url)
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());

        info!(url = %server_url, "Using server URL");
        Self::new(&server_url)
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn server_url(&self) -> &str {
        self.base.as_str()
    }

    /// Endpoint for queries and mutations
    pub fn graphql_url(&self) -> Result<Url> {
        self.base
            .join("graphql")
            .map_err(|e| ClientError::Config(e.to_string()))
    }

    /// Endpoint for subscriptions
    pub fn ws_url(&self) -> Result<Url> {
        let mut url = self
            .base
            .join("graphql/ws")
            .map_err(|e| ClientError::Config(e.to_string()))?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|_| ClientError::Config(format!("Cannot use {} for {}", scheme, url)))?;
        Ok(url)
    }
}
