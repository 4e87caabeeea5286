//! Common test utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use wiremock::MockServer;

use nugu_oob_oauth::{ConfigStore, FileConfigStore, OAuthClient, OAuthConfig, Registration};
use nugu_oob_server::{AppState, Server, ServerConfig, SessionStore};

/// A test server backed by a temp config directory and a mock provider.
pub struct TestServer {
    /// The server's address.
    pub addr: SocketAddr,
    /// HTTP client that does not follow redirects.
    pub client: Client,
    /// Mock identity provider.
    pub provider: MockServer,
    /// Config store the server writes to.
    pub store: Arc<FileConfigStore>,
    /// Sessions held by the server.
    pub sessions: SessionStore,
    /// Handle to the server task.
    _handle: JoinHandle<()>,
    /// Temporary config directory.
    pub temp_dir: TempDir,
}

impl TestServer {
    /// Start a lenient server with a configured registration.
    pub async fn start() -> Result<Self> {
        Self::start_with(false).await
    }

    /// Start a server, optionally with strict state checking.
    pub async fn start_with(strict_state: bool) -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let provider = MockServer::start().await;

        let store = Arc::new(FileConfigStore::new(temp_dir.path()));
        store.initialize().await?;
        store.write_registration(&test_registration()).await?;

        let addr = find_available_port().await?;
        let config = ServerConfig::new(temp_dir.path())
            .with_bind_address(addr)
            .with_strict_state(strict_state)
            .with_request_logging(false);

        let oauth = OAuthClient::new(
            OAuthConfig::nugu(provider.uri()).with_timeout(Duration::from_secs(5)),
        )?;

        let state = AppState::new(config, store.clone(), oauth);
        let sessions = state.sessions.clone();

        let server = Server::new(state);
        let handle = tokio::spawn(async move {
            let _ = server.run_on(addr).await;
        });

        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        wait_for_server(&client, addr).await?;

        Ok(Self {
            addr,
            client,
            provider,
            store,
            sessions,
            _handle: handle,
            temp_dir,
        })
    }

    /// Get the base URL for the server.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.get(format!("{}{}", self.base_url(), path))
    }

    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.post(format!("{}{}", self.base_url(), path))
    }

    pub fn put(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.put(format!("{}{}", self.base_url(), path))
    }

    /// Token file contents.
    pub fn token_file(&self) -> String {
        std::fs::read_to_string(self.store.token_path()).expect("token file")
    }

    /// Overwrite the token file.
    pub fn write_token_file(&self, contents: &str) {
        std::fs::write(self.store.token_path(), contents).expect("write token file");
    }
}

/// Registration written into every test server.
pub fn test_registration() -> Registration {
    Registration {
        poc_id: String::new(),
        client_id: "test-client".to_string(),
        client_secret: "test-secret".to_string(),
        device_serial_number: "SN-TEST".to_string(),
    }
}

/// `name=value` pair of the session cookie set by a response, if any.
pub fn session_cookie(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .find(|pair| pair.starts_with("nugu_oob_session=") && pair.len() > "nugu_oob_session=".len())
        .map(str::to_string)
}

/// `Location` header of a redirect.
pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Value of a query parameter in a URL.
pub fn query_param(url: &str, name: &str) -> Option<String> {
    let (_, query) = url.split_once('?')?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

/// Find an available port for the test server.
async fn find_available_port() -> Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(addr)
}

/// Wait for the server to become ready.
async fn wait_for_server(client: &Client, addr: SocketAddr) -> Result<()> {
    let url = format!("http://{}/health", addr);

    let result = timeout(Duration::from_secs(5), async {
        loop {
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                _ => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
    })
    .await;

    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e),
        Err(_) => anyhow::bail!("Timeout waiting for server to start"),
    }
}
