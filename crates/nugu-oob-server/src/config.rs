//! Server configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use nugu_oob_oauth::store::DEFAULT_CONFIG_PATH;

/// Default listening address, all interfaces on port 8080.
pub const DEFAULT_BIND_ADDRESS: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080);

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to.
    pub bind_address: SocketAddr,

    /// Directory holding `nugu-oauth.json` and `nugu-auth.json`.
    pub config_path: PathBuf,

    /// Reject callbacks whose `state` is absent or does not match the session.
    /// Off by default: a mismatch is logged and the exchange proceeds.
    pub strict_state: bool,

    /// Enable request logging.
    pub request_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS,
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            strict_state: false,
            request_logging: true,
        }
    }
}

impl ServerConfig {
    /// Create a config rooted at the given config directory.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            ..Default::default()
        }
    }

    /// Set the bind address.
    pub fn with_bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = addr;
        self
    }

    /// Enable or disable strict CSRF state checking on the callback.
    pub fn with_strict_state(mut self, enabled: bool) -> Self {
        self.strict_state = enabled;
        self
    }

    /// Enable or disable request logging.
    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.request_logging = enabled;
        self
    }
}
