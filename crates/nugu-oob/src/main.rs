//! NUGU OOB setup helper
//!
//! Main entry point: prepares the config directory, installs logging and
//! serves the setup page until interrupted.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};

use nugu_oob_oauth::oauth::{DEFAULT_OAUTH2_URL, DEFAULT_REDIRECT_URI};
use nugu_oob_oauth::store::{DEFAULT_CONFIG_PATH, create_file_store};
use nugu_oob_oauth::{OAuthClient, OAuthConfig};
use nugu_oob_server::config::DEFAULT_BIND_ADDRESS;
use nugu_oob_server::{AppState, Server, ServerConfig};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// NUGU OOB setup helper - configure OAuth2 credentials and tokens for a device
#[derive(Parser, Debug)]
#[command(name = "nugu-oob")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Directory holding nugu-oauth.json and nugu-auth.json
    #[arg(long, env = "NUGU_CONFIG_PATH", default_value = DEFAULT_CONFIG_PATH)]
    pub config_path: PathBuf,

    /// Identity provider base URL
    #[arg(long = "oauth2-url", env = "NUGU_OAUTH2_URL", default_value = DEFAULT_OAUTH2_URL)]
    pub oauth2_url: String,

    /// Address to listen on
    #[arg(long, env = "NUGU_OOB_BIND", default_value_t = DEFAULT_BIND_ADDRESS)]
    pub bind: SocketAddr,

    /// Redirect URI registered with the identity provider
    #[arg(long, env = "NUGU_OOB_REDIRECT_URI", default_value = DEFAULT_REDIRECT_URI)]
    pub redirect_uri: String,

    /// Reject callbacks whose state does not match the session
    #[arg(long, env = "NUGU_OOB_STRICT_STATE")]
    pub strict_state: bool,

    /// Timeout for identity provider requests, in seconds
    #[arg(long, env = "NUGU_OOB_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console (human-readable) + rotating JSON file under the config directory
    let filter = if cli.verbose {
        "nugu_oob=debug,nugu_oob_server=debug,nugu_oob_oauth=debug,tower_http=debug,info"
    } else {
        "nugu_oob=info,nugu_oob_server=info,nugu_oob_oauth=info,warn"
    };

    let log_dir = cli.config_path.join("logs");
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("nugu-oob")
        .filename_suffix("log")
        .build(&log_dir);

    let (file_writer, _guard) = match file_appender {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        Err(e) => {
            eprintln!("File logging disabled ({}): {}", log_dir.display(), e);
            (None, None)
        }
    };

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(file_writer.map(|writer| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "nugu_oob=trace,nugu_oob_server=trace,nugu_oob_oauth=trace,info",
                ))
        }))
        .init();

    info!(config_path = %cli.config_path.display(), "Configuration path");

    let store = create_file_store(&cli.config_path);
    store.initialize().await.with_context(|| {
        format!(
            "Failed to initialize config directory {}",
            cli.config_path.display()
        )
    })?;

    let oauth_config = OAuthConfig::nugu(cli.oauth2_url)
        .with_redirect_uri(cli.redirect_uri)
        .with_timeout(Duration::from_secs(cli.timeout_secs));
    info!(
        provider = %oauth_config.base_url,
        redirect_uri = %oauth_config.redirect_uri,
        "Identity provider"
    );
    let oauth = OAuthClient::new(oauth_config)?;

    if !cli.strict_state {
        warn!("Callback state check is lenient; use --strict-state to reject mismatches");
    }

    let config = ServerConfig::new(&cli.config_path)
        .with_bind_address(cli.bind)
        .with_strict_state(cli.strict_state);

    info!("Please connect to port {}", cli.bind.port());

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };

    Server::new(AppState::new(config, store, oauth))
        .run_until(cli.bind, shutdown)
        .await?;

    Ok(())
}
