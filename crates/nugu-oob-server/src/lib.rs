//! HTTP server for the NUGU OOB setup helper.
//!
//! Serves a small status page where the device owner enters OAuth client
//! credentials, starts the authorization-code or client-credentials flow,
//! and refreshes or revokes the resulting token. Registration and token
//! documents live on disk through a [`nugu_oob_oauth::ConfigStore`].
//!
//! # Example
//!
//! ```ignore
//! use nugu_oob_oauth::{OAuthClient, OAuthConfig, store::create_file_store};
//! use nugu_oob_server::{AppState, Server, ServerConfig};
//!
//! let config = ServerConfig::new("/var/lib/nugu");
//! let store = create_file_store(&config.config_path);
//! store.initialize().await?;
//!
//! let oauth = OAuthClient::new(OAuthConfig::default())?;
//! Server::new(AppState::new(config, store, oauth)).run().await?;
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod routes;
pub mod session;
pub mod state;
pub mod view;

pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use session::{SessionData, SessionStore};
pub use state::AppState;

use std::future::Future;
use std::net::SocketAddr;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// The OOB setup HTTP server.
pub struct Server {
    /// Application state.
    state: AppState,
}

impl Server {
    /// Create a server from a pre-built application state.
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Shared application state.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        Router::new()
            .merge(routes::health_routes())
            .route("/", get(routes::index_handler))
            .route(
                "/oauth",
                get(routes::get_registration_handler)
                    .put(routes::put_registration_handler)
                    .post(routes::submit_registration_handler),
            )
            .route(
                "/auth",
                get(routes::get_token_handler).put(routes::put_token_handler),
            )
            .route(
                "/loginAuthorizationCode",
                get(routes::login_authorization_code_handler),
            )
            .route(
                "/loginClientCredentials",
                get(routes::login_client_credentials_handler),
            )
            .route("/callback", get(routes::callback_handler))
            .route("/refresh", get(routes::refresh_handler))
            .route("/revoke", post(routes::revoke_handler))
            .route("/logout", get(routes::logout_handler))
            .fallback(routes::not_found_handler)
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                logging::request_logging_middleware,
            ))
            // Span only; the logging middleware emits the per-request event
            .layer(
                TraceLayer::new_for_http()
                    .on_request(())
                    .on_response(())
                    .on_failure(()),
            )
            .with_state(self.state.clone())
    }

    /// Run the server on the configured address.
    pub async fn run(self) -> Result<()> {
        let addr = self.state.config.bind_address;
        self.run_on(addr).await
    }

    /// Run the server on a specific address (useful for testing).
    pub async fn run_on(self, addr: SocketAddr) -> Result<()> {
        self.run_until(addr, std::future::pending()).await
    }

    /// Run until `shutdown` resolves, then finish in-flight requests.
    pub async fn run_until(
        self,
        addr: SocketAddr,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let router = self.router();

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind {}: {}", addr, e)))?;

        info!(
            addr = %addr,
            config_path = %self.state.config.config_path.display(),
            "Starting OOB setup server"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {}", e)))?;

        info!("Server stopped");
        Ok(())
    }

    /// Get the configured bind address.
    pub fn bind_address(&self) -> SocketAddr {
        self.state.config.bind_address
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use nugu_oob_oauth::{InMemoryConfigStore, OAuthClient, OAuthConfig};
    use tower::ServiceExt;

    fn create_test_server() -> Server {
        let config = ServerConfig::new("/tmp/unused").with_request_logging(false);
        let store = Arc::new(InMemoryConfigStore::new());
        let oauth = OAuthClient::new(OAuthConfig::nugu("http://127.0.0.1:1")).unwrap();
        Server::new(AppState::new(config, store, oauth))
    }

    async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn test_server_health_endpoint() {
        let app = create_test_server().router();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_index_renders_form() {
        let app = create_test_server().router();

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(html.contains("<form method=post action='/oauth'>"));
    }

    #[tokio::test]
    async fn test_put_then_get_registration_is_byte_exact() {
        let app = create_test_server().router();
        let document = "{\"clientId\":  \"abc\",\n  \"custom\": 1}";

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/oauth")
                    .body(Body::from(document))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::builder().uri("/oauth").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(body_bytes(response).await, document.as_bytes());
    }

    #[tokio::test]
    async fn test_put_rejects_non_object() {
        let app = create_test_server().router();

        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/auth")
                    .body(Body::from("not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_submit_registration_form() {
        let server = create_test_server();
        let store = server.state().store.clone();
        let app = server.router();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/oauth")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(
                        "pocId=poc&clientId=client&clientSecret=secret&serial=SN-9",
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.status().is_redirection());
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");

        let registration = store.read_registration().await.unwrap();
        assert_eq!(registration.poc_id, "poc");
        assert_eq!(registration.client_id, "client");
        assert_eq!(registration.client_secret, "secret");
        assert_eq!(registration.device_serial_number, "SN-9");
    }

    #[tokio::test]
    async fn test_login_requires_client_id() {
        let app = create_test_server().router();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/loginAuthorizationCode")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let app = create_test_server().router();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_bind_address() {
        let server = create_test_server();
        assert_eq!(server.bind_address().port(), 8080);
    }
}
