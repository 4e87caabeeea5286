//! OAuth 2.0 client adapter and config store for the NUGU OOB setup helper.
//!
//! # Components
//!
//! - [`types`]: Client registration and token record documents
//! - [`store`]: Config store over the two JSON files, plus an in-memory variant for tests
//! - [`oauth`]: Provider calls for the authorization URL, code exchange, client credentials, refresh, revoke

pub mod error;
pub mod oauth;
pub mod store;
pub mod types;

pub use error::{OAuthError, Result};
pub use oauth::{OAuthClient, OAuthConfig, generate_state};
pub use store::{ConfigStore, FileConfigStore, InMemoryConfigStore, SharedConfigStore};
pub use types::{Registration, TokenRecord};
