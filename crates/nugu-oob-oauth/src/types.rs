//! Persisted documents: the OAuth client registration and the issued token.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{OAuthError, Result};

/// Token document written on first run and after a successful revoke.
pub const DEFAULT_TOKEN_JSON: &str = r#"{
    "access_token": "",
    "expires_in": "",
    "refresh_token": "",
    "token_type": ""
}
"#;

/// Registration document written on first run.
pub const DEFAULT_REGISTRATION_JSON: &str = r#"{
    "pocId": "",
    "clientId": "",
    "clientSecret": "",
    "deviceSerialNumber": ""
}
"#;

/// Reject anything that is not a JSON object.
pub fn ensure_json_object(bytes: &[u8]) -> Result<()> {
    serde_json::from_slice::<Map<String, Value>>(bytes)
        .map(|_| ())
        .map_err(|e| OAuthError::InvalidRequest(format!("Expected a JSON object: {}", e)))
}

// ============================================================================
// Registration
// ============================================================================

/// OAuth client registration for this device.
///
/// Every key is optional on disk; missing or null keys read back as empty
/// strings and other scalars as their JSON text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    /// Legacy PoC identifier, kept so older files round-trip.
    #[serde(default, deserialize_with = "lenient_string")]
    pub poc_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub client_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub client_secret: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub device_serial_number: String,
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(Value::deserialize(deserializer)?))
}

fn scalar_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

impl Registration {
    /// Parse a registration document.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| {
            OAuthError::Serialization(format!("Failed to parse registration: {}", e))
        })
    }

    /// Serialize as pretty JSON for the registration file.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            OAuthError::Serialization(format!("Failed to serialize registration: {}", e))
        })
    }

    /// The `data` parameter NUGU expects on authorize and token requests.
    pub fn device_data(&self) -> String {
        serde_json::json!({ "deviceSerialNumber": self.device_serial_number }).to_string()
    }

    /// Whether a client id has been configured.
    pub fn has_client_id(&self) -> bool {
        !self.client_id.trim().is_empty()
    }
}

// ============================================================================
// TokenRecord
// ============================================================================

/// Issued token state, kept as the flat JSON object the provider returned.
///
/// Values may be strings or numbers depending on who wrote the file, so
/// accessors normalise them instead of forcing a schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenRecord(Map<String, Value>);

impl TokenRecord {
    /// Wrap an already-parsed JSON object.
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// The default (empty) record.
    pub fn empty() -> Self {
        // The constant is a literal object, parsing cannot fail.
        Self::from_json(DEFAULT_TOKEN_JSON.as_bytes()).unwrap_or_default()
    }

    /// Parse a token document. Must be a JSON object.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map(Self)
            .map_err(|e| OAuthError::Serialization(format!("Failed to parse token: {}", e)))
    }

    /// Serialize as pretty JSON for the token file.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.0)
            .map_err(|e| OAuthError::Serialization(format!("Failed to serialize token: {}", e)))
    }

    /// Raw fields.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Set a single field.
    pub fn set(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }

    /// A field rendered as text; missing or null keys are empty.
    pub fn field(&self, key: &str) -> String {
        self.0.get(key).cloned().map(scalar_text).unwrap_or_default()
    }

    fn non_empty_str(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Access token, if one has been issued.
    pub fn access_token(&self) -> Option<&str> {
        self.non_empty_str("access_token")
    }

    /// Refresh token, if one has been issued.
    pub fn refresh_token(&self) -> Option<&str> {
        self.non_empty_str("refresh_token")
    }

    /// `expires_in` as seconds, accepting numbers and numeric strings.
    pub fn expires_in_secs(&self) -> Option<i64> {
        match self.0.get("expires_in")? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Add `expires_at` (unix seconds) from `expires_in` unless the provider sent one.
    pub fn stamp_expiry(&mut self, now_secs: i64) {
        let has_expires_at = self
            .0
            .get("expires_at")
            .is_some_and(|v| !v.is_null() && v.as_str() != Some(""));
        if has_expires_at {
            return;
        }
        if let Some(expires_at) = self
            .expires_in_secs()
            .and_then(|expires_in| now_secs.checked_add(expires_in))
        {
            self.set("expires_at", Value::from(expires_at));
        }
    }

    /// Keep the previous refresh token when a refresh response omits it.
    pub fn inherit_refresh_token(&mut self, previous: &TokenRecord) {
        if self.refresh_token().is_none()
            && let Some(refresh) = previous.refresh_token()
        {
            self.set("refresh_token", Value::from(refresh));
        }
    }
}
