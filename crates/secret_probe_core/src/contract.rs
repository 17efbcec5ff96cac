use serde_json::Value;

use crate::error::ProbeError;

pub const DEFAULT_DB_PORT: u16 = 5432;
pub const HEALTH_CHECK_QUERY: &str = "select 1";

/// Rows returned by the health-check query, one inner vector per row.
pub type QueryRows = Vec<Vec<Value>>;

/// Selector set for a `GetSecretValue` call.
///
/// Unset selectors stay `None` and must be left off the outgoing request;
/// Secrets Manager rejects an explicit null for either of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRequest {
    pub secret_id: String,
    pub version_id: Option<String>,
    pub version_stage: Option<String>,
}

impl SecretRequest {
    pub fn new(secret_id: impl Into<String>) -> Self {
        Self {
            secret_id: secret_id.into(),
            version_id: None,
            version_stage: None,
        }
    }

    pub fn with_version_id(mut self, version_id: Option<impl Into<String>>) -> Self {
        self.version_id = version_id.map(Into::into);
        self
    }

    pub fn with_version_stage(mut self, version_stage: Option<impl Into<String>>) -> Self {
        self.version_stage = version_stage.map(Into::into);
        self
    }
}

/// Database login decoded from the secret payload.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct DbCredentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl DbCredentials {
    /// Decodes a secret string. Missing `username`/`password` fields stay
    /// `None`; only a payload that is not a JSON object is rejected.
    pub fn from_secret_string(secret: &str) -> Result<Self, ProbeError> {
        let value: Value = serde_json::from_str(secret).map_err(|error| {
            ProbeError::SecretDecode(format!("secret is not valid JSON: {error}"))
        })?;

        let Some(object) = value.as_object() else {
            return Err(ProbeError::SecretDecode(
                "secret payload must be a JSON object".to_string(),
            ));
        };

        Ok(Self {
            username: string_field(object, "username"),
            password: string_field(object, "password"),
        })
    }
}

impl std::fmt::Debug for DbCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbCredentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn string_field(object: &serde_json::Map<String, Value>, name: &str) -> Option<String> {
    match object.get(name)? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
