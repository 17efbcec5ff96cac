//! Process configuration read from the Lambda environment.
//!
//! | Variable | Required |
//! |---|---|
//! | `SECRET_ID` | yes |
//! | `HOST` | yes |
//! | `VERSION_ID` | no |
//! | `VERSION_STAGE` | no |
//! | `SECRETS_ENDPOINT_URL` | no, falls back to `MOTO_HTTP_ENDPOINT` |
//!
//! Values are trimmed of surrounding whitespace; a value that is empty
//! after trimming counts as unset.

use crate::contract::SecretRequest;
use crate::error::ConfigError;

pub const SECRET_ID_VAR: &str = "SECRET_ID";
pub const HOST_VAR: &str = "HOST";
pub const VERSION_ID_VAR: &str = "VERSION_ID";
pub const VERSION_STAGE_VAR: &str = "VERSION_STAGE";
pub const SECRETS_ENDPOINT_URL_VAR: &str = "SECRETS_ENDPOINT_URL";
pub const MOTO_ENDPOINT_VAR: &str = "MOTO_HTTP_ENDPOINT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    pub secret_id: String,
    pub host: String,
    pub version_id: Option<String>,
    pub version_stage: Option<String>,
    /// Overrides the Secrets Manager endpoint, e.g. a local moto server.
    pub secrets_endpoint_url: Option<String>,
}

impl ProbeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_fn(|key| std::env::var(key))
    }

    /// Testable constructor that accepts an environment lookup function.
    pub fn from_env_fn<F>(env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let optional = |key: &str| {
            env(key)
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let required = |key: &'static str| optional(key).ok_or(ConfigError::MissingVariable(key));

        Ok(Self {
            secret_id: required(SECRET_ID_VAR)?,
            host: required(HOST_VAR)?,
            version_id: optional(VERSION_ID_VAR),
            version_stage: optional(VERSION_STAGE_VAR),
            secrets_endpoint_url: optional(SECRETS_ENDPOINT_URL_VAR)
                .or_else(|| optional(MOTO_ENDPOINT_VAR)),
        })
    }

    pub fn secret_request(&self) -> SecretRequest {
        SecretRequest::new(self.secret_id.clone())
            .with_version_id(self.version_id.clone())
            .with_version_stage(self.version_stage.clone())
    }
}
