use secret_probe_core::config::ProbeConfig;
use secret_probe_core::contract::QueryRows;
use secret_probe_core::error::ProbeError;

use crate::adapters::postgres::PgConnector;
use crate::adapters::secrets_manager::SecretsManagerSource;
use crate::handlers::probe::handle_probe;

/// Process-wide state, built once before the runtime loop starts and shared
/// read-only by every invocation.
pub struct ProbeContext {
    pub config: ProbeConfig,
    pub secrets: SecretsManagerSource,
    pub connector: PgConnector,
}

impl ProbeContext {
    pub async fn load(config: ProbeConfig) -> Self {
        let secrets = SecretsManagerSource::load(config.secrets_endpoint_url.as_deref()).await;
        Self {
            config,
            secrets,
            connector: PgConnector,
        }
    }

    pub fn probe(&self) -> Result<QueryRows, ProbeError> {
        handle_probe(&self.config, &self.secrets, &self.connector)
    }
}
