use aws_sdk_secretsmanager::error::DisplayErrorContext;
use secret_probe_core::contract::SecretRequest;
use tracing::info;

use super::run_blocking;
use super::secrets::SecretSource;

#[derive(Clone)]
pub struct SecretsManagerSource {
    client: aws_sdk_secretsmanager::Client,
}

impl SecretsManagerSource {
    pub fn new(client: aws_sdk_secretsmanager::Client) -> Self {
        Self { client }
    }

    /// Builds a client from the ambient AWS configuration, optionally pointed
    /// at a different endpoint (for example a local moto server).
    pub async fn load(endpoint_url: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(url) = endpoint_url {
            info!(
                component = "secrets_manager",
                event = "endpoint_override",
                endpoint_url = url,
            );
            loader = loader.endpoint_url(url);
        }

        let sdk_config = loader.load().await;
        Self::new(aws_sdk_secretsmanager::Client::new(&sdk_config))
    }
}

impl SecretSource for SecretsManagerSource {
    fn get_secret_string(&self, request: &SecretRequest) -> Result<String, String> {
        let client = self.client.clone();
        let request = request.clone();

        run_blocking(async move {
            let output = client
                .get_secret_value()
                .secret_id(request.secret_id)
                .set_version_id(request.version_id)
                .set_version_stage(request.version_stage)
                .send()
                .await
                .map_err(|error| {
                    format!(
                        "GetSecretValue call failed: {}",
                        DisplayErrorContext(&error)
                    )
                })?;

            output
                .secret_string()
                .map(ToOwned::to_owned)
                .ok_or_else(|| "secret has no SecretString payload".to_string())
        })
    }
}
